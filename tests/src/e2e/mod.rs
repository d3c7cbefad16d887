//! End to end pipeline tests.
//!
//! Every test builds a small obfuscated jar in a temporary directory, writes the mapping,
//! access transformer and descriptor files next to it and runs the full pipeline:
//!   - renaming and access widening with an effective rule
//!   - broken rules, fatal and non-fatal
//!   - structure injection, parameter names and synthetic stripping
//!   - clean-mode fingerprint reuse

mod cache;
mod pipeline;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use deobf_core::archive::{ArchiveEntry, ArchiveReader, ArchiveWriter};
use deobf_core::{AccessFlags, ClassFile, Constant, decode_class, encode_class};
use deobf_transform::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// SRG mapping for the sample jar.
pub const MAPPING: &str = "\
PK: a/b com/example
CL: a/b/C com/example/Widget
CL: a/b/C$D com/example/Widget$Part
FD: a/b/C/x com/example/Widget/widgetValue
MD: a/b/C/m (I)V com/example/Widget/func_1234_a (I)V
";

pub const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\nMain-Class: a.b.C\r\n\r\n";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
}

/// `a/b/C` with a private field, a private method and a synthetic accessor, plus its
/// nested class `a/b/C$D` that reads the field.
pub fn sample_classes() -> Result<Vec<(String, Vec<u8>)>> {
    let mut outer = ClassFile::new("a/b/C", Some("java/lang/Object"), AccessFlags::PUBLIC)?;
    outer.add_field(AccessFlags::PRIVATE, "x", "I")?;
    outer.add_method(AccessFlags::PRIVATE, "m", "(I)V")?;
    outer.add_method(
        AccessFlags::STATIC | AccessFlags::SYNTHETIC,
        "access$000",
        "(La/b/C;)I",
    )?;

    let mut inner = ClassFile::new("a/b/C$D", Some("java/lang/Object"), AccessFlags::SUPER)?;
    inner.add_field(
        AccessFlags::FINAL | AccessFlags::SYNTHETIC,
        "this$0",
        "La/b/C;",
    )?;
    let owner = inner.pool.class_index("a/b/C")?;
    let nat = inner.pool.name_and_type_index("x", "I")?;
    inner.pool.push(Constant::Fieldref {
        class_index: owner,
        name_and_type_index: nat,
    })?;

    Ok(vec![
        ("a/b/C.class".to_string(), encode_class(&outer)?),
        ("a/b/C$D.class".to_string(), encode_class(&inner)?),
    ])
}

/// Workspace with the sample jar and mapping written out.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub input: PathBuf,
    pub mapping: PathBuf,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("minecraft.jar");
        let mapping = dir.path().join("joined.srg");

        let mut writer = ArchiveWriter::create(&input)?;
        writer.write_entry(&ArchiveEntry::directory("META-INF/"))?;
        writer.write_entry(&ArchiveEntry::file("META-INF/MANIFEST.MF", MANIFEST.to_vec()))?;
        for (name, data) in sample_classes()? {
            writer.write_entry(&ArchiveEntry::file(name, data))?;
        }
        writer.write_entry(&ArchiveEntry::file("assets/lang/en_US.lang", b"tile.stone=Stone\n".to_vec()))?;
        writer.finish()?;
        fs::write(&mapping, MAPPING)?;

        Ok(Self { dir, input, mapping })
    }

    /// Writes a file into the fixture directory and returns its path.
    pub fn file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            input: self.input.clone(),
            mapping: self.mapping.clone(),
            output_clean: self.dir.path().join("out").join("minecraft-deobf.jar"),
            ..Default::default()
        }
    }
}

/// Every entry of `jar`, by name, in stored order.
pub fn read_jar(jar: &Path) -> Result<Vec<ArchiveEntry>> {
    Ok(ArchiveReader::open(jar)?.entries()?)
}

/// Decodes the class stored under `entry` in `jar`.
pub fn read_class(jar: &Path, entry: &str) -> Result<ClassFile> {
    let found = read_jar(jar)?
        .into_iter()
        .find(|e| e.name == entry)
        .ok_or_else(|| eyre!("no entry {entry} in {}", jar.display()))?;
    Ok(decode_class(&found.data)?)
}
