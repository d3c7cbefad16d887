//! Clears `ACC_SYNTHETIC` from the members of ordinary classes.

use crate::{ClassUnit, Result, StageStats, Transform};
use deobf_core::archive::{ArchiveReader, ArchiveWriter};
use deobf_core::{AccessFlags, ClassFile};
use std::path::Path;
use tracing::debug;

/// Enums and classes that are themselves synthetic are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticStripper;

impl SyntheticStripper {
    pub fn strip_class(&self, class: &mut ClassFile) -> Result<bool> {
        if class.access.is_synthetic() || class.is_enum()? {
            return Ok(false);
        }
        let mut changed = false;
        for member in class.fields.iter_mut().chain(class.methods.iter_mut()) {
            if member.access.is_synthetic() {
                member.access.remove(AccessFlags::SYNTHETIC);
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Archive-to-archive pass. Directories, metadata and non-class entries are copied
    /// verbatim; every class is re-serialized. Entry timestamps are kept.
    pub fn strip_archive(&self, input: &Path, output: &Path) -> Result<StageStats> {
        let mut reader = ArchiveReader::open(input)?;
        let mut writer = ArchiveWriter::create(output)?;
        let mut stats = StageStats::new("strip");

        for index in 0..reader.len() {
            let entry = reader.read_entry(index)?;
            stats.entries_read += 1;
            if entry.is_dir || entry.is_metadata() || !entry.is_class() {
                writer.write_entry(&entry)?;
                stats.entries_copied += 1;
                continue;
            }
            let mut class = deobf_core::decode_class(&entry.data)?;
            if self.strip_class(&mut class)? {
                debug!("stripped synthetic flags in {}", entry.name);
                stats.classes_rewritten += 1;
            }
            writer.write_entry(&entry.with_data(deobf_core::encode_class(&class)?))?;
        }

        writer.finish()?;
        Ok(stats)
    }
}

impl Transform for SyntheticStripper {
    fn name(&self) -> &'static str {
        "SyntheticStripper"
    }

    fn apply(&mut self, unit: &mut ClassUnit) -> Result<bool> {
        self.strip_class(&mut unit.class)
    }
}
