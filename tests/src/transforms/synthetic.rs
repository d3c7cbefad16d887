use deobf_core::archive::{ArchiveEntry, ArchiveReader, ArchiveWriter};
use deobf_core::{AccessFlags, ClassFile, decode_class, encode_class};
use deobf_transform::synthetic::SyntheticStripper;
use std::path::Path;
use zip::DateTime;

fn class_bytes(name: &str) -> Vec<u8> {
    let mut class = ClassFile::new(name, Some("java/lang/Object"), AccessFlags::PUBLIC).unwrap();
    class
        .add_field(AccessFlags::FINAL | AccessFlags::SYNTHETIC, "this$0", "La/Outer;")
        .unwrap();
    class
        .add_method(AccessFlags::PUBLIC | AccessFlags::SYNTHETIC, "lambda$run$0", "()V")
        .unwrap();
    encode_class(&class).unwrap()
}

fn write_jar(path: &Path, stamp: DateTime) {
    let mut writer = ArchiveWriter::create(path).unwrap();
    let mut entries = vec![
        ArchiveEntry::directory("META-INF/"),
        ArchiveEntry::file("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n".to_vec()),
        ArchiveEntry::file("META-INF/versions/9/a/Inner.class", class_bytes("a/Inner")),
        ArchiveEntry::directory("a/"),
        ArchiveEntry::file("a/Inner.class", class_bytes("a/Inner")),
        ArchiveEntry::file("a/lang.properties", b"greeting=hi\n".to_vec()),
    ];
    for entry in &mut entries {
        entry.modified = stamp;
        writer.write_entry(entry).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn archive_strip_keeps_layout_and_metadata() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");
    let stamp = DateTime::from_date_and_time(2013, 11, 28, 9, 15, 0).unwrap();
    write_jar(&input, stamp);

    let stats = SyntheticStripper.strip_archive(&input, &output).unwrap();
    assert_eq!(stats.stage, "strip");
    assert_eq!(stats.entries_read, 6);
    assert_eq!(stats.classes_rewritten, 1);
    assert_eq!(stats.entries_copied, 5);

    let before = ArchiveReader::open(&input).unwrap().entries().unwrap();
    let after = ArchiveReader::open(&output).unwrap().entries().unwrap();
    let names: Vec<_> = after.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, before.iter().map(|e| e.name.as_str()).collect::<Vec<_>>());

    for (old, new) in before.iter().zip(&after) {
        assert_eq!(new.modified.year(), 2013);
        assert_eq!(new.modified.day(), 28);
        if new.name != "a/Inner.class" {
            assert_eq!(new.data, old.data, "{} changed", new.name);
        }
    }

    let stripped = decode_class(&after[4].data).unwrap();
    assert_eq!(stripped.fields[0].access, AccessFlags::FINAL);
    assert_eq!(stripped.methods[0].access, AccessFlags::PUBLIC);
}
