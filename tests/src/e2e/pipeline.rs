use super::{Fixture, MANIFEST, read_class, read_jar, sample_classes};
use color_eyre::Result;
use deobf_core::archive::{ArchiveEntry, ArchiveWriter};
use deobf_core::attributes;
use deobf_core::{AccessFlags, ClassFile, Constant, MemberKind, encode_class};
use deobf_transform::cache;
use deobf_transform::structure::{InjectOptions, StructureDescriptor, StructureInjector};
use deobf_transform::{Error, StageStats, pipeline};
use std::fs;
use std::path::Path;

fn method_access(class: &ClassFile, name: &str, descriptor: &str) -> AccessFlags {
    let position = class.find_member(MemberKind::Method, name, descriptor).unwrap();
    class.methods[position].access
}

fn method_attribute<'a>(class: &'a ClassFile, name: &str, descriptor: &str, attribute: &str) -> Option<&'a [u8]> {
    let position = class.find_member(MemberKind::Method, name, descriptor)?;
    let list = &class.methods[position].attributes;
    attributes::find(&class.pool, list, attribute).map(|at| list[at].info.as_slice())
}

#[test]
fn obfuscated_jar_is_renamed_and_widened() -> Result<()> {
    let fixture = Fixture::new()?;
    let at = fixture.file(
        "mine_at.cfg",
        "# widget access\npublic a.b.C x # widget value\npublic a.b.C m(I)V\n",
    )?;
    let mut config = fixture.config();
    config.access_transformers.push(at);

    let report = pipeline::run(&config)?;
    assert!(!report.clean);
    assert!(!report.from_cache);
    assert!(report.fingerprint.is_none());
    assert_eq!(
        report.output,
        fixture.dir.path().join("out").join("minecraft-deobf-dirty.jar")
    );
    assert_eq!(report.rules.len(), 2);
    assert_eq!(report.broken_rules, 0);
    assert!(report.rules.iter().all(|r| r.effective));

    let stages: Vec<_> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages, vec!["remap", "inject"]);
    let remap = report.stage("remap").unwrap();
    assert_eq!(remap.entries_read, 5);
    assert_eq!(remap.classes_rewritten, 2);
    assert_eq!(remap.entries_copied, 3);

    let entries = read_jar(&report.output)?;
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "META-INF/",
            "META-INF/MANIFEST.MF",
            "com/example/Widget.class",
            "com/example/Widget$Part.class",
            "assets/lang/en_US.lang",
        ]
    );
    assert_eq!(entries[1].data, MANIFEST);

    let widget = read_class(&report.output, "com/example/Widget.class")?;
    assert_eq!(widget.name()?, "com/example/Widget");
    let field = widget.find_member(MemberKind::Field, "widgetValue", "I").unwrap();
    assert_eq!(widget.fields[field].access, AccessFlags::PUBLIC);
    assert_eq!(method_access(&widget, "func_1234_a", "(I)V"), AccessFlags::PUBLIC);
    // synthetic flags survive while stripping is off
    assert!(method_access(&widget, "access$000", "(Lcom/example/Widget;)I").is_synthetic());

    let params = method_attribute(&widget, "func_1234_a", "(I)V", attributes::METHOD_PARAMETERS)
        .unwrap();
    let params = attributes::parse_method_parameters(params)?;
    assert_eq!(widget.pool.utf8(params[0].name_index)?, "p_1234_1_");

    let part = read_class(&report.output, "com/example/Widget$Part.class")?;
    let field_ref = part
        .pool
        .entries()
        .iter()
        .position(|c| matches!(c, Constant::Fieldref { .. }))
        .unwrap() as u16;
    let member = part.pool.member_ref(field_ref)?;
    assert_eq!(
        (member.owner, member.name, member.descriptor),
        ("com/example/Widget", "widgetValue", "I")
    );
    Ok(())
}

#[test]
fn broken_rules_abort_before_any_output() -> Result<()> {
    let fixture = Fixture::new()?;
    let at = fixture.file("mine_at.cfg", "public a.b.C x\npublic a.b.C gone\n")?;
    let mut config = fixture.config();
    config.access_transformers.push(at);

    match pipeline::run(&config) {
        Err(Error::BrokenRules(records)) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].raw_text, "public a.b.C gone");
            assert_eq!(records[0].normalized_key, "a/b/C gone");
            assert_eq!(records[0].origin.line, 2);
        }
        other => panic!("expected broken rules, got {other:?}"),
    }
    assert!(!config.output_path().exists());
    Ok(())
}

#[test]
fn broken_rules_can_be_tolerated() -> Result<()> {
    let fixture = Fixture::new()?;
    let at = fixture.file("mine_at.cfg", "public a.b.C x\npublic a.b.C gone\n")?;
    let mut config = fixture.config();
    config.access_transformers.push(at);
    config.fail_on_broken_rules = false;

    let report = pipeline::run(&config)?;
    assert_eq!(report.broken_rules, 1);
    assert_eq!(report.broken().count(), 1);
    assert!(report.output.exists());
    Ok(())
}

#[test]
fn descriptor_injection_and_synthetic_strip() -> Result<()> {
    let fixture = Fixture::new()?;
    let at = fixture.file("forge_at.cfg", "public com.example.Widget$Part\n")?;
    let descriptor = fixture.file(
        "exceptor.json",
        r#"{
            "com/example/Widget": {
                "innerClasses": [
                    { "inner_class": "com/example/Widget$Part", "outer_class": "com/example/Widget",
                      "inner_name": "Part", "access": "2" }
                ],
                "methods": { "func_1234_a (I)V": { "exceptions": ["java/io/IOException"] } }
            },
            "com/example/Widget$Part": {
                "innerClasses": [
                    { "inner_class": "com/example/Widget$Part", "outer_class": "com/example/Widget",
                      "inner_name": "Part", "access": "2" }
                ]
            }
        }"#,
    )?;
    let emitted = fixture.dir.path().join("exceptor-updated.json");

    let mut config = fixture.config();
    config.clean_access_transformers.push(at);
    config.descriptor = Some(descriptor);
    config.emit_descriptor = Some(emitted.clone());
    config.strip_synthetics = true;
    config.target_version = Some("1.7.2".to_string());
    config.use_cache = false;

    let report = pipeline::run(&config)?;
    assert!(report.clean);
    assert_eq!(report.output, config.output_clean);
    assert_eq!(report.inner_class_updates, 2);
    let stages: Vec<_> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages, vec!["remap", "inject", "strip"]);

    let json = fs::read_to_string(&emitted)?;
    assert!(json.contains(r#""access": "1""#));
    assert!(!json.contains(r#""access": "2""#));

    let widget = read_class(&report.output, "com/example/Widget.class")?;
    let at = attributes::find(&widget.pool, &widget.attributes, attributes::INNER_CLASSES).unwrap();
    let inner = attributes::parse_inner_classes(&widget.attributes[at].info)?;
    assert_eq!(inner[0].access, AccessFlags::PUBLIC);
    assert_eq!(widget.pool.class_name(inner[0].inner_class_info_index)?, "com/example/Widget$Part");

    let thrown = method_attribute(&widget, "func_1234_a", "(I)V", attributes::EXCEPTIONS).unwrap();
    let thrown = attributes::parse_exceptions(thrown)?;
    assert_eq!(widget.pool.class_name(thrown[0])?, "java/io/IOException");
    // legacy target: no generated parameter names
    assert!(
        method_attribute(&widget, "func_1234_a", "(I)V", attributes::METHOD_PARAMETERS).is_none()
    );
    assert_eq!(
        method_access(&widget, "access$000", "(Lcom/example/Widget;)I"),
        AccessFlags::STATIC
    );

    let part = read_class(&report.output, "com/example/Widget$Part.class")?;
    assert_eq!(part.access, AccessFlags::PUBLIC | AccessFlags::SUPER);
    assert_eq!(part.fields[0].access, AccessFlags::FINAL);
    Ok(())
}

#[test]
fn rules_written_against_old_names_follow_the_rename_table() -> Result<()> {
    let fixture = Fixture::new()?;
    let csv = fixture.file("fields.csv", "searge,name,side,desc\nx,widgetValue,2,\n")?;
    let at = fixture.file("mine_at.cfg", "public a/b/C x\n")?;
    let mut config = fixture.config();
    config.rename_csvs.push(csv);
    config.access_transformers.push(at);

    let report = pipeline::run(&config)?;
    assert_eq!(report.rules.len(), 1);
    assert!(report.rules[0].effective);
    assert_eq!(report.rules[0].normalized_key, "a/b/C widgetValue");

    let widget = read_class(&report.output, "com/example/Widget.class")?;
    let field = widget.find_member(MemberKind::Field, "widgetValue", "I").unwrap();
    assert_eq!(widget.fields[field].access, AccessFlags::PUBLIC);
    Ok(())
}

#[test]
fn narrowing_a_package_class_is_a_broken_rule() -> Result<()> {
    let fixture = Fixture::new()?;
    let at = fixture.file("mine_at.cfg", "private a/b/C$D\n")?;
    let mut config = fixture.config();
    config.access_transformers.push(at);

    let Err(Error::BrokenRules(records)) = pipeline::run(&config) else {
        panic!("package-private class narrowed to private should be a broken rule");
    };
    let listed: Vec<_> = records.iter().map(|r| r.raw_text.as_str()).collect();
    assert_eq!(listed, vec!["private a/b/C$D"]);
    Ok(())
}

/// Starts writing its output, then gives up.
struct FailingInjector;

impl StructureInjector for FailingInjector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn inject(
        &self,
        _input: &Path,
        output: &Path,
        _descriptor: &StructureDescriptor,
        _options: InjectOptions,
    ) -> deobf_transform::Result<StageStats> {
        let mut writer = ArchiveWriter::create(output)?;
        writer.write_entry(&ArchiveEntry::file("partial.txt", b"half".to_vec()))?;
        Err(Error::Config("descriptor tool crashed".to_string()))
    }
}

#[test]
fn failed_injection_leaves_no_output() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config();

    match pipeline::run_with_injector(&config, &FailingInjector) {
        Err(Error::Injection { injector, reason }) => {
            assert_eq!(injector, "failing");
            assert!(reason.contains("descriptor tool crashed"));
        }
        other => panic!("expected an injection failure, got {other:?}"),
    }
    assert!(!config.output_path().exists());
    assert!(!cache::fingerprint_path(&config.output_path()).exists());
    Ok(())
}

/// Replaces the fixture jar with the sample classes plus `extra` entries.
fn rewrite_input(fixture: &Fixture, extra: Vec<ArchiveEntry>) -> Result<()> {
    let mut writer = ArchiveWriter::create(&fixture.input)?;
    for (name, data) in sample_classes()? {
        writer.write_entry(&ArchiveEntry::file(name, data))?;
    }
    for entry in &extra {
        writer.write_entry(entry)?;
    }
    writer.finish()?;
    Ok(())
}

#[test]
fn unreadable_class_entry_aborts_the_run() -> Result<()> {
    let fixture = Fixture::new()?;
    rewrite_input(
        &fixture,
        vec![ArchiveEntry::file("a/b/Bad.class", b"not a class".to_vec())],
    )?;
    let config = fixture.config();

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, Error::Core(_)), "unexpected error {err:?}");
    assert!(!config.output_path().exists());
    assert!(!cache::fingerprint_path(&config.output_path()).exists());
    Ok(())
}

#[test]
fn unpaired_surrogate_constants_pass_through() -> Result<()> {
    let fixture = Fixture::new()?;
    let raw = vec![0xED, 0xA0, 0x80, b'k', b'e', b'y'];
    let mut keys = ClassFile::new("a/b/K", Some("a/b/C"), AccessFlags::PUBLIC)?;
    let utf8 = keys.pool.push(Constant::Utf8Raw(raw.clone()))?;
    keys.pool.push(Constant::String { string_index: utf8 })?;
    rewrite_input(
        &fixture,
        vec![ArchiveEntry::file("a/b/K.class", encode_class(&keys)?)],
    )?;

    let report = pipeline::run(&fixture.config())?;
    assert_eq!(report.stage("remap").unwrap().entries_read, 3);
    let keys = read_class(&report.output, "com/example/K.class")?;
    assert_eq!(keys.name()?, "com/example/K");
    assert_eq!(keys.super_name()?, Some("com/example/Widget"));
    assert!(keys.pool.entries().contains(&Constant::Utf8Raw(raw)));
    Ok(())
}
