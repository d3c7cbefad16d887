use deobf_core::{AccessFlags, ClassFile};
use deobf_transform::access::{AccessRuleSet, AccessTransformer, RenameTable, RuleOrigin};
use deobf_transform::structure::StructureDescriptor;
use deobf_transform::{ClassUnit, Error};
use std::fs;

fn widget_unit() -> ClassUnit {
    let mut class = ClassFile::new("a/b/C", Some("java/lang/Object"), AccessFlags::empty()).unwrap();
    class.add_field(AccessFlags::PRIVATE, "x", "I").unwrap();
    class
        .add_field(AccessFlags::PROTECTED | AccessFlags::FINAL, "y", "J")
        .unwrap();
    class.add_method(AccessFlags::PRIVATE, "m", "(I)V").unwrap();
    class.add_method(AccessFlags::PUBLIC, "n", "()V").unwrap();
    ClassUnit::new(class).unwrap()
}

fn load(engine: &mut AccessTransformer, lines: &[&str]) {
    for (number, line) in lines.iter().enumerate() {
        engine
            .load_rule(line, RuleOrigin::new("test_at.cfg", number + 1))
            .unwrap();
    }
}

#[test]
fn rules_widen_and_track_effectiveness() {
    let mut engine = AccessTransformer::default();
    load(
        &mut engine,
        &[
            "# widen the widget",
            "public a.b.C",
            "public-f a.b.C y",
            "protected a.b.C *() # every method",
            "private a.b.C x",
        ],
    );
    assert_eq!(engine.len(), 4);

    let mut unit = widget_unit();
    assert!(engine.apply_to_class(&mut unit).unwrap());

    let members = unit.class.members().unwrap();
    assert_eq!(unit.class.access, AccessFlags::PUBLIC);
    assert_eq!(members[0].access, AccessFlags::PRIVATE);
    assert_eq!(members[1].access, AccessFlags::PUBLIC);
    // private m widens to protected; public n stays public
    assert_eq!(members[2].access, AccessFlags::PROTECTED);
    assert_eq!(members[3].access, AccessFlags::PUBLIC);

    let outcome = engine.outcome();
    let broken: Vec<_> = outcome.broken().into_iter().map(|r| r.raw_text).collect();
    // x is already private, so that rule never changes anything
    assert_eq!(broken, vec!["private a.b.C x"]);

    // a second pass changes nothing and leaves effective rules effective
    assert!(!engine.apply_to_class(&mut unit).unwrap());
    assert_eq!(engine.outcome().broken_count(), 1);
}

#[test]
fn rename_tables_and_files_feed_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("fields.csv");
    fs::write(&csv, "searge,name,side,desc\nfield_1_a,x,2,\n").unwrap();
    let at = dir.path().join("mine_at.cfg");
    fs::write(&at, "public a.b.C field_1_a\npublic a.b.Missing\n").unwrap();

    let mut renames = RenameTable::new();
    assert_eq!(renames.load_csv(&csv).unwrap(), 1);
    let mut engine = AccessTransformer::new(renames);
    assert_eq!(engine.load_source(&at).unwrap(), 2);
    // the same file through another path is skipped
    let again = dir.path().join(".").join("mine_at.cfg");
    assert_eq!(engine.load_source(&again).unwrap(), 0);

    let mut unit = widget_unit();
    assert!(engine.apply_to_class(&mut unit).unwrap());
    assert_eq!(unit.class.fields[0].access, AccessFlags::PUBLIC);

    let outcome = engine.outcome();
    assert_eq!(outcome.broken_count(), 1);
    let broken = &outcome.broken()[0];
    assert_eq!(broken.raw_text, "public a.b.Missing");
    assert_eq!(broken.origin.line, 2);
}

#[test]
fn malformed_rules_report_their_line() {
    let mut engine = AccessTransformer::default();
    let err = engine
        .load_rule("widest a.b.C x y", RuleOrigin::new("bad_at.cfg", 7))
        .unwrap_err();
    assert!(matches!(err, Error::RuleParse { line: 7, .. }));
}

#[test]
fn inner_class_rules_rewrite_descriptor_access() {
    let mut descriptor: StructureDescriptor = serde_json::from_str(
        r#"{
            "a/b/C": {
                "innerClasses": [
                    { "inner_class": "a/b/C$D", "outer_class": "a/b/C", "inner_name": "D", "access": "2" }
                ]
            },
            "a/b/C$D": {
                "innerClasses": [
                    { "inner_class": "a/b/C$D", "outer_class": "a/b/C", "inner_name": "D", "access": "a" }
                ]
            }
        }"#,
    )
    .unwrap();

    let mut engine = AccessTransformer::default();
    load(&mut engine, &["public a.b.C$D", "public a.b.C$D x"]);
    let updated = descriptor.apply_access_rules(engine.rules()).unwrap();
    assert_eq!(updated, 2);

    for owner in ["a/b/C", "a/b/C$D"] {
        let records = descriptor.get(owner).unwrap().inner_classes.as_ref().unwrap();
        let flags = records[0].access_flags().unwrap();
        assert!(flags.contains(AccessFlags::PUBLIC));
        assert!(!flags.contains(AccessFlags::PRIVATE));
    }
    let json = descriptor.to_json_pretty().unwrap();
    assert!(json.contains(r#""access": "1""#));
    assert!(json.contains(r#""access": "9""#));
}
