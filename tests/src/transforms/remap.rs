use deobf_core::{AccessFlags, ClassFile, Constant, MemberKind, decode_class, encode_class};
use deobf_transform::hierarchy::ClassHierarchy;
use deobf_transform::mapping::MappingTable;
use deobf_transform::remap::Remapper;
use deobf_transform::resolver::RenameResolver;

const SRG: &str = "\
PK: a/b com/example
CL: a/b/C com/example/Widget
CL: a/b/D com/example/Gadget
FD: a/b/C/x com/example/Widget/widgetValue
MD: a/b/C/m (La/b/C;)I com/example/Widget/measure (Lcom/example/Widget;)I
";

/// `a/b/C` plus a subclass `a/b/D` that calls the inherited `m` through its own name.
fn obfuscated_classes() -> Vec<ClassFile> {
    let mut base = ClassFile::new("a/b/C", Some("java/lang/Object"), AccessFlags::PUBLIC).unwrap();
    base.add_field(AccessFlags::PRIVATE, "x", "I").unwrap();
    base.add_method(AccessFlags::PUBLIC, "m", "(La/b/C;)I").unwrap();

    let mut sub = ClassFile::new("a/b/D", Some("a/b/C"), AccessFlags::PUBLIC).unwrap();
    sub.add_field(AccessFlags::PRIVATE, "peer", "La/b/C;").unwrap();
    let owner = sub.pool.class_index("a/b/D").unwrap();
    let nat = sub.pool.name_and_type_index("m", "(La/b/C;)I").unwrap();
    sub.pool
        .push(Constant::Methodref {
            class_index: owner,
            name_and_type_index: nat,
        })
        .unwrap();
    vec![base, sub]
}

fn remap_all(classes: Vec<ClassFile>, mapping: &MappingTable) -> Vec<ClassFile> {
    let mut hierarchy = ClassHierarchy::new();
    for class in &classes {
        hierarchy.insert_class(class).unwrap();
    }
    let remapper = Remapper::new(RenameResolver::new(mapping, &hierarchy));
    classes
        .into_iter()
        .map(|mut class| {
            remapper.remap_class(&mut class).unwrap();
            // everything goes through the codec, as it would in an archive
            decode_class(&encode_class(&class).unwrap()).unwrap()
        })
        .collect()
}

fn member_ref(class: &ClassFile) -> (String, String, String) {
    let index = class
        .pool
        .entries()
        .iter()
        .position(|c| matches!(c, Constant::Methodref { .. }))
        .unwrap() as u16;
    let member = class.pool.member_ref(index).unwrap();
    (
        member.owner.to_string(),
        member.name.to_string(),
        member.descriptor.to_string(),
    )
}

#[test]
fn inherited_members_resolve_through_the_hierarchy() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let mapping = MappingTable::parse(SRG, "joined.srg").unwrap();
    let remapped = remap_all(obfuscated_classes(), &mapping);

    let (base, sub) = (&remapped[0], &remapped[1]);
    assert_eq!(base.name().unwrap(), "com/example/Widget");
    assert!(base.find_member(MemberKind::Field, "widgetValue", "I").is_some());
    assert!(
        base.find_member(MemberKind::Method, "measure", "(Lcom/example/Widget;)I")
            .is_some()
    );

    assert_eq!(sub.name().unwrap(), "com/example/Gadget");
    assert_eq!(sub.super_name().unwrap(), Some("com/example/Widget"));
    assert!(sub.find_member(MemberKind::Field, "peer", "Lcom/example/Widget;").is_some());
    assert_eq!(
        member_ref(sub),
        (
            "com/example/Gadget".to_string(),
            "measure".to_string(),
            "(Lcom/example/Widget;)I".to_string()
        )
    );
}

#[test]
fn inverse_mapping_restores_every_symbol() {
    let mapping = MappingTable::parse(SRG, "joined.srg").unwrap();
    let inverse = mapping.inverse().unwrap();

    let original = obfuscated_classes();
    let restored = remap_all(remap_all(original.clone(), &mapping), &inverse);

    for (before, after) in original.iter().zip(&restored) {
        assert_eq!(after.name().unwrap(), before.name().unwrap());
        assert_eq!(after.super_name().unwrap(), before.super_name().unwrap());
        assert_eq!(after.members().unwrap(), before.members().unwrap());
    }
    assert_eq!(
        member_ref(&restored[1]),
        ("a/b/D".to_string(), "m".to_string(), "(La/b/C;)I".to_string())
    );
}

#[test]
fn unmapped_classes_follow_their_package() {
    let mapping = MappingTable::parse(SRG, "joined.srg").unwrap();
    let loose = ClassFile::new("a/b/Zed", Some("a/b/C"), AccessFlags::PUBLIC).unwrap();
    let remapped = remap_all(vec![loose], &mapping);
    assert_eq!(remapped[0].name().unwrap(), "com/example/Zed");
    assert_eq!(remapped[0].super_name().unwrap(), Some("com/example/Widget"));
}
