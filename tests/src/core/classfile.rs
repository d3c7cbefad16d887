use deobf_core::attributes::{self, CodeAttribute, LocalVariable};
use deobf_core::descriptor::{parameter_sizes, remap_descriptor, remap_signature};
use deobf_core::{AccessFlags, ClassFile, Constant, Error, MemberKind, decode_class, encode_class};

fn sample_class() -> ClassFile {
    let mut class = ClassFile::new(
        "a/b/C",
        Some("java/lang/Object"),
        AccessFlags::PUBLIC | AccessFlags::SUPER,
    )
    .unwrap();
    class.add_interface("java/lang/Runnable").unwrap();
    class.add_field(AccessFlags::PRIVATE, "x", "I").unwrap();
    class.add_field(AccessFlags::PRIVATE | AccessFlags::STATIC, "big", "J").unwrap();
    class.pool.push(Constant::Long(-1)).unwrap();
    class.pool.push(Constant::Double(f64::NAN.to_bits())).unwrap();
    class.pool.push(Constant::Utf8("caf\u{e9} \u{0} \u{1F600}".into())).unwrap();

    let position = class.add_method(AccessFlags::PUBLIC, "run", "()V").unwrap();
    let this_name = class.pool.utf8_index("this").unwrap();
    let this_desc = class.pool.utf8_index("La/b/C;").unwrap();
    let table = attributes::encode_local_variables(&[LocalVariable {
        start_pc: 0,
        length: 1,
        name_index: this_name,
        descriptor_index: this_desc,
        index: 0,
    }])
    .unwrap();
    let lvt = class.pool.utf8_index(attributes::LOCAL_VARIABLE_TABLE).unwrap();
    let code = attributes::encode_code(&CodeAttribute {
        max_stack: 0,
        max_locals: 1,
        code: vec![0xb1],
        exception_table: Vec::new(),
        attributes: vec![deobf_core::Attribute {
            name_index: lvt,
            info: table,
        }],
    })
    .unwrap();
    let ClassFile { pool, methods, .. } = &mut class;
    attributes::upsert(pool, &mut methods[position].attributes, attributes::CODE, code).unwrap();
    class
}

#[test]
fn built_class_survives_decode_and_encode() {
    let bytes = encode_class(&sample_class()).unwrap();
    assert_eq!(hex::encode(&bytes[..4]), "cafebabe");

    let decoded = decode_class(&bytes).unwrap();
    assert_eq!(decoded.name().unwrap(), "a/b/C");
    assert_eq!(decoded.super_name().unwrap(), Some("java/lang/Object"));
    assert_eq!(decoded.interface_names().unwrap(), vec!["java/lang/Runnable"]);
    assert_eq!(decoded.members().unwrap().len(), 3);
    assert!(decoded.find_member(MemberKind::Field, "big", "J").is_some());

    assert_eq!(encode_class(&decoded).unwrap(), bytes);
}

#[test]
fn renames_append_to_the_pool() {
    let mut class = sample_class();
    let before = class.pool.count();
    let old_name = class.pool.get(class.this_class).unwrap().clone();

    class.pool.rename_class(class.this_class, "com/example/Widget").unwrap();
    assert_eq!(class.name().unwrap(), "com/example/Widget");
    assert!(class.pool.count() > before);
    // the original Utf8 entry is untouched
    assert!(class.pool.entries().contains(&Constant::Utf8("a/b/C".into())));
    assert!(matches!(old_name, Constant::Class { .. }));

    let reread = decode_class(&encode_class(&class).unwrap()).unwrap();
    assert_eq!(reread.name().unwrap(), "com/example/Widget");
}

#[test]
fn unpaired_surrogate_strings_survive_byte_for_byte() {
    let mut class = sample_class();
    let raw = vec![0xED, 0xA0, 0x80, b'a'];
    let utf8 = class.pool.push(Constant::Utf8Raw(raw.clone())).unwrap();
    class.pool.push(Constant::String { string_index: utf8 }).unwrap();
    let bytes = encode_class(&class).unwrap();

    let decoded = decode_class(&bytes).unwrap();
    assert_eq!(decoded.pool.get(utf8).unwrap(), &Constant::Utf8Raw(raw));
    assert!(decoded.pool.utf8(utf8).is_err());
    assert_eq!(encode_class(&decoded).unwrap(), bytes);
}

#[test]
fn malformed_input_is_rejected() {
    assert!(matches!(
        decode_class(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 52]),
        Err(Error::InvalidMagic(0xdeadbeef))
    ));

    let bytes = encode_class(&sample_class()).unwrap();
    assert!(matches!(
        decode_class(&bytes[..bytes.len() - 3]),
        Err(Error::UnexpectedEof { .. })
    ));

    let mut padded = bytes.clone();
    padded.extend_from_slice(&[0, 0]);
    assert!(matches!(decode_class(&padded), Err(Error::TrailingBytes(2))));
}

#[test]
fn descriptors_and_signatures_follow_a_class_map() {
    let map = |name: &str| match name {
        "a/b/C" => Some("com/example/Widget".to_string()),
        "a/b/C$D" => Some("com/example/Widget$Part".to_string()),
        _ => None,
    };
    assert_eq!(
        remap_descriptor("(La/b/C;[[La/b/C$D;I)La/b/C;", map).unwrap(),
        "(Lcom/example/Widget;[[Lcom/example/Widget$Part;I)Lcom/example/Widget;"
    );
    assert_eq!(
        remap_signature("<T:La/b/C;>Ljava/util/List<+La/b/C<TT;>.D;>;", map).unwrap(),
        "<T:Lcom/example/Widget;>Ljava/util/List<+Lcom/example/Widget<TT;>.Part;>;"
    );
    assert_eq!(parameter_sizes("(IJLa/b/C;D[J)V").unwrap(), vec![1, 2, 1, 2, 1]);
    assert!(remap_descriptor("(La/b/C", map).is_err());
}
