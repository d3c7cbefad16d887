//! Module for encoding a [`ClassFile`] back into class file bytes.

use crate::classfile::{Attribute, ClassFile, Member};
use crate::constant_pool::Constant;
use crate::mutf8;
use crate::result::{Error, Result};

/// Encodes a class model into class file bytes.
///
/// Encoding never reorders or compacts the constant pool, so an unmodified model encodes to
/// exactly the bytes it was decoded from.
pub fn encode_class(class: &ClassFile) -> Result<Vec<u8>> {
    let mut out = ByteWriter::with_capacity(4096);

    out.u4(0xCAFE_BABE);
    out.u2(class.minor_version);
    out.u2(class.major_version);

    out.u2(class.pool.count());
    for entry in class.pool.entries() {
        write_constant(&mut out, entry)?;
    }

    out.u2(class.access.bits());
    out.u2(class.this_class);
    out.u2(class.super_class);
    out.u2(len_u2(class.interfaces.len(), "interfaces")?);
    for &interface in &class.interfaces {
        out.u2(interface);
    }

    write_members(&mut out, &class.fields)?;
    write_members(&mut out, &class.methods)?;
    write_attributes(&mut out, &class.attributes)?;

    tracing::debug!("Encoded class into {} bytes", out.len());
    Ok(out.into_inner())
}

fn write_constant(out: &mut ByteWriter, entry: &Constant) -> Result<()> {
    let Some(tag) = entry.tag() else {
        // reserved slots have no bytes of their own
        return Ok(());
    };
    out.u1(tag);
    match entry {
        Constant::Unusable => {}
        Constant::Utf8(value) => {
            let bytes = mutf8::encode(value);
            out.u2(len_u2(bytes.len(), "Utf8 constant")?);
            out.bytes(&bytes);
        }
        Constant::Utf8Raw(bytes) => {
            out.u2(len_u2(bytes.len(), "Utf8 constant")?);
            out.bytes(bytes);
        }
        Constant::Integer(value) => out.u4(*value as u32),
        Constant::Float(bits) => out.u4(*bits),
        Constant::Long(value) => out.u8(*value as u64),
        Constant::Double(bits) => out.u8(*bits),
        Constant::Class { name_index } => out.u2(*name_index),
        Constant::String { string_index } => out.u2(*string_index),
        Constant::Fieldref {
            class_index,
            name_and_type_index,
        }
        | Constant::Methodref {
            class_index,
            name_and_type_index,
        }
        | Constant::InterfaceMethodref {
            class_index,
            name_and_type_index,
        } => {
            out.u2(*class_index);
            out.u2(*name_and_type_index);
        }
        Constant::NameAndType {
            name_index,
            descriptor_index,
        } => {
            out.u2(*name_index);
            out.u2(*descriptor_index);
        }
        Constant::MethodHandle {
            reference_kind,
            reference_index,
        } => {
            out.u1(*reference_kind);
            out.u2(*reference_index);
        }
        Constant::MethodType { descriptor_index } => out.u2(*descriptor_index),
        Constant::Dynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        }
        | Constant::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        } => {
            out.u2(*bootstrap_method_attr_index);
            out.u2(*name_and_type_index);
        }
        Constant::Module { name_index } | Constant::Package { name_index } => {
            out.u2(*name_index)
        }
    }
    Ok(())
}

fn write_members(out: &mut ByteWriter, members: &[Member]) -> Result<()> {
    out.u2(len_u2(members.len(), "members")?);
    for member in members {
        out.u2(member.access.bits());
        out.u2(member.name_index);
        out.u2(member.descriptor_index);
        write_attributes(out, &member.attributes)?;
    }
    Ok(())
}

pub(crate) fn write_attributes(out: &mut ByteWriter, attributes: &[Attribute]) -> Result<()> {
    out.u2(len_u2(attributes.len(), "attributes")?);
    for attribute in attributes {
        out.u2(attribute.name_index);
        let len = u32::try_from(attribute.info.len()).map_err(|_| Error::MalformedAttribute {
            name: "attribute",
            msg: "body longer than 4 GiB".into(),
        })?;
        out.u4(len);
        out.bytes(&attribute.info);
    }
    Ok(())
}

pub(crate) fn len_u2(len: usize, what: &'static str) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::MalformedAttribute {
        name: what,
        msg: format!("{len} items exceed the u2 limit"),
    })
}

/// Big-endian byte sink.
#[derive(Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn u1(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn u2(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn u4(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn u8(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub(crate) fn bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }
}
