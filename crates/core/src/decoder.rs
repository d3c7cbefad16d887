//! Single entry-point for turning class file bytes into a [`ClassFile`].

use crate::access::AccessFlags;
use crate::classfile::{Attribute, ClassFile, Member};
use crate::constant_pool::*;
use crate::mutf8;
use crate::result::{Error, Result};

const MAGIC: u32 = 0xCAFE_BABE;

/// Decodes a complete class file.
///
/// Every byte must be consumed; trailing data is treated as a malformed class.
pub fn decode_class(bytes: &[u8]) -> Result<ClassFile> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.read_u4()?;
    if magic != MAGIC {
        return Err(Error::InvalidMagic(magic));
    }
    let minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let pool = read_constant_pool(&mut reader)?;

    let access = AccessFlags::from_raw(reader.read_u2()?);
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(reader.read_u2()?);
    }

    let fields = read_members(&mut reader)?;
    let methods = read_members(&mut reader)?;
    let attributes = read_attributes(&mut reader)?;

    if reader.remaining() != 0 {
        return Err(Error::TrailingBytes(reader.remaining()));
    }

    let class = ClassFile {
        minor_version,
        major_version,
        pool,
        access,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    };

    // fail early on dangling structural references
    class.name()?;
    class.super_name()?;
    class.interface_names()?;
    for kind in [crate::MemberKind::Field, crate::MemberKind::Method] {
        for member in class.members_of(kind) {
            class.member_name(member)?;
            class.member_descriptor(member)?;
        }
    }

    tracing::debug!(
        "Decoded class {} (v{}.{}, {} constants, {} fields, {} methods)",
        class.name()?,
        major_version,
        minor_version,
        class.pool.count(),
        class.fields.len(),
        class.methods.len()
    );

    Ok(class)
}

fn read_constant_pool(reader: &mut ByteReader<'_>) -> Result<ConstantPool> {
    let count = reader.read_u2()? as usize;
    let mut entries = Vec::with_capacity(count);
    entries.push(Constant::Unusable);

    while entries.len() < count {
        let index = entries.len() as u16;
        let tag = reader.read_u1()?;
        let entry = match tag {
            TAG_UTF8 => {
                let length = reader.read_u2()? as usize;
                let bytes = reader.read_slice(length)?;
                match mutf8::decode_lenient(bytes)? {
                    Some(value) => Constant::Utf8(value),
                    None => Constant::Utf8Raw(bytes.to_vec()),
                }
            }
            TAG_INTEGER => Constant::Integer(reader.read_u4()? as i32),
            TAG_FLOAT => Constant::Float(reader.read_u4()?),
            TAG_LONG => Constant::Long(reader.read_u8()? as i64),
            TAG_DOUBLE => Constant::Double(reader.read_u8()?),
            TAG_CLASS => Constant::Class {
                name_index: reader.read_u2()?,
            },
            TAG_STRING => Constant::String {
                string_index: reader.read_u2()?,
            },
            TAG_FIELDREF => Constant::Fieldref {
                class_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_METHODREF => Constant::Methodref {
                class_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_INTERFACE_METHODREF => Constant::InterfaceMethodref {
                class_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_NAME_AND_TYPE => Constant::NameAndType {
                name_index: reader.read_u2()?,
                descriptor_index: reader.read_u2()?,
            },
            TAG_METHOD_HANDLE => Constant::MethodHandle {
                reference_kind: reader.read_u1()?,
                reference_index: reader.read_u2()?,
            },
            TAG_METHOD_TYPE => Constant::MethodType {
                descriptor_index: reader.read_u2()?,
            },
            TAG_DYNAMIC => Constant::Dynamic {
                bootstrap_method_attr_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                bootstrap_method_attr_index: reader.read_u2()?,
                name_and_type_index: reader.read_u2()?,
            },
            TAG_MODULE => Constant::Module {
                name_index: reader.read_u2()?,
            },
            TAG_PACKAGE => Constant::Package {
                name_index: reader.read_u2()?,
            },
            other => return Err(Error::UnsupportedConstant { tag: other, index }),
        };

        let wide = entry.is_wide();
        entries.push(entry);
        if wide {
            entries.push(Constant::Unusable);
        }
    }

    // a wide constant in the last slot would overrun the declared count
    if entries.len() != count {
        return Err(Error::InvalidConstantIndex {
            index: (count.saturating_sub(1)) as u16,
            expected: "constant within declared pool count",
        });
    }

    Ok(ConstantPool::from_entries(entries))
}

fn read_members(reader: &mut ByteReader<'_>) -> Result<Vec<Member>> {
    let count = reader.read_u2()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = AccessFlags::from_raw(reader.read_u2()?);
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes = read_attributes(reader)?;
        members.push(Member {
            access,
            name_index,
            descriptor_index,
            attributes,
        });
    }
    Ok(members)
}

pub(crate) fn read_attributes(reader: &mut ByteReader<'_>) -> Result<Vec<Attribute>> {
    let count = reader.read_u2()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_slice(length)?.to_vec();
        attributes.push(Attribute { name_index, info });
    }
    Ok(attributes)
}

/// Big-endian cursor over a byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                needed: len,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u64> {
        let hi = self.read_u4()? as u64;
        let lo = self.read_u4()? as u64;
        Ok((hi << 32) | lo)
    }
}
