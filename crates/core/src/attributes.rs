//! Typed views over the attributes the remapping stages rewrite.
//!
//! Everything else stays an opaque [`Attribute`] and is written back untouched.

use crate::access::AccessFlags;
use crate::classfile::Attribute;
use crate::constant_pool::ConstantPool;
use crate::decoder::{ByteReader, read_attributes};
use crate::encoder::{ByteWriter, len_u2, write_attributes};
use crate::result::{Error, Result};

pub const CODE: &str = "Code";
pub const SIGNATURE: &str = "Signature";
pub const INNER_CLASSES: &str = "InnerClasses";
pub const ENCLOSING_METHOD: &str = "EnclosingMethod";
pub const EXCEPTIONS: &str = "Exceptions";
pub const METHOD_PARAMETERS: &str = "MethodParameters";
pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";

/// Position of the first attribute called `name`.
pub fn find(pool: &ConstantPool, attributes: &[Attribute], name: &str) -> Option<usize> {
    attributes
        .iter()
        .position(|a| pool.utf8(a.name_index).ok() == Some(name))
}

/// Replaces the body of the attribute called `name`, appending it when absent.
pub fn upsert(
    pool: &mut ConstantPool,
    attributes: &mut Vec<Attribute>,
    name: &str,
    info: Vec<u8>,
) -> Result<()> {
    match find(pool, attributes, name) {
        Some(position) => attributes[position].info = info,
        None => attributes.push(Attribute {
            name_index: pool.utf8_index(name)?,
            info,
        }),
    }
    Ok(())
}

/// Removes every attribute called `name`, returning whether any was present.
pub fn remove(pool: &ConstantPool, attributes: &mut Vec<Attribute>, name: &str) -> bool {
    let before = attributes.len();
    attributes.retain(|a| pool.utf8(a.name_index).ok() != Some(name));
    attributes.len() != before
}

fn finish(reader: &ByteReader<'_>, name: &'static str) -> Result<()> {
    if reader.remaining() != 0 {
        return Err(Error::MalformedAttribute {
            name,
            msg: format!("{} unread bytes", reader.remaining()),
        });
    }
    Ok(())
}

fn malformed(name: &'static str) -> impl FnOnce(Error) -> Error {
    move |err| Error::MalformedAttribute {
        name,
        msg: err.to_string(),
    }
}

/// Body of a `Signature` or any other single-index attribute.
pub fn parse_u2_index(info: &[u8], name: &'static str) -> Result<u16> {
    let mut reader = ByteReader::new(info);
    let index = reader.read_u2().map_err(malformed(name))?;
    finish(&reader, name)?;
    Ok(index)
}

pub fn encode_u2_index(index: u16) -> Vec<u8> {
    index.to_be_bytes().to_vec()
}

/// One record of an `InnerClasses` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner_class_info_index: u16,
    /// Zero when the inner class is local or anonymous.
    pub outer_class_info_index: u16,
    /// Zero when the inner class is anonymous.
    pub inner_name_index: u16,
    pub access: AccessFlags,
}

pub fn parse_inner_classes(info: &[u8]) -> Result<Vec<InnerClassEntry>> {
    let mut reader = ByteReader::new(info);
    let read = |reader: &mut ByteReader<'_>| -> Result<Vec<InnerClassEntry>> {
        let count = reader.read_u2()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(InnerClassEntry {
                inner_class_info_index: reader.read_u2()?,
                outer_class_info_index: reader.read_u2()?,
                inner_name_index: reader.read_u2()?,
                access: AccessFlags::from_raw(reader.read_u2()?),
            });
        }
        Ok(entries)
    };
    let entries = read(&mut reader).map_err(malformed(INNER_CLASSES))?;
    finish(&reader, INNER_CLASSES)?;
    Ok(entries)
}

pub fn encode_inner_classes(entries: &[InnerClassEntry]) -> Result<Vec<u8>> {
    let mut out = ByteWriter::with_capacity(2 + entries.len() * 8);
    out.u2(len_u2(entries.len(), INNER_CLASSES)?);
    for entry in entries {
        out.u2(entry.inner_class_info_index);
        out.u2(entry.outer_class_info_index);
        out.u2(entry.inner_name_index);
        out.u2(entry.access.bits());
    }
    Ok(out.into_inner())
}

/// Body of an `EnclosingMethod` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclosingMethodEntry {
    pub class_index: u16,
    /// `NameAndType` index, zero when not enclosed by a method.
    pub method_index: u16,
}

pub fn parse_enclosing_method(info: &[u8]) -> Result<EnclosingMethodEntry> {
    let mut reader = ByteReader::new(info);
    let class_index = reader.read_u2().map_err(malformed(ENCLOSING_METHOD))?;
    let method_index = reader.read_u2().map_err(malformed(ENCLOSING_METHOD))?;
    finish(&reader, ENCLOSING_METHOD)?;
    Ok(EnclosingMethodEntry {
        class_index,
        method_index,
    })
}

pub fn encode_enclosing_method(entry: EnclosingMethodEntry) -> Vec<u8> {
    let mut out = ByteWriter::with_capacity(4);
    out.u2(entry.class_index);
    out.u2(entry.method_index);
    out.into_inner()
}

/// One entry of the class-level `BootstrapMethods` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// `MethodHandle` index of the bootstrap method.
    pub method_ref: u16,
    /// Loadable constant indices passed as static arguments.
    pub arguments: Vec<u16>,
}

pub fn parse_bootstrap_methods(info: &[u8]) -> Result<Vec<BootstrapMethod>> {
    let mut reader = ByteReader::new(info);
    let read = |reader: &mut ByteReader<'_>| -> Result<Vec<BootstrapMethod>> {
        let count = reader.read_u2()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let method_ref = reader.read_u2()?;
            let argument_count = reader.read_u2()?;
            let arguments = (0..argument_count)
                .map(|_| reader.read_u2())
                .collect::<Result<Vec<_>>>()?;
            methods.push(BootstrapMethod {
                method_ref,
                arguments,
            });
        }
        Ok(methods)
    };
    let methods = read(&mut reader).map_err(malformed(BOOTSTRAP_METHODS))?;
    finish(&reader, BOOTSTRAP_METHODS)?;
    Ok(methods)
}

pub fn encode_bootstrap_methods(methods: &[BootstrapMethod]) -> Result<Vec<u8>> {
    let mut out = ByteWriter::with_capacity(2 + methods.len() * 6);
    out.u2(len_u2(methods.len(), BOOTSTRAP_METHODS)?);
    for method in methods {
        out.u2(method.method_ref);
        out.u2(len_u2(method.arguments.len(), BOOTSTRAP_METHODS)?);
        for argument in &method.arguments {
            out.u2(*argument);
        }
    }
    Ok(out.into_inner())
}

/// `Exceptions`: class indices of declared checked exceptions.
pub fn parse_exceptions(info: &[u8]) -> Result<Vec<u16>> {
    let mut reader = ByteReader::new(info);
    let read = |reader: &mut ByteReader<'_>| -> Result<Vec<u16>> {
        let count = reader.read_u2()?;
        (0..count).map(|_| reader.read_u2()).collect()
    };
    let indices = read(&mut reader).map_err(malformed(EXCEPTIONS))?;
    finish(&reader, EXCEPTIONS)?;
    Ok(indices)
}

pub fn encode_exceptions(indices: &[u16]) -> Result<Vec<u8>> {
    let mut out = ByteWriter::with_capacity(2 + indices.len() * 2);
    out.u2(len_u2(indices.len(), EXCEPTIONS)?);
    for &index in indices {
        out.u2(index);
    }
    Ok(out.into_inner())
}

/// One `MethodParameters` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodParameter {
    /// Zero for a parameter without a name.
    pub name_index: u16,
    pub access: AccessFlags,
}

pub fn parse_method_parameters(info: &[u8]) -> Result<Vec<MethodParameter>> {
    let mut reader = ByteReader::new(info);
    let read = |reader: &mut ByteReader<'_>| -> Result<Vec<MethodParameter>> {
        let count = reader.read_u1()?;
        let mut params = Vec::with_capacity(count as usize);
        for _ in 0..count {
            params.push(MethodParameter {
                name_index: reader.read_u2()?,
                access: AccessFlags::from_raw(reader.read_u2()?),
            });
        }
        Ok(params)
    };
    let params = read(&mut reader).map_err(malformed(METHOD_PARAMETERS))?;
    finish(&reader, METHOD_PARAMETERS)?;
    Ok(params)
}

pub fn encode_method_parameters(params: &[MethodParameter]) -> Result<Vec<u8>> {
    let count = u8::try_from(params.len()).map_err(|_| Error::MalformedAttribute {
        name: METHOD_PARAMETERS,
        msg: format!("{} parameters exceed the u1 limit", params.len()),
    })?;
    let mut out = ByteWriter::with_capacity(1 + params.len() * 4);
    out.u1(count);
    for param in params {
        out.u2(param.name_index);
        out.u2(param.access.bits());
    }
    Ok(out.into_inner())
}

/// Decoded `Code` attribute. Instructions and the exception table stay raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    /// `exception_table_length` records of 8 bytes each.
    pub exception_table: Vec<u8>,
    pub attributes: Vec<Attribute>,
}

pub fn parse_code(info: &[u8]) -> Result<CodeAttribute> {
    let mut reader = ByteReader::new(info);
    let read = |reader: &mut ByteReader<'_>| -> Result<CodeAttribute> {
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()? as usize;
        let code = reader.read_slice(code_length)?.to_vec();
        let table_length = reader.read_u2()? as usize;
        let exception_table = reader.read_slice(table_length * 8)?.to_vec();
        let attributes = read_attributes(reader)?;
        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    };
    let code = read(&mut reader).map_err(malformed(CODE))?;
    finish(&reader, CODE)?;
    Ok(code)
}

pub fn encode_code(code: &CodeAttribute) -> Result<Vec<u8>> {
    let mut out = ByteWriter::with_capacity(code.code.len() + 32);
    out.u2(code.max_stack);
    out.u2(code.max_locals);
    let code_length = u32::try_from(code.code.len()).map_err(|_| Error::MalformedAttribute {
        name: CODE,
        msg: "code longer than 4 GiB".into(),
    })?;
    out.u4(code_length);
    out.bytes(&code.code);
    out.u2(len_u2(code.exception_table.len() / 8, CODE)?);
    out.bytes(&code.exception_table);
    write_attributes(&mut out, &code.attributes)?;
    Ok(out.into_inner())
}

/// One `LocalVariableTable` / `LocalVariableTypeTable` record.
///
/// `descriptor_index` holds the signature index for the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

pub fn parse_local_variables(info: &[u8]) -> Result<Vec<LocalVariable>> {
    let mut reader = ByteReader::new(info);
    let read = |reader: &mut ByteReader<'_>| -> Result<Vec<LocalVariable>> {
        let count = reader.read_u2()?;
        let mut vars = Vec::with_capacity(count as usize);
        for _ in 0..count {
            vars.push(LocalVariable {
                start_pc: reader.read_u2()?,
                length: reader.read_u2()?,
                name_index: reader.read_u2()?,
                descriptor_index: reader.read_u2()?,
                index: reader.read_u2()?,
            });
        }
        Ok(vars)
    };
    let vars = read(&mut reader).map_err(malformed(LOCAL_VARIABLE_TABLE))?;
    finish(&reader, LOCAL_VARIABLE_TABLE)?;
    Ok(vars)
}

pub fn encode_local_variables(vars: &[LocalVariable]) -> Result<Vec<u8>> {
    let mut out = ByteWriter::with_capacity(2 + vars.len() * 10);
    out.u2(len_u2(vars.len(), LOCAL_VARIABLE_TABLE)?);
    for var in vars {
        out.u2(var.start_pc);
        out.u2(var.length);
        out.u2(var.name_index);
        out.u2(var.descriptor_index);
        out.u2(var.index);
    }
    Ok(out.into_inner())
}
