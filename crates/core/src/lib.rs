//! Class file model, codec and jar archive I/O.
//!
//! [`decode_class`] parses a class file into a [`ClassFile`] whose constant pool can be
//! edited append-only; [`encode_class`] writes it back. Unmodified classes round-trip
//! byte for byte.

pub mod access;
pub mod archive;
pub mod attributes;
pub mod classfile;
pub mod constant_pool;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod mutf8;
pub mod result;

pub use access::AccessFlags;
pub use archive::{ArchiveEntry, ArchiveReader, ArchiveWriter};
pub use classfile::{Attribute, ClassFile, ClassMember, Member, MemberKind};
pub use constant_pool::{Constant, ConstantPool};
pub use decoder::decode_class;
pub use encoder::encode_class;
pub use result::{Error, Result};
