//! Core results and error types

use std::path::PathBuf;
use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The class file ended before a complete structure could be read.
    #[error("unexpected end of class file at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof {
        /// Offset at which the read was attempted.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
    },

    /// The class file did not start with `0xCAFEBABE`.
    #[error("invalid class file magic 0x{0:08x}")]
    InvalidMagic(u32),

    /// The constant pool contains a tag this reader does not understand.
    #[error("unsupported constant pool tag {tag} at index {index}")]
    UnsupportedConstant {
        /// Raw tag byte.
        tag: u8,
        /// Constant pool index of the entry.
        index: u16,
    },

    /// A constant pool reference points outside the pool or at the wrong kind of entry.
    #[error("invalid constant pool index {index}: expected {expected}")]
    InvalidConstantIndex {
        /// Offending index.
        index: u16,
        /// Entry kind the caller expected to find.
        expected: &'static str,
    },

    /// The constant pool grew past the 65535 entry limit.
    #[error("constant pool overflow: more than 65535 entries")]
    PoolOverflow,

    /// A `CONSTANT_Utf8` entry is not valid modified UTF-8.
    #[error("malformed modified UTF-8 at byte {0}")]
    MalformedUtf8(usize),

    /// A field or method descriptor is malformed.
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),

    /// A known attribute has a body that does not match its declared layout.
    #[error("malformed {name} attribute: {msg}")]
    MalformedAttribute {
        /// Attribute name.
        name: &'static str,
        /// Description of the problem.
        msg: String,
    },

    /// Bytes remained after the last class file structure.
    #[error("{0} trailing bytes after class file")]
    TrailingBytes(usize),

    /// Failed to read or write a file at the specified path.
    #[error("could not access file '{path}': {source}")]
    File {
        /// The path to the file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The archive container could not be read or written.
    #[error("archive error in '{path}': {source}")]
    Zip {
        /// The archive path.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Generic IO failure without a path.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
