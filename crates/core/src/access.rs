//! JVM access and property flags shared by classes, fields, methods and inner-class records.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Access flag bitmask as stored in the class file.
    ///
    /// Several JVM flags share a bit depending on where they appear (`SUPER` and
    /// `SYNCHRONIZED`, `VOLATILE` and `BRIDGE`, `TRANSIENT` and `VARARGS`); both names are
    /// provided so call sites read naturally. Unknown bits are retained on decode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    /// The three visibility bits. Package-private is the absence of all of them.
    pub const VISIBILITY: AccessFlags = AccessFlags::PUBLIC
        .union(AccessFlags::PRIVATE)
        .union(AccessFlags::PROTECTED);

    /// Builds flags from a raw class file value, keeping bits without a name.
    pub fn from_raw(raw: u16) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Visibility bits only.
    pub fn visibility(self) -> AccessFlags {
        self & Self::VISIBILITY
    }

    /// Returns a copy with the visibility bits replaced by `visibility`.
    pub fn with_visibility(self, visibility: AccessFlags) -> AccessFlags {
        (self - Self::VISIBILITY) | visibility.visibility()
    }

    pub fn is_synthetic(self) -> bool {
        self.contains(Self::SYNTHETIC)
    }
}
