//! Class file constant pool.
//!
//! Edits are append-only: renaming a symbol adds (or reuses) a `Utf8`/`NameAndType` entry and
//! repoints the referring entry, so indices baked into method bytecode never move.

use crate::result::{Error, Result};
use std::collections::HashMap;

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELDREF: u8 = 9;
pub const TAG_METHODREF: u8 = 10;
pub const TAG_INTERFACE_METHODREF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

/// A single constant pool entry.
///
/// Floating point values are kept as raw bits so NaN payloads survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0 and the slot following a `Long`/`Double`.
    Unusable,
    Utf8(String),
    /// A `Utf8` entry holding an unpaired surrogate, kept as its original bytes.
    Utf8Raw(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl Constant {
    /// Class file tag byte, `None` for [`Constant::Unusable`].
    pub fn tag(&self) -> Option<u8> {
        Some(match self {
            Constant::Unusable => return None,
            Constant::Utf8(_) | Constant::Utf8Raw(_) => TAG_UTF8,
            Constant::Integer(_) => TAG_INTEGER,
            Constant::Float(_) => TAG_FLOAT,
            Constant::Long(_) => TAG_LONG,
            Constant::Double(_) => TAG_DOUBLE,
            Constant::Class { .. } => TAG_CLASS,
            Constant::String { .. } => TAG_STRING,
            Constant::Fieldref { .. } => TAG_FIELDREF,
            Constant::Methodref { .. } => TAG_METHODREF,
            Constant::InterfaceMethodref { .. } => TAG_INTERFACE_METHODREF,
            Constant::NameAndType { .. } => TAG_NAME_AND_TYPE,
            Constant::MethodHandle { .. } => TAG_METHOD_HANDLE,
            Constant::MethodType { .. } => TAG_METHOD_TYPE,
            Constant::Dynamic { .. } => TAG_DYNAMIC,
            Constant::InvokeDynamic { .. } => TAG_INVOKE_DYNAMIC,
            Constant::Module { .. } => TAG_MODULE,
            Constant::Package { .. } => TAG_PACKAGE,
        })
    }

    /// Long and Double occupy two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// Kind of a symbolic member reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A resolved `Fieldref`/`Methodref`/`InterfaceMethodref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub kind: RefKind,
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    utf8_lookup: HashMap<String, u16>,
    class_lookup: HashMap<u16, u16>,
    nat_lookup: HashMap<(u16, u16), u16>,
}

impl ConstantPool {
    /// Creates an empty pool holding only the reserved slot 0.
    pub fn new() -> Self {
        Self::from_entries(vec![Constant::Unusable])
    }

    /// Builds a pool from decoded entries. `entries[0]` must be the reserved slot.
    pub fn from_entries(entries: Vec<Constant>) -> Self {
        let mut pool = Self {
            entries,
            ..Default::default()
        };
        for (index, entry) in pool.entries.iter().enumerate() {
            let index = index as u16;
            match entry {
                Constant::Utf8(value) => {
                    pool.utf8_lookup.entry(value.clone()).or_insert(index);
                }
                Constant::Class { name_index } => {
                    pool.class_lookup.entry(*name_index).or_insert(index);
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    pool.nat_lookup
                        .entry((*name_index, *descriptor_index))
                        .or_insert(index);
                }
                _ => {}
            }
        }
        pool
    }

    /// Value written as `constant_pool_count`.
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Every slot including the reserved slot 0.
    pub fn entries(&self) -> &[Constant] {
        &self.entries
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(Error::InvalidConstantIndex {
                index,
                expected: "usable entry",
            }),
            Some(entry) => Ok(entry),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            _ => Err(Error::InvalidConstantIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Internal name referenced by a `Class` entry.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(Error::InvalidConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// `(name, descriptor)` of a `NameAndType` entry.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(Error::InvalidConstantIndex {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolves a field or method reference entry.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        let (kind, class_index, nat_index) = match self.get(index)? {
            Constant::Fieldref {
                class_index,
                name_and_type_index,
            } => (RefKind::Field, *class_index, *name_and_type_index),
            Constant::Methodref {
                class_index,
                name_and_type_index,
            } => (RefKind::Method, *class_index, *name_and_type_index),
            Constant::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (RefKind::InterfaceMethod, *class_index, *name_and_type_index),
            _ => {
                return Err(Error::InvalidConstantIndex {
                    index,
                    expected: "member reference",
                });
            }
        };
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef {
            kind,
            owner,
            name,
            descriptor,
        })
    }

    /// Appends an entry, reserving the extra slot for wide constants.
    pub fn push(&mut self, entry: Constant) -> Result<u16> {
        let needed = if entry.is_wide() { 2 } else { 1 };
        if self.entries.len() + needed > u16::MAX as usize {
            return Err(Error::PoolOverflow);
        }
        let index = self.entries.len() as u16;
        match &entry {
            Constant::Utf8(value) => {
                self.utf8_lookup.entry(value.clone()).or_insert(index);
            }
            Constant::Class { name_index } => {
                self.class_lookup.entry(*name_index).or_insert(index);
            }
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => {
                self.nat_lookup
                    .entry((*name_index, *descriptor_index))
                    .or_insert(index);
            }
            _ => {}
        }
        let wide = entry.is_wide();
        self.entries.push(entry);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }

    /// Index of a `Utf8` entry holding `value`, appending one if needed.
    pub fn utf8_index(&mut self, value: &str) -> Result<u16> {
        if let Some(&index) = self.utf8_lookup.get(value) {
            return Ok(index);
        }
        self.push(Constant::Utf8(value.to_string()))
    }

    /// Index of a `Class` entry naming `name`, appending one if needed.
    pub fn class_index(&mut self, name: &str) -> Result<u16> {
        let name_index = self.utf8_index(name)?;
        if let Some(&index) = self.class_lookup.get(&name_index) {
            return Ok(index);
        }
        self.push(Constant::Class { name_index })
    }

    /// Index of a `NameAndType` entry, appending one if needed.
    pub fn name_and_type_index(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.utf8_index(name)?;
        let descriptor_index = self.utf8_index(descriptor)?;
        if let Some(&index) = self.nat_lookup.get(&(name_index, descriptor_index)) {
            return Ok(index);
        }
        self.push(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// Repoints the `Class` entry at `index` so every reference to it sees `new_name`.
    pub fn rename_class(&mut self, index: u16, new_name: &str) -> Result<()> {
        let name_index = self.utf8_index(new_name)?;
        match self.entries.get_mut(index as usize) {
            Some(Constant::Class { name_index: slot }) => {
                *slot = name_index;
                Ok(())
            }
            _ => Err(Error::InvalidConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// Repoints a member reference at a `NameAndType` carrying the new name and descriptor.
    ///
    /// The shared `NameAndType` entry itself is left untouched because other references with
    /// a different owner may still use it.
    pub fn rename_member_ref(&mut self, index: u16, name: &str, descriptor: &str) -> Result<()> {
        let nat = self.name_and_type_index(name, descriptor)?;
        match self.entries.get_mut(index as usize) {
            Some(
                Constant::Fieldref {
                    name_and_type_index,
                    ..
                }
                | Constant::Methodref {
                    name_and_type_index,
                    ..
                }
                | Constant::InterfaceMethodref {
                    name_and_type_index,
                    ..
                }
                | Constant::Dynamic {
                    name_and_type_index,
                    ..
                }
                | Constant::InvokeDynamic {
                    name_and_type_index,
                    ..
                },
            ) => {
                *name_and_type_index = nat;
                Ok(())
            }
            _ => Err(Error::InvalidConstantIndex {
                index,
                expected: "member reference",
            }),
        }
    }

    /// Repoints a `MethodType` entry at a new descriptor.
    pub fn retype_method_type(&mut self, index: u16, descriptor: &str) -> Result<()> {
        let descriptor_utf8 = self.utf8_index(descriptor)?;
        match self.entries.get_mut(index as usize) {
            Some(Constant::MethodType { descriptor_index }) => {
                *descriptor_index = descriptor_utf8;
                Ok(())
            }
            _ => Err(Error::InvalidConstantIndex {
                index,
                expected: "MethodType",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_reuse_existing_entries() {
        let mut pool = ConstantPool::new();
        let a = pool.class_index("a/b/C").unwrap();
        let b = pool.class_index("a/b/C").unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.push(Constant::Long(7)).unwrap();
        let next = pool.utf8_index("x").unwrap();
        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert!(pool.get(2).is_err());
    }

    #[test]
    fn renaming_a_reference_leaves_shared_name_and_type_alone() {
        let mut pool = ConstantPool::new();
        let owner_a = pool.class_index("A").unwrap();
        let owner_b = pool.class_index("B").unwrap();
        let nat = pool.name_and_type_index("x", "I").unwrap();
        let ref_a = pool
            .push(Constant::Fieldref {
                class_index: owner_a,
                name_and_type_index: nat,
            })
            .unwrap();
        let ref_b = pool
            .push(Constant::Fieldref {
                class_index: owner_b,
                name_and_type_index: nat,
            })
            .unwrap();

        pool.rename_member_ref(ref_a, "renamed", "I").unwrap();

        assert_eq!(pool.member_ref(ref_a).unwrap().name, "renamed");
        assert_eq!(pool.member_ref(ref_b).unwrap().name, "x");
    }
}
