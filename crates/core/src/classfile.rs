//! In-memory class model.
//!
//! The model stays close to the class file layout (every name is a constant pool index) so
//! that decode followed by encode reproduces the input exactly. Transform stages go through
//! the accessors below instead of touching indices themselves.

use crate::access::AccessFlags;
use crate::constant_pool::ConstantPool;
use crate::result::Result;
use serde::{Deserialize, Serialize};

/// Internal name of the platform enum base class.
pub const ENUM_BASE_CLASS: &str = "java/lang/Enum";

/// Internal name of the root class.
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Default major version for classes built in memory (Java 8).
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

/// A raw attribute: name index plus undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}

/// Whether a member is a field or a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    Method,
}

/// A field or method declaration, owned by its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub access: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

/// Resolved, owned view of a member used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMember {
    pub kind: MemberKind,
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub pool: ConstantPool,
    pub access: AccessFlags,
    pub this_class: u16,
    /// Zero for `java/lang/Object` and `module-info`.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Creates an empty class with no members or attributes.
    pub fn new(name: &str, super_name: Option<&str>, access: AccessFlags) -> Result<Self> {
        let mut pool = ConstantPool::new();
        let this_class = pool.class_index(name)?;
        let super_class = match super_name {
            Some(super_name) => pool.class_index(super_name)?,
            None => 0,
        };
        Ok(Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            pool,
            access,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Internal name of this class.
    pub fn name(&self) -> Result<&str> {
        self.pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.pool.class_name(index))
            .collect()
    }

    pub fn add_interface(&mut self, name: &str) -> Result<()> {
        let index = self.pool.class_index(name)?;
        self.interfaces.push(index);
        Ok(())
    }

    /// Appends a field declaration and returns its position.
    pub fn add_field(&mut self, access: AccessFlags, name: &str, descriptor: &str) -> Result<usize> {
        let member = self.new_member(access, name, descriptor)?;
        self.fields.push(member);
        Ok(self.fields.len() - 1)
    }

    /// Appends a method declaration (without code) and returns its position.
    pub fn add_method(&mut self, access: AccessFlags, name: &str, descriptor: &str) -> Result<usize> {
        let member = self.new_member(access, name, descriptor)?;
        self.methods.push(member);
        Ok(self.methods.len() - 1)
    }

    fn new_member(&mut self, access: AccessFlags, name: &str, descriptor: &str) -> Result<Member> {
        Ok(Member {
            access,
            name_index: self.pool.utf8_index(name)?,
            descriptor_index: self.pool.utf8_index(descriptor)?,
            attributes: Vec::new(),
        })
    }

    pub fn members_of(&self, kind: MemberKind) -> &[Member] {
        match kind {
            MemberKind::Field => &self.fields,
            MemberKind::Method => &self.methods,
        }
    }

    pub fn members_of_mut(&mut self, kind: MemberKind) -> &mut Vec<Member> {
        match kind {
            MemberKind::Field => &mut self.fields,
            MemberKind::Method => &mut self.methods,
        }
    }

    pub fn member_name(&self, member: &Member) -> Result<&str> {
        self.pool.utf8(member.name_index)
    }

    pub fn member_descriptor(&self, member: &Member) -> Result<&str> {
        self.pool.utf8(member.descriptor_index)
    }

    /// Renames and/or retypes the member at `position`.
    pub fn set_member_symbol(
        &mut self,
        kind: MemberKind,
        position: usize,
        name: &str,
        descriptor: &str,
    ) -> Result<()> {
        let name_index = self.pool.utf8_index(name)?;
        let descriptor_index = self.pool.utf8_index(descriptor)?;
        if let Some(member) = self.members_of_mut(kind).get_mut(position) {
            member.name_index = name_index;
            member.descriptor_index = descriptor_index;
        }
        Ok(())
    }

    /// Position of the member with this exact name and descriptor.
    pub fn find_member(&self, kind: MemberKind, name: &str, descriptor: &str) -> Option<usize> {
        self.members_of(kind).iter().position(|m| {
            self.member_name(m).ok() == Some(name)
                && self.member_descriptor(m).ok() == Some(descriptor)
        })
    }

    /// Owned view of every field followed by every method.
    pub fn members(&self) -> Result<Vec<ClassMember>> {
        let mut out = Vec::with_capacity(self.fields.len() + self.methods.len());
        for kind in [MemberKind::Field, MemberKind::Method] {
            for member in self.members_of(kind) {
                out.push(ClassMember {
                    kind,
                    name: self.member_name(member)?.to_string(),
                    descriptor: self.member_descriptor(member)?.to_string(),
                    access: member.access,
                });
            }
        }
        Ok(out)
    }

    /// True for classes the compiler generated as enums.
    ///
    /// Either the `ACC_ENUM` flag or a direct `java/lang/Enum` superclass qualifies; the
    /// synthetic flag plays no part.
    pub fn is_enum(&self) -> Result<bool> {
        Ok(self.access.contains(AccessFlags::ENUM)
            || self.super_name()? == Some(ENUM_BASE_CLASS))
    }

    /// Name of an attribute in this class's pool.
    pub fn attribute_name(&self, attribute: &Attribute) -> Result<&str> {
        self.pool.utf8(attribute.name_index)
    }
}
