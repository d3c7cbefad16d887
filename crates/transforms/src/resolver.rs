//! Inheritance-aware rename resolution.

use crate::hierarchy::ClassHierarchy;
use crate::mapping::MappingTable;
use deobf_core::MemberKind;
use deobf_core::descriptor::{remap_class_reference, remap_descriptor, remap_signature};

/// Special method names that are never renamed.
const RESERVED_METHODS: [&str; 2] = ["<init>", "<clinit>"];

/// Resolves old-space symbols to new-space symbols.
///
/// Lookups are pure: a symbol without a mapping (including every platform class) simply
/// keeps its name.
#[derive(Debug, Clone, Copy)]
pub struct RenameResolver<'a> {
    mapping: &'a MappingTable,
    hierarchy: &'a ClassHierarchy,
}

impl<'a> RenameResolver<'a> {
    pub fn new(mapping: &'a MappingTable, hierarchy: &'a ClassHierarchy) -> Self {
        Self { mapping, hierarchy }
    }

    pub fn resolve_class(&self, old: &str) -> Option<String> {
        self.mapping.resolve_class(old)
    }

    /// New name for a member referenced through `owner`.
    ///
    /// The owner is checked first, then every supertype the hierarchy knows about, so an
    /// override or an inherited reference picks up the name of the declaring class's entry.
    pub fn resolve_member(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        kind: MemberKind,
    ) -> Option<String> {
        if kind == MemberKind::Method && RESERVED_METHODS.contains(&name) {
            return None;
        }
        let lookup = |class: &str| match kind {
            MemberKind::Field => self.mapping.field(class, name),
            MemberKind::Method => self.mapping.method(class, name, descriptor),
        };
        if let Some(found) = lookup(owner) {
            return Some(found.to_string());
        }
        self.hierarchy
            .ancestors(owner)
            .into_iter()
            .find_map(lookup)
            .map(str::to_string)
    }

    /// New name for an `invokedynamic` call site that produces `interface`.
    ///
    /// With the erased functional descriptor this is an ordinary method lookup; without it
    /// the name alone must pick a single mapped method on the interface or its supertypes.
    pub fn resolve_call_site(
        &self,
        interface: &str,
        name: &str,
        erased: Option<&str>,
    ) -> Option<String> {
        if let Some(descriptor) = erased {
            return self.resolve_member(interface, name, descriptor, MemberKind::Method);
        }
        let lookup = |class: &str| self.mapping.method_by_name(class, name);
        if let Some(found) = lookup(interface) {
            return Some(found.to_string());
        }
        self.hierarchy
            .ancestors(interface)
            .into_iter()
            .find_map(lookup)
            .map(str::to_string)
    }

    pub fn remap_descriptor(&self, descriptor: &str) -> deobf_core::Result<String> {
        remap_descriptor(descriptor, |name| self.resolve_class(name))
    }

    pub fn remap_signature(&self, signature: &str) -> deobf_core::Result<String> {
        remap_signature(signature, |name| self.resolve_class(name))
    }

    /// New name for a `CONSTANT_Class` value, which may be an array descriptor.
    pub fn remap_class_reference(&self, name: &str) -> deobf_core::Result<Option<String>> {
        remap_class_reference(name, |name| self.resolve_class(name))
    }
}
