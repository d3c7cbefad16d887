//! Class file symbol remapping.
//!
//! Every rename is planned against the untouched constant pool first (so owner names are
//! still the old ones when members are resolved) and only then applied. Edits go through
//! the append-only pool API, which keeps indices used by method bytecode valid.

use crate::resolver::RenameResolver;
use crate::{ClassUnit, Result, Transform};
use deobf_core::attributes::{self, EnclosingMethodEntry};
use deobf_core::constant_pool::RefKind;
use deobf_core::{Attribute, ClassFile, Constant, ConstantPool, MemberKind};

/// Renames classes, members and every descriptor or signature that mentions them.
pub struct Remapper<'a> {
    resolver: RenameResolver<'a>,
}

impl<'a> Remapper<'a> {
    pub fn new(resolver: RenameResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Rewrites one class in place and reports whether anything changed.
    pub fn remap_class(&self, class: &mut ClassFile) -> Result<bool> {
        let plan = self.plan(class)?;
        let mut changed = plan.apply(class)?;
        changed |= self.remap_signatures(class)?;
        Ok(changed)
    }

    fn plan(&self, class: &ClassFile) -> Result<RemapPlan> {
        let pool = &class.pool;
        let this_old = class.name()?.to_string();
        let mut plan = RemapPlan::default();
        let bootstrap =
            match attributes::find(pool, &class.attributes, attributes::BOOTSTRAP_METHODS) {
                Some(position) => {
                    attributes::parse_bootstrap_methods(&class.attributes[position].info)?
                }
                None => Vec::new(),
            };

        for (index, entry) in pool.entries().iter().enumerate() {
            let index = index as u16;
            match entry {
                Constant::Class { .. } => {
                    let name = pool.class_name(index)?;
                    if let Some(new) = self.resolver.remap_class_reference(name)? {
                        plan.classes.push((index, new));
                    }
                }
                Constant::Fieldref { .. }
                | Constant::Methodref { .. }
                | Constant::InterfaceMethodref { .. } => {
                    let member = pool.member_ref(index)?;
                    let kind = match member.kind {
                        RefKind::Field => MemberKind::Field,
                        RefKind::Method | RefKind::InterfaceMethod => MemberKind::Method,
                    };
                    let name = self
                        .resolver
                        .resolve_member(member.owner, member.name, member.descriptor, kind)
                        .unwrap_or_else(|| member.name.to_string());
                    let descriptor = self.resolver.remap_descriptor(member.descriptor)?;
                    if name != member.name || descriptor != member.descriptor {
                        plan.member_refs.push((index, name, descriptor));
                    }
                }
                Constant::Dynamic {
                    name_and_type_index,
                    ..
                } => {
                    let (name, descriptor) = pool.name_and_type(*name_and_type_index)?;
                    let remapped = self.resolver.remap_descriptor(descriptor)?;
                    if remapped != descriptor {
                        plan.member_refs.push((index, name.to_string(), remapped));
                    }
                }
                Constant::InvokeDynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    let (name, descriptor) = pool.name_and_type(*name_and_type_index)?;
                    let new_name = produced_interface(descriptor)
                        .and_then(|interface| {
                            let erased =
                                erased_descriptor(pool, &bootstrap, *bootstrap_method_attr_index);
                            self.resolver.resolve_call_site(interface, name, erased)
                        })
                        .unwrap_or_else(|| name.to_string());
                    let remapped = self.resolver.remap_descriptor(descriptor)?;
                    if new_name != name || remapped != descriptor {
                        plan.member_refs.push((index, new_name, remapped));
                    }
                }
                Constant::MethodType { descriptor_index } => {
                    let descriptor = pool.utf8(*descriptor_index)?;
                    let remapped = self.resolver.remap_descriptor(descriptor)?;
                    if remapped != descriptor {
                        plan.method_types.push((index, remapped));
                    }
                }
                _ => {}
            }
        }

        for kind in [MemberKind::Field, MemberKind::Method] {
            for (position, member) in class.members_of(kind).iter().enumerate() {
                let name = class.member_name(member)?;
                let descriptor = class.member_descriptor(member)?;
                let new_name = self
                    .resolver
                    .resolve_member(&this_old, name, descriptor, kind)
                    .unwrap_or_else(|| name.to_string());
                let new_descriptor = self.resolver.remap_descriptor(descriptor)?;
                if new_name != name || new_descriptor != descriptor {
                    plan.members.push((kind, position, new_name, new_descriptor));
                }
            }
        }

        if let Some(position) = attributes::find(pool, &class.attributes, attributes::INNER_CLASSES)
        {
            let entries = attributes::parse_inner_classes(&class.attributes[position].info)?;
            for (slot, entry) in entries.iter().enumerate() {
                if entry.inner_name_index == 0 {
                    continue;
                }
                let old_name = pool.class_name(entry.inner_class_info_index)?;
                let Some(new_name) = self.resolver.remap_class_reference(old_name)? else {
                    continue;
                };
                let old_simple = pool.utf8(entry.inner_name_index)?;
                let new_simple = simple_name(&new_name);
                if !new_simple.is_empty() && new_simple != old_simple {
                    plan.inner_names.push((slot, new_simple.to_string()));
                }
            }
        }

        if let Some(position) =
            attributes::find(pool, &class.attributes, attributes::ENCLOSING_METHOD)
        {
            let entry = attributes::parse_enclosing_method(&class.attributes[position].info)?;
            if entry.method_index != 0 {
                let owner = pool.class_name(entry.class_index)?;
                let (name, descriptor) = pool.name_and_type(entry.method_index)?;
                let new_name = self
                    .resolver
                    .resolve_member(owner, name, descriptor, MemberKind::Method)
                    .unwrap_or_else(|| name.to_string());
                let new_descriptor = self.resolver.remap_descriptor(descriptor)?;
                if new_name != name || new_descriptor != descriptor {
                    plan.enclosing_method = Some((entry, new_name, new_descriptor));
                }
            }
        }

        Ok(plan)
    }

    /// Rewrites `Signature` attributes and local variable tables.
    ///
    /// These reference `Utf8` entries directly, which are never edited in place, so the
    /// old values are still readable after the pool edits.
    fn remap_signatures(&self, class: &mut ClassFile) -> Result<bool> {
        let ClassFile {
            pool,
            attributes: class_attributes,
            fields,
            methods,
            ..
        } = class;
        let mut changed = self.remap_signature_attribute(pool, class_attributes)?;
        for member in fields.iter_mut() {
            changed |= self.remap_signature_attribute(pool, &mut member.attributes)?;
        }
        for member in methods.iter_mut() {
            changed |= self.remap_signature_attribute(pool, &mut member.attributes)?;
            changed |= self.remap_local_variables(pool, &mut member.attributes)?;
        }
        Ok(changed)
    }

    fn remap_signature_attribute(
        &self,
        pool: &mut ConstantPool,
        list: &mut [Attribute],
    ) -> Result<bool> {
        let Some(position) = attributes::find(pool, list, attributes::SIGNATURE) else {
            return Ok(false);
        };
        let index = attributes::parse_u2_index(&list[position].info, attributes::SIGNATURE)?;
        let signature = pool.utf8(index)?;
        let remapped = self.resolver.remap_signature(signature)?;
        if remapped == signature {
            return Ok(false);
        }
        let new_index = pool.utf8_index(&remapped)?;
        list[position].info = attributes::encode_u2_index(new_index);
        Ok(true)
    }

    fn remap_local_variables(
        &self,
        pool: &mut ConstantPool,
        list: &mut [Attribute],
    ) -> Result<bool> {
        let Some(position) = attributes::find(pool, list, attributes::CODE) else {
            return Ok(false);
        };
        let mut code = attributes::parse_code(&list[position].info)?;
        let mut changed = false;
        for nested in code.attributes.iter_mut() {
            let generic = match pool.utf8(nested.name_index)? {
                attributes::LOCAL_VARIABLE_TABLE => false,
                attributes::LOCAL_VARIABLE_TYPE_TABLE => true,
                _ => continue,
            };
            let mut vars = attributes::parse_local_variables(&nested.info)?;
            let mut table_changed = false;
            for var in vars.iter_mut() {
                let old = pool.utf8(var.descriptor_index)?;
                let new = if generic {
                    self.resolver.remap_signature(old)?
                } else {
                    self.resolver.remap_descriptor(old)?
                };
                if new != old {
                    var.descriptor_index = pool.utf8_index(&new)?;
                    table_changed = true;
                }
            }
            if table_changed {
                nested.info = attributes::encode_local_variables(&vars)?;
                changed = true;
            }
        }
        if changed {
            list[position].info = attributes::encode_code(&code)?;
        }
        Ok(changed)
    }
}

impl Transform for Remapper<'_> {
    fn name(&self) -> &'static str {
        "Remapper"
    }

    fn apply(&mut self, unit: &mut ClassUnit) -> Result<bool> {
        self.remap_class(&mut unit.class)
    }
}

/// Simple name of a nested class: the text after the last `$`, minus the ordinal prefix
/// that local classes carry.
fn simple_name(internal: &str) -> &str {
    let tail = internal
        .rsplit_once('$')
        .map(|(_, tail)| tail)
        .unwrap_or_else(|| internal.rsplit_once('/').map_or(internal, |(_, tail)| tail));
    tail.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Object type returned by an `invokedynamic` descriptor, i.e. the functional interface a
/// lambda call site produces.
fn produced_interface(descriptor: &str) -> Option<&str> {
    let (_, returned) = descriptor.rsplit_once(')')?;
    returned.strip_prefix('L')?.strip_suffix(';')
}

/// Erased functional method type: the first static argument of the call site's bootstrap
/// method, when it is a `MethodType`.
fn erased_descriptor<'p>(
    pool: &'p ConstantPool,
    bootstrap: &[attributes::BootstrapMethod],
    slot: u16,
) -> Option<&'p str> {
    let argument = *bootstrap.get(slot as usize)?.arguments.first()?;
    match pool.get(argument).ok()? {
        Constant::MethodType { descriptor_index } => pool.utf8(*descriptor_index).ok(),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct RemapPlan {
    classes: Vec<(u16, String)>,
    member_refs: Vec<(u16, String, String)>,
    method_types: Vec<(u16, String)>,
    members: Vec<(MemberKind, usize, String, String)>,
    /// `(record position, new simple name)` inside `InnerClasses`.
    inner_names: Vec<(usize, String)>,
    enclosing_method: Option<(EnclosingMethodEntry, String, String)>,
}

impl RemapPlan {
    fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.member_refs.is_empty()
            && self.method_types.is_empty()
            && self.members.is_empty()
            && self.inner_names.is_empty()
            && self.enclosing_method.is_none()
    }

    fn apply(self, class: &mut ClassFile) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }
        for (index, name) in &self.classes {
            class.pool.rename_class(*index, name)?;
        }
        for (index, name, descriptor) in &self.member_refs {
            class.pool.rename_member_ref(*index, name, descriptor)?;
        }
        for (index, descriptor) in &self.method_types {
            class.pool.retype_method_type(*index, descriptor)?;
        }
        for (kind, position, name, descriptor) in &self.members {
            class.set_member_symbol(*kind, *position, name, descriptor)?;
        }

        if !self.inner_names.is_empty()
            && let Some(position) =
                attributes::find(&class.pool, &class.attributes, attributes::INNER_CLASSES)
        {
            let mut entries = attributes::parse_inner_classes(&class.attributes[position].info)?;
            for (slot, name) in &self.inner_names {
                if let Some(entry) = entries.get_mut(*slot) {
                    entry.inner_name_index = class.pool.utf8_index(name)?;
                }
            }
            class.attributes[position].info = attributes::encode_inner_classes(&entries)?;
        }

        if let Some((mut entry, name, descriptor)) = self.enclosing_method
            && let Some(position) =
                attributes::find(&class.pool, &class.attributes, attributes::ENCLOSING_METHOD)
        {
            entry.method_index = class.pool.name_and_type_index(&name, &descriptor)?;
            class.attributes[position].info = attributes::encode_enclosing_method(entry);
        }
        Ok(true)
    }
}
