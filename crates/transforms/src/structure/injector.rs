use super::descriptor::{ClassStructure, StructureDescriptor};
use crate::{Result, StageStats};
use deobf_core::archive::{ArchiveReader, ArchiveWriter};
use deobf_core::attributes::{self, InnerClassEntry, MethodParameter};
use deobf_core::descriptor::parameter_sizes;
use deobf_core::{AccessFlags, Attribute, ClassFile, ConstantPool, MemberKind};
use std::path::Path;
use tracing::{debug, warn};

/// Target version whose toolchain predates generated parameter names.
pub const LEGACY_TARGET_VERSION: &str = "1.7.2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectOptions {
    /// Name unnamed parameters of `func_<id>_<suffix>` methods as `p_<id>_<slot>_`.
    pub generate_params: bool,
}

impl InjectOptions {
    /// Options for a target version; only [`LEGACY_TARGET_VERSION`] disables parameters.
    pub fn for_target(version: Option<&str>) -> Self {
        Self {
            generate_params: version != Some(LEGACY_TARGET_VERSION),
        }
    }
}

impl Default for InjectOptions {
    fn default() -> Self {
        Self {
            generate_params: true,
        }
    }
}

/// Writes structural metadata into every class of an archive.
pub trait StructureInjector {
    fn name(&self) -> &'static str;

    /// Reads `input`, writes `output`. Any error leaves no output archive behind.
    fn inject(
        &self,
        input: &Path,
        output: &Path,
        descriptor: &StructureDescriptor,
        options: InjectOptions,
    ) -> Result<StageStats>;
}

/// Injector that rewrites the class attributes directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeInjector;

impl AttributeInjector {
    /// Applies the class's descriptor entry (if any) and generated parameter names.
    pub fn inject_class(
        &self,
        class: &mut ClassFile,
        structure: Option<&ClassStructure>,
        options: InjectOptions,
    ) -> Result<bool> {
        let mut changed = false;
        if let Some(structure) = structure {
            changed |= apply_structure(class, structure)?;
        }
        if options.generate_params {
            changed |= generate_parameter_names(class)?;
        }
        Ok(changed)
    }
}

impl StructureInjector for AttributeInjector {
    fn name(&self) -> &'static str {
        "inject"
    }

    fn inject(
        &self,
        input: &Path,
        output: &Path,
        descriptor: &StructureDescriptor,
        options: InjectOptions,
    ) -> Result<StageStats> {
        let mut reader = ArchiveReader::open(input)?;
        let mut writer = ArchiveWriter::create(output)?;
        let mut stats = StageStats::new(self.name());

        for index in 0..reader.len() {
            let entry = reader.read_entry(index)?;
            stats.entries_read += 1;
            if !entry.is_class() {
                writer.write_entry(&entry)?;
                stats.entries_copied += 1;
                continue;
            }
            let mut class = deobf_core::decode_class(&entry.data)?;
            let structure = descriptor.get(class.name()?);
            if self.inject_class(&mut class, structure, options)? {
                debug!("injected structure into {}", entry.name);
                stats.classes_rewritten += 1;
            }
            writer.write_entry(&entry.with_data(deobf_core::encode_class(&class)?))?;
        }

        writer.finish()?;
        Ok(stats)
    }
}

/// Replaces (or adds) an attribute when its body differs.
fn put(
    pool: &mut ConstantPool,
    list: &mut Vec<Attribute>,
    name: &str,
    info: Vec<u8>,
) -> Result<bool> {
    if let Some(position) = attributes::find(pool, list, name)
        && list[position].info == info
    {
        return Ok(false);
    }
    attributes::upsert(pool, list, name, info)?;
    Ok(true)
}

fn apply_structure(class: &mut ClassFile, structure: &ClassStructure) -> Result<bool> {
    let mut changed = false;
    let ClassFile {
        pool,
        attributes: class_attributes,
        ..
    } = class;

    if let Some(records) = &structure.inner_classes {
        if records.is_empty() {
            changed |= attributes::remove(pool, class_attributes, attributes::INNER_CLASSES);
        } else {
            let mut entries = Vec::with_capacity(records.len());
            for record in records {
                entries.push(InnerClassEntry {
                    inner_class_info_index: pool.class_index(&record.inner_class)?,
                    outer_class_info_index: match &record.outer_class {
                        Some(outer) => pool.class_index(outer)?,
                        None => 0,
                    },
                    inner_name_index: match &record.inner_name {
                        Some(name) => pool.utf8_index(name)?,
                        None => 0,
                    },
                    access: record.access_flags()?,
                });
            }
            let info = attributes::encode_inner_classes(&entries)?;
            changed |= put(pool, class_attributes, attributes::INNER_CLASSES, info)?;
        }
    }

    if let Some(enclosing) = &structure.enclosing_method {
        let class_index = pool.class_index(&enclosing.owner)?;
        let method_index = match (&enclosing.name, &enclosing.desc) {
            (Some(name), Some(desc)) => pool.name_and_type_index(name, desc)?,
            _ => 0,
        };
        let info = attributes::encode_enclosing_method(attributes::EnclosingMethodEntry {
            class_index,
            method_index,
        });
        changed |= put(pool, class_attributes, attributes::ENCLOSING_METHOD, info)?;
    }

    if let Some(signature) = &structure.signature {
        let info = attributes::encode_u2_index(pool.utf8_index(signature)?);
        changed |= put(pool, class_attributes, attributes::SIGNATURE, info)?;
    }

    for (key, method) in &structure.methods {
        let Some((name, desc)) = key.split_once(' ') else {
            warn!("ignoring malformed method key '{}'", key);
            continue;
        };
        let Some(position) = class.find_member(MemberKind::Method, name, desc) else {
            debug!("no method {} {} to inject into", name, desc);
            continue;
        };
        let ClassFile { pool, methods, .. } = class;
        let list = &mut methods[position].attributes;

        if let Some(exceptions) = &method.exceptions {
            let indices = exceptions
                .iter()
                .map(|e| pool.class_index(e))
                .collect::<deobf_core::Result<Vec<_>>>()?;
            let info = attributes::encode_exceptions(&indices)?;
            changed |= put(pool, list, attributes::EXCEPTIONS, info)?;
        }
        if let Some(signature) = &method.signature {
            let info = attributes::encode_u2_index(pool.utf8_index(signature)?);
            changed |= put(pool, list, attributes::SIGNATURE, info)?;
        }
        if let Some(names) = &method.parameters {
            let expected = parameter_sizes(desc)?.len();
            if names.len() != expected {
                warn!(
                    "skipping {} parameter names for {} {} which takes {}",
                    names.len(),
                    name,
                    desc,
                    expected
                );
                continue;
            }
            let params = names
                .iter()
                .map(|n| {
                    Ok(MethodParameter {
                        name_index: pool.utf8_index(n)?,
                        access: AccessFlags::empty(),
                    })
                })
                .collect::<deobf_core::Result<Vec<_>>>()?;
            let info = attributes::encode_method_parameters(&params)?;
            changed |= put(pool, list, attributes::METHOD_PARAMETERS, info)?;
        }
    }
    Ok(changed)
}

/// `<id>` of an SRG method name `func_<id>_<suffix>`.
fn srg_method_id(name: &str) -> Option<&str> {
    let (id, suffix) = name.strip_prefix("func_")?.split_once('_')?;
    (!id.is_empty() && !suffix.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

/// Names the parameters of SRG methods that carry no `MethodParameters` yet.
fn generate_parameter_names(class: &mut ClassFile) -> Result<bool> {
    let mut changed = false;
    for position in 0..class.methods.len() {
        let method = &class.methods[position];
        let name = class.member_name(method)?;
        let Some(id) = srg_method_id(name) else {
            continue;
        };
        if attributes::find(&class.pool, &method.attributes, attributes::METHOD_PARAMETERS)
            .is_some()
        {
            continue;
        }
        let sizes = parameter_sizes(class.member_descriptor(method)?)?;
        if sizes.is_empty() {
            continue;
        }
        let mut slot: u16 = if method.access.contains(AccessFlags::STATIC) { 0 } else { 1 };
        let mut names = Vec::with_capacity(sizes.len());
        for size in sizes {
            names.push(format!("p_{id}_{slot}_"));
            slot += size;
        }

        let ClassFile { pool, methods, .. } = &mut *class;
        let params = names
            .iter()
            .map(|n| {
                Ok(MethodParameter {
                    name_index: pool.utf8_index(n)?,
                    access: AccessFlags::empty(),
                })
            })
            .collect::<deobf_core::Result<Vec<_>>>()?;
        let info = attributes::encode_method_parameters(&params)?;
        let list = &mut methods[position].attributes;
        attributes::upsert(pool, list, attributes::METHOD_PARAMETERS, info)?;
        changed = true;
    }
    Ok(changed)
}
