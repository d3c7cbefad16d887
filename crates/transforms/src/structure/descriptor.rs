//! Structural descriptor JSON.
//!
//! ```json
//! {
//!   "com/example/Widget$Part": {
//!     "enclosingMethod": { "owner": "com/example/Widget", "name": "build", "desc": "()V" },
//!     "innerClasses": [
//!       { "inner_class": "com/example/Widget$Part", "outer_class": "com/example/Widget",
//!         "inner_name": "Part", "access": "9" }
//!     ],
//!     "signature": "Ljava/lang/Object;Ljava/lang/Comparable<Lcom/example/Widget;>;",
//!     "methods": {
//!       "resize (I)V": { "exceptions": ["java/io/IOException"], "parameters": ["size"] }
//!     }
//!   }
//! }
//! ```
//!
//! `access` is a hexadecimal string and is left out entirely when zero.

use crate::access::{AccessRule, compute_merged_access};
use crate::{Error, Result};
use deobf_core::AccessFlags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosingMethodRecord {
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerClassRecord {
    pub inner_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
}

impl InnerClassRecord {
    pub fn access_flags(&self) -> Result<AccessFlags> {
        match self.access.as_deref() {
            None => Ok(AccessFlags::empty()),
            Some(hex) => u16::from_str_radix(hex.trim_start_matches("0x"), 16)
                .map(AccessFlags::from_raw)
                .map_err(|_| Error::InvalidAccessValue(hex.to_string())),
        }
    }

    pub fn set_access_flags(&mut self, access: AccessFlags) {
        self.access = (!access.is_empty()).then(|| format!("{:x}", access.bits()));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStructure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStructure {
    #[serde(
        rename = "enclosingMethod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enclosing_method: Option<EnclosingMethodRecord>,
    #[serde(rename = "innerClasses", default, skip_serializing_if = "Option::is_none")]
    pub inner_classes: Option<Vec<InnerClassRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Keyed by `"name descriptor"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, MethodStructure>,
}

/// Class-name keyed structural records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureDescriptor {
    classes: BTreeMap<String, ClassStructure>,
}

impl StructureDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = crate::read_to_string(path)?;
        let descriptor: Self =
            serde_json::from_str(&text).map_err(|source| Error::Descriptor {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            "Loaded structural descriptor for {} classes from {}",
            descriptor.len(),
            path.display()
        );
        Ok(descriptor)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?).map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, class: &str) -> Option<&ClassStructure> {
        self.classes.get(class)
    }

    pub fn get_mut(&mut self, class: &str) -> Option<&mut ClassStructure> {
        self.classes.get_mut(class)
    }

    pub fn insert(&mut self, class: impl Into<String>, structure: ClassStructure) {
        self.classes.insert(class.into(), structure);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Merges class-level rules for nested classes into the inner-class records.
    ///
    /// A rule for `Outer$Inner` updates the matching record listed under `Outer` and the one
    /// listed under `Outer$Inner` itself. Returns the number of records rewritten.
    pub fn apply_access_rules(&mut self, rules: &[AccessRule]) -> Result<usize> {
        let mut updated = 0;
        for rule in rules.iter().filter(|r| r.is_inner_class_rule()) {
            let Some(outer) = rule.outer_owner() else {
                continue;
            };
            for holder in [outer, rule.owner.as_str()] {
                let Some(records) = self
                    .classes
                    .get_mut(holder)
                    .and_then(|c| c.inner_classes.as_mut())
                else {
                    continue;
                };
                for record in records.iter_mut().filter(|r| r.inner_class == rule.owner) {
                    let merged = compute_merged_access(record.access_flags()?, rule);
                    record.set_access_flags(merged);
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }
}
