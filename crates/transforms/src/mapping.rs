//! SRG symbol mapping table.
//!
//! Supported lines (blank lines and `#` comments are ignored):
//!
//! ```text
//! PK: old/pkg new/pkg
//! CL: a/b/C com/example/Widget
//! FD: a/b/C/x com/example/Widget/widgetValue
//! MD: a/b/C/a (I)La/b/C; com/example/Widget/resize (I)Lcom/example/Widget;
//! ```
//!
//! Every key is in the old symbol space. Field keys carry no descriptor.

use crate::{Error, Result};
use deobf_core::descriptor::is_method_descriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Package name used by SRG for the default package.
pub const DEFAULT_PACKAGE: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Package,
    Class,
    Field,
    Method,
}

/// One mapping line.
///
/// For class and package entries only the owner pair is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub kind: MappingKind,
    pub owner_old: String,
    pub owner_new: String,
    pub member_old: Option<String>,
    pub member_new: Option<String>,
    /// Method descriptor in the old symbol space.
    pub descriptor: Option<String>,
    /// Method descriptor in the new symbol space.
    pub new_descriptor: Option<String>,
}

impl MappingEntry {
    pub fn class(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self::owner_only(MappingKind::Class, old.into(), new.into())
    }

    pub fn package(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self::owner_only(MappingKind::Package, old.into(), new.into())
    }

    fn owner_only(kind: MappingKind, owner_old: String, owner_new: String) -> Self {
        Self {
            kind,
            owner_old,
            owner_new,
            member_old: None,
            member_new: None,
            descriptor: None,
            new_descriptor: None,
        }
    }

    pub fn field(
        owner_old: impl Into<String>,
        owner_new: impl Into<String>,
        name_old: impl Into<String>,
        name_new: impl Into<String>,
    ) -> Self {
        Self {
            kind: MappingKind::Field,
            owner_old: owner_old.into(),
            owner_new: owner_new.into(),
            member_old: Some(name_old.into()),
            member_new: Some(name_new.into()),
            descriptor: None,
            new_descriptor: None,
        }
    }

    pub fn method(
        owner_old: impl Into<String>,
        owner_new: impl Into<String>,
        name_old: impl Into<String>,
        name_new: impl Into<String>,
        descriptor: impl Into<String>,
        new_descriptor: impl Into<String>,
    ) -> Self {
        Self {
            kind: MappingKind::Method,
            owner_old: owner_old.into(),
            owner_new: owner_new.into(),
            member_old: Some(name_old.into()),
            member_new: Some(name_new.into()),
            descriptor: Some(descriptor.into()),
            new_descriptor: Some(new_descriptor.into()),
        }
    }

    /// Uniqueness key: `(kind, owner_old, member_old, descriptor)`.
    fn key(&self) -> String {
        let mut key = format!("{:?} {}", self.kind, self.owner_old);
        if let Some(member) = &self.member_old {
            key.push('/');
            key.push_str(member);
        }
        if let Some(desc) = &self.descriptor {
            key.push(' ');
            key.push_str(desc);
        }
        key
    }

    /// The same entry read from the new space back to the old one.
    pub fn inverted(&self) -> Self {
        Self {
            kind: self.kind,
            owner_old: self.owner_new.clone(),
            owner_new: self.owner_old.clone(),
            member_old: self.member_new.clone(),
            member_new: self.member_old.clone(),
            descriptor: self.new_descriptor.clone(),
            new_descriptor: self.descriptor.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
    keys: HashMap<String, usize>,
    packages: HashMap<String, String>,
    classes: HashMap<String, String>,
    fields: HashMap<(String, String), String>,
    methods: HashMap<(String, String, String), String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an SRG file. A malformed line fails the whole load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = crate::read_to_string(path)?;
        let table = Self::parse(&text, &path.display().to_string())?;
        tracing::debug!(
            "Loaded {} mapping entries ({} classes) from {}",
            table.len(),
            table.classes.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses SRG text. `file` only labels errors.
    pub fn parse(text: &str, file: &str) -> Result<Self> {
        let mut table = Self::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let fail = |reason: &str| Error::MappingParse {
                file: file.to_string(),
                line: number + 1,
                text: raw.to_string(),
                reason: reason.to_string(),
            };
            let entry = parse_line(line).map_err(fail)?;
            table.push(entry)?;
        }
        Ok(table)
    }

    /// Adds one entry, rejecting a second entry with the same old-space key.
    pub fn push(&mut self, entry: MappingEntry) -> Result<()> {
        let key = entry.key();
        if self.keys.contains_key(&key) {
            return Err(Error::DuplicateMapping(key));
        }
        match entry.kind {
            MappingKind::Package => {
                self.packages
                    .insert(entry.owner_old.clone(), entry.owner_new.clone());
            }
            MappingKind::Class => {
                self.classes
                    .insert(entry.owner_old.clone(), entry.owner_new.clone());
            }
            MappingKind::Field => {
                if let (Some(old), Some(new)) = (&entry.member_old, &entry.member_new) {
                    self.fields
                        .insert((entry.owner_old.clone(), old.clone()), new.clone());
                }
            }
            MappingKind::Method => {
                if let (Some(old), Some(new), Some(desc)) =
                    (&entry.member_old, &entry.member_new, &entry.descriptor)
                {
                    self.methods.insert(
                        (entry.owner_old.clone(), old.clone(), desc.clone()),
                        new.clone(),
                    );
                }
            }
        }
        self.keys.insert(key, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// New name of a class, if it is renamed.
    ///
    /// Checks an explicit class entry, then the enclosing class for `Outer$Inner` names,
    /// then the package mapping.
    pub fn resolve_class(&self, old: &str) -> Option<String> {
        if let Some(new) = self.classes.get(old) {
            return Some(new.clone());
        }
        if let Some((outer, inner)) = old.rsplit_once('$')
            && !outer.is_empty()
            && let Some(new_outer) = self.resolve_class(outer)
        {
            return Some(format!("{new_outer}${inner}"));
        }
        if self.packages.is_empty() {
            return None;
        }
        let (package, simple) = old.rsplit_once('/').unwrap_or((DEFAULT_PACKAGE, old));
        let new_package = self.packages.get(package)?;
        let renamed = if new_package == DEFAULT_PACKAGE {
            simple.to_string()
        } else {
            format!("{new_package}/{simple}")
        };
        (renamed != old).then_some(renamed)
    }

    /// New name of a field declared directly on `owner`.
    pub fn field(&self, owner: &str, name: &str) -> Option<&str> {
        self.fields
            .get(&(owner.to_string(), name.to_string()))
            .map(String::as_str)
    }

    /// New name of a method declared directly on `owner`.
    pub fn method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.methods
            .get(&(owner.to_string(), name.to_string(), descriptor.to_string()))
            .map(String::as_str)
    }

    /// New name of the method called `name` on `owner`, whatever its descriptor.
    ///
    /// `None` when overloads disagree on the new name.
    pub fn method_by_name(&self, owner: &str, name: &str) -> Option<&str> {
        let mut found = None;
        for ((class, old, _), new) in &self.methods {
            if class != owner || old != name {
                continue;
            }
            match found {
                Some(previous) if previous != new.as_str() => return None,
                _ => found = Some(new.as_str()),
            }
        }
        found
    }

    /// The reverse table. Fails when two old symbols map to the same new symbol.
    pub fn inverse(&self) -> Result<Self> {
        let mut inverse = Self::new();
        for entry in &self.entries {
            inverse.push(entry.inverted())?;
        }
        Ok(inverse)
    }
}

fn parse_line(line: &str) -> std::result::Result<MappingEntry, &'static str> {
    let (tag, rest) = line.split_once(':').ok_or("missing record tag")?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    match (tag.trim(), parts.as_slice()) {
        ("PK", [old, new]) => Ok(MappingEntry::package(*old, *new)),
        ("CL", [old, new]) => Ok(MappingEntry::class(*old, *new)),
        ("FD", [old, new]) => {
            let (owner_old, name_old) = split_member(old)?;
            let (owner_new, name_new) = split_member(new)?;
            Ok(MappingEntry::field(owner_old, owner_new, name_old, name_new))
        }
        ("MD", [old, desc, new, new_desc]) => {
            let (owner_old, name_old) = split_member(old)?;
            let (owner_new, name_new) = split_member(new)?;
            if !is_method_descriptor(desc) || !is_method_descriptor(new_desc) {
                return Err("malformed method descriptor");
            }
            Ok(MappingEntry::method(
                owner_old, owner_new, name_old, name_new, *desc, *new_desc,
            ))
        }
        ("PK" | "CL" | "FD" | "MD", _) => Err("wrong number of fields"),
        _ => Err("unknown record tag"),
    }
}

fn split_member(symbol: &str) -> std::result::Result<(&str, &str), &'static str> {
    match symbol.rsplit_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err("member symbol must be owner/name"),
    }
}
