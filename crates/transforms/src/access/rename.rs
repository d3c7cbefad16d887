//! Member rename table read from `old,new` CSV files.

use super::rule::AccessRule;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// First-column value of the header row in generated rename CSVs. Rows starting with it
/// are never applied.
pub const HEADER_SENTINEL: &str = "searge";

#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    names: HashMap<String, String>,
}

impl RenameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_csv(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = crate::read_to_string(path)?;
        let added = self.parse_csv(&text, &path.display().to_string())?;
        tracing::debug!("Loaded {} renames from {}", added, path.display());
        Ok(added)
    }

    /// Adds every row of `text`; later rows override earlier ones.
    pub fn parse_csv(&mut self, text: &str, file: &str) -> Result<usize> {
        let mut added = 0;
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut columns = line.split(',');
            let (Some(old), Some(new)) = (columns.next(), columns.next()) else {
                return Err(Error::RenameParse {
                    file: file.to_string(),
                    line: number + 1,
                    text: line.to_string(),
                });
            };
            if old == HEADER_SENTINEL {
                continue;
            }
            self.names.insert(old.to_string(), new.to_string());
            added += 1;
        }
        Ok(added)
    }

    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.names.insert(old.into(), new.into());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.names.get(old).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Substitutes the rule's member name; the descriptor is kept as written.
    pub fn rename_rule(&self, rule: &mut AccessRule) -> bool {
        let Some(member) = &rule.member else {
            return false;
        };
        match self.get(member) {
            Some(new) => {
                rule.member = Some(new.to_string());
                true
            }
            None => false,
        }
    }
}
