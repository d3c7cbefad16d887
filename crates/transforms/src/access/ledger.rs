//! Per-run bookkeeping of which rules changed something.

use super::rule::{AccessRule, RuleOrigin};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleApplicationRecord {
    pub normalized_key: String,
    /// The rule line as written, before renaming.
    pub raw_text: String,
    pub effective: bool,
    #[serde(flatten)]
    pub origin: RuleOrigin,
}

#[derive(Debug, Clone, Default)]
pub struct RuleLedger {
    records: Vec<RuleApplicationRecord>,
    by_key: HashMap<String, usize>,
}

impl RuleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly parsed rule as not yet effective.
    ///
    /// A rule with an already registered key keeps the first record.
    pub fn register(&mut self, rule: &AccessRule, raw_text: &str, origin: RuleOrigin) -> bool {
        let key = rule.normalized_key();
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key.clone(), self.records.len());
        self.records.push(RuleApplicationRecord {
            normalized_key: key,
            raw_text: raw_text.trim().to_string(),
            effective: false,
            origin,
        });
        true
    }

    /// Records one application. Only a changed access makes the rule effective; an
    /// effective rule never reverts.
    pub fn record(&mut self, key: &str, changed: bool) {
        if !changed {
            return;
        }
        if let Some(&index) = self.by_key.get(key) {
            self.records[index].effective = true;
        }
    }

    pub fn records(&self) -> &[RuleApplicationRecord] {
        &self.records
    }

    pub fn broken(&self) -> impl Iterator<Item = &RuleApplicationRecord> {
        self.records.iter().filter(|r| !r.effective)
    }

    pub fn outcome(&self) -> RuleOutcome {
        RuleOutcome {
            records: self.records.clone(),
        }
    }
}

/// Final state of every rule after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub records: Vec<RuleApplicationRecord>,
}

impl RuleOutcome {
    pub fn broken(&self) -> Vec<RuleApplicationRecord> {
        self.records.iter().filter(|r| !r.effective).cloned().collect()
    }

    pub fn broken_count(&self) -> usize {
        self.records.iter().filter(|r| !r.effective).count()
    }

    pub fn is_clean(&self) -> bool {
        self.broken_count() == 0
    }
}
