//! Run summary written by `deobf run --emit`.

use crate::access::RuleApplicationRecord;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Entry counts for one archive stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStats {
    pub stage: String,
    pub entries_read: usize,
    /// Class entries whose model changed.
    pub classes_rewritten: usize,
    /// Entries written without being decoded.
    pub entries_copied: usize,
}

impl StageStats {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Archive the run produced (or reused).
    pub output: PathBuf,
    /// True when no custom access transformers were configured.
    pub clean: bool,
    /// True when a previous output was reused without running any stage.
    pub from_cache: bool,
    /// SHA3-256 over every input and the configuration, hex encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub stages: Vec<StageStats>,
    pub rules: Vec<RuleApplicationRecord>,
    pub broken_rules: usize,
    /// Inner-class records in the structural descriptor rewritten by access rules.
    pub inner_class_updates: usize,
}

impl PipelineReport {
    pub fn broken(&self) -> impl Iterator<Item = &RuleApplicationRecord> {
        self.rules.iter().filter(|r| !r.effective)
    }

    pub fn stage(&self, name: &str) -> Option<&StageStats> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Export the report as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Export the report as compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
