pub mod access;
pub mod cache;
pub mod hierarchy;
pub mod mapping;
pub mod pass;
pub mod pipeline;
pub mod remap;
pub mod report;
pub mod resolver;
pub mod structure;
pub mod synthetic;
pub mod unit;

use access::RuleApplicationRecord;
use std::path::PathBuf;
use thiserror::Error;

pub use pipeline::{PipelineConfig, run};
pub use report::{PipelineReport, StageStats};
pub use unit::{ClassUnit, OriginalSymbols};

/// Transform error type encompassing all transform module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Class model or archive operation failed.
    #[error(transparent)]
    Core(#[from] deobf_core::Error),

    /// A mapping source line could not be parsed.
    #[error("{file}:{line}: invalid mapping line '{text}': {reason}")]
    MappingParse {
        file: String,
        line: usize,
        text: String,
        reason: String,
    },

    /// Two mapping lines share the same old-space key.
    #[error("duplicate mapping for {0}")]
    DuplicateMapping(String),

    /// An access transformer line could not be parsed.
    #[error("{file}:{line}: invalid access transformer '{text}': {reason}")]
    RuleParse {
        file: String,
        line: usize,
        text: String,
        reason: String,
    },

    /// A rename CSV row has fewer than two columns.
    #[error("{file}:{line}: invalid rename row '{text}'")]
    RenameParse {
        file: String,
        line: usize,
        text: String,
    },

    /// The structural descriptor is not valid JSON for the expected schema.
    #[error("invalid structural descriptor '{path}': {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An inner-class access value in the structural descriptor is not hexadecimal.
    #[error("invalid inner class access value '{0}'")]
    InvalidAccessValue(String),

    /// Access transformer rules that never changed anything, with fail-on-broken enabled.
    #[error("{} broken access transformer rules", .0.len())]
    BrokenRules(Vec<RuleApplicationRecord>),

    /// The structure injection step failed.
    #[error("structure injection '{injector}' failed: {reason}")]
    Injection {
        injector: &'static str,
        reason: String,
    },

    /// The pipeline configuration is incomplete or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Report or descriptor serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write a file at the specified path.
    #[error("could not access file '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transform result type
pub type Result<T> = std::result::Result<T, Error>;

/// A per-class rewrite step.
pub trait Transform {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the transform to one class, returning whether changes were made.
    fn apply(&mut self, unit: &mut ClassUnit) -> Result<bool>;
}

pub(crate) fn read_to_string(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::File {
        path: path.to_path_buf(),
        source,
    })
}
