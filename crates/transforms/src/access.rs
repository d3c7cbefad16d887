//! Access transformer engine.
//!
//! Rules are parsed from AT files, passed through an optional rename table, matched against
//! each class as it is rewritten and merged into its access flags. Every rule gets a
//! [`RuleApplicationRecord`] which ends the run either effective or broken.

pub mod engine;
pub mod ledger;
pub mod merge;
pub mod rename;
pub mod rule;

pub use engine::{AccessRuleSet, AccessTransformer};
pub use ledger::{RuleApplicationRecord, RuleLedger, RuleOutcome};
pub use merge::compute_merged_access;
pub use rename::RenameTable;
pub use rule::{AccessRule, FinalOverride, RuleOrigin, RuleTarget, Visibility, parse_rule};
