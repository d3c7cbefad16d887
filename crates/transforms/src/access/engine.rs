use super::ledger::{RuleLedger, RuleOutcome};
use super::merge::compute_merged_access;
use super::rename::RenameTable;
use super::rule::{AccessRule, RuleOrigin, RuleTarget, parse_rule};
use crate::{ClassUnit, Error, Result, Transform};
use deobf_core::MemberKind;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loading, applying and reporting access transformer rules.
pub trait AccessRuleSet {
    /// Parses one line and registers the rule it holds. Returns false for blank or
    /// comment-only lines.
    fn load_rule(&mut self, line: &str, origin: RuleOrigin) -> Result<bool>;

    /// Loads every rule of an AT file, returning how many were added. A file already
    /// loaded under the same canonical path is skipped.
    fn load_source(&mut self, path: &Path) -> Result<usize>;

    /// Applies every rule owned by the class, under its original or new name.
    fn apply_to_class(&mut self, unit: &mut ClassUnit) -> Result<bool>;

    /// Current record of every rule.
    fn outcome(&self) -> RuleOutcome;
}

/// Rule set backed by the widening merge of [`compute_merged_access`].
#[derive(Debug, Default)]
pub struct AccessTransformer {
    renames: RenameTable,
    rules: Vec<AccessRule>,
    by_owner: HashMap<String, Vec<usize>>,
    ledger: RuleLedger,
    sources: HashSet<PathBuf>,
}

impl AccessTransformer {
    /// An engine whose rule member names go through `renames` before matching.
    pub fn new(renames: RenameTable) -> Self {
        Self {
            renames,
            ..Default::default()
        }
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn ledger(&self) -> &RuleLedger {
        &self.ledger
    }
}

impl AccessRuleSet for AccessTransformer {
    fn load_rule(&mut self, line: &str, origin: RuleOrigin) -> Result<bool> {
        let parsed = parse_rule(line).map_err(|reason| Error::RuleParse {
            file: origin.file.clone(),
            line: origin.line,
            text: line.to_string(),
            reason,
        })?;
        let Some(mut rule) = parsed else {
            return Ok(false);
        };
        if self.renames.rename_rule(&mut rule) {
            debug!("renamed access rule '{}' to '{}'", line.trim(), rule);
        }
        self.ledger.register(&rule, line, origin);
        self.by_owner
            .entry(rule.owner.clone())
            .or_default()
            .push(self.rules.len());
        self.rules.push(rule);
        Ok(true)
    }

    fn load_source(&mut self, path: &Path) -> Result<usize> {
        let canonical = path.canonicalize().map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;
        if !self.sources.insert(canonical.clone()) {
            debug!("access transformer {} already loaded", canonical.display());
            return Ok(0);
        }
        let text = crate::read_to_string(&canonical)?;
        let file = canonical.display().to_string();
        let mut added = 0;
        for (number, line) in text.lines().enumerate() {
            if self.load_rule(line, RuleOrigin::new(file.clone(), number + 1))? {
                added += 1;
            }
        }
        info!("Loaded {} access rules from {}", added, file);
        Ok(added)
    }

    fn apply_to_class(&mut self, unit: &mut ClassUnit) -> Result<bool> {
        let current_name = unit.class.name()?.to_string();
        let mut candidates: Vec<usize> = self
            .by_owner
            .get(&unit.original.name)
            .cloned()
            .unwrap_or_default();
        if current_name != unit.original.name
            && let Some(more) = self.by_owner.get(&current_name)
        {
            candidates.extend(more);
        }

        let mut changed = false;
        for index in candidates {
            let rule = &self.rules[index];
            let Some(rule_changed) = apply_rule(rule, unit) else {
                continue;
            };
            if rule_changed {
                debug!("access rule '{}' applied to {}", rule, current_name);
            }
            self.ledger.record(&rule.normalized_key(), rule_changed);
            changed |= rule_changed;
        }
        Ok(changed)
    }

    fn outcome(&self) -> RuleOutcome {
        self.ledger.outcome()
    }
}

impl Transform for AccessTransformer {
    fn name(&self) -> &'static str {
        "AccessTransformer"
    }

    fn apply(&mut self, unit: &mut ClassUnit) -> Result<bool> {
        self.apply_to_class(unit)
    }
}

/// Applies one rule. `None` when the rule matched nothing in this class, otherwise whether
/// any access value changed.
fn apply_rule(rule: &AccessRule, unit: &mut ClassUnit) -> Option<bool> {
    let (kind, positions) = match rule.target() {
        RuleTarget::Class => {
            let merged = compute_merged_access(unit.class.access, rule);
            let changed = merged != unit.class.access;
            unit.class.access = merged;
            return Some(changed);
        }
        RuleTarget::Field(name) => (
            MemberKind::Field,
            matching_members(unit, MemberKind::Field, name, None),
        ),
        RuleTarget::Method { name, descriptor } => (
            MemberKind::Method,
            matching_members(unit, MemberKind::Method, name, Some(descriptor)),
        ),
        RuleTarget::AllFields => (MemberKind::Field, (0..unit.class.fields.len()).collect()),
        RuleTarget::AllMethods => (MemberKind::Method, (0..unit.class.methods.len()).collect()),
    };
    if positions.is_empty() {
        return None;
    }
    let members = unit.class.members_of_mut(kind);
    let mut changed = false;
    for position in positions {
        let member = &mut members[position];
        let merged = compute_merged_access(member.access, rule);
        changed |= merged != member.access;
        member.access = merged;
    }
    Some(changed)
}

/// Positions of members matching by current name, falling back to the original name.
/// A descriptor matches in either symbol space.
fn matching_members(
    unit: &ClassUnit,
    kind: MemberKind,
    name: &str,
    descriptor: Option<&str>,
) -> Vec<usize> {
    let class = &unit.class;
    let current: Vec<(String, String)> = class
        .members_of(kind)
        .iter()
        .map(|m| {
            (
                class.member_name(m).unwrap_or_default().to_string(),
                class.member_descriptor(m).unwrap_or_default().to_string(),
            )
        })
        .collect();
    let descriptor_matches = |position: usize| {
        let Some(wanted) = descriptor else {
            return true;
        };
        current[position].1 == wanted
            || unit
                .original
                .member(kind, position)
                .is_some_and(|(_, original)| original == wanted)
    };

    let by_current: Vec<usize> = (0..current.len())
        .filter(|&p| current[p].0 == name && descriptor_matches(p))
        .collect();
    if !by_current.is_empty() {
        return by_current;
    }
    (0..current.len())
        .filter(|&p| {
            unit.original
                .member(kind, p)
                .is_some_and(|(original, _)| original == name)
                && descriptor_matches(p)
        })
        .collect()
}
