//! Visibility and final-flag merge.
//!
//! | current   | adopts target when       |
//! |-----------|--------------------------|
//! | private   | always                   |
//! | package   | target is not private    |
//! | protected | target is public         |
//! | public    | never                    |
//!
//! The final override is applied after the visibility merge and is independent of it.

use super::rule::{AccessRule, FinalOverride, Visibility};
use deobf_core::AccessFlags;

/// Access flags after applying `rule` to `current`. Non-visibility bits other than `FINAL`
/// are carried through unchanged.
pub fn compute_merged_access(current: AccessFlags, rule: &AccessRule) -> AccessFlags {
    merge_access(current, rule.visibility, rule.final_override)
}

pub fn merge_access(
    current: AccessFlags,
    target: Visibility,
    final_override: FinalOverride,
) -> AccessFlags {
    let visibility = merged_visibility(current.visibility(), target.flags());
    let merged = current.with_visibility(visibility);
    match final_override {
        FinalOverride::SetFinal => merged | AccessFlags::FINAL,
        FinalOverride::ClearFinal => merged - AccessFlags::FINAL,
        FinalOverride::None => merged,
    }
}

fn merged_visibility(current: AccessFlags, target: AccessFlags) -> AccessFlags {
    if current == AccessFlags::PRIVATE {
        target
    } else if current.is_empty() {
        if target == AccessFlags::PRIVATE {
            AccessFlags::empty()
        } else {
            target
        }
    } else if current == AccessFlags::PROTECTED {
        if target == AccessFlags::PUBLIC {
            AccessFlags::PUBLIC
        } else {
            AccessFlags::PROTECTED
        }
    } else if current == AccessFlags::PUBLIC {
        AccessFlags::PUBLIC
    } else {
        // more than one visibility bit: not a valid combination, drop them all
        AccessFlags::empty()
    }
}
