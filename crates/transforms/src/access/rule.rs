//! Access transformer line grammar.
//!
//! ```text
//! <visibility>[+f|-f] <owner>[ <member>[<descriptor>]]   # comment
//! ```
//!
//! `public`, `private` and `protected` are recognised by prefix; any other visibility token
//! means package-private. `.` separators are normalised to `/`. A member of `*` targets every
//! field of the owner and `*()` every method.

use deobf_core::AccessFlags;
use deobf_core::descriptor::is_method_descriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Package,
}

impl Visibility {
    /// Reads a visibility token. Unrecognised tokens mean package-private.
    pub fn from_token(token: &str) -> Self {
        if token.starts_with("public") {
            Self::Public
        } else if token.starts_with("private") {
            Self::Private
        } else if token.starts_with("protected") {
            Self::Protected
        } else {
            Self::Package
        }
    }

    pub fn flags(self) -> AccessFlags {
        match self {
            Self::Public => AccessFlags::PUBLIC,
            Self::Private => AccessFlags::PRIVATE,
            Self::Protected => AccessFlags::PROTECTED,
            Self::Package => AccessFlags::empty(),
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Package => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalOverride {
    SetFinal,
    ClearFinal,
    #[default]
    None,
}

impl FinalOverride {
    pub fn from_token(token: &str) -> Self {
        if token.ends_with("+f") {
            Self::SetFinal
        } else if token.ends_with("-f") {
            Self::ClearFinal
        } else {
            Self::None
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::SetFinal => "+f",
            Self::ClearFinal => "-f",
            Self::None => "",
        }
    }
}

/// Where a rule was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOrigin {
    pub file: String,
    pub line: usize,
}

impl RuleOrigin {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// What a rule applies to, derived from its member and descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget<'a> {
    Class,
    Field(&'a str),
    Method { name: &'a str, descriptor: &'a str },
    AllFields,
    AllMethods,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub visibility: Visibility,
    pub final_override: FinalOverride,
    pub owner: String,
    pub member: Option<String>,
    pub descriptor: Option<String>,
}

impl AccessRule {
    pub fn target(&self) -> RuleTarget<'_> {
        match (self.member.as_deref(), self.descriptor.as_deref()) {
            (None, _) => RuleTarget::Class,
            (Some("*"), None) => RuleTarget::AllFields,
            (Some("*"), Some("()")) => RuleTarget::AllMethods,
            (Some(name), None) => RuleTarget::Field(name),
            (Some(name), Some(descriptor)) => RuleTarget::Method { name, descriptor },
        }
    }

    /// Key identifying the rule's target: `owner` or `owner member[descriptor]`.
    pub fn normalized_key(&self) -> String {
        let mut key = self.owner.clone();
        if let Some(member) = &self.member {
            key.push(' ');
            key.push_str(member);
            if let Some(descriptor) = &self.descriptor {
                key.push_str(descriptor);
            }
        }
        key
    }

    /// Owner names an inner class (`Outer$Inner`) and no member is given.
    pub fn is_inner_class_rule(&self) -> bool {
        self.member.is_none() && self.owner.find('$').is_some_and(|i| i > 0)
    }

    /// Class enclosing the owner, for inner-class rules.
    pub fn outer_owner(&self) -> Option<&str> {
        self.owner
            .find('$')
            .filter(|&i| i > 0)
            .map(|i| &self.owner[..i])
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}",
            self.visibility.keyword(),
            self.final_override.suffix(),
            self.owner
        )?;
        if let Some(member) = &self.member {
            write!(f, " {member}{}", self.descriptor.as_deref().unwrap_or_default())?;
        }
        Ok(())
    }
}

/// Strips a trailing `#` comment and surrounding whitespace.
pub fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

/// Parses one AT line. Blank and comment-only lines yield `Ok(None)`.
pub fn parse_rule(line: &str) -> Result<Option<AccessRule>, String> {
    let line = strip_comment(line);
    if line.is_empty() {
        return Ok(None);
    }
    let line = line.replace('.', "/");
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (modifier, owner, member) = match tokens.as_slice() {
        [modifier, owner] => (*modifier, *owner, None),
        [modifier, owner, member] => (*modifier, *owner, Some(*member)),
        [_] => return Err("missing owner".to_string()),
        _ => return Err(format!("expected 2 or 3 fields, found {}", tokens.len())),
    };

    let (member, descriptor) = match member {
        Some(member) => match member.find('(') {
            Some(split) => {
                let (name, descriptor) = member.split_at(split);
                if name.is_empty() {
                    return Err("missing member name".to_string());
                }
                if descriptor != "()" && !is_method_descriptor(descriptor) {
                    return Err(format!("malformed method descriptor '{descriptor}'"));
                }
                (Some(name.to_string()), Some(descriptor.to_string()))
            }
            None => (Some(member.to_string()), None),
        },
        None => (None, None),
    };

    Ok(Some(AccessRule {
        visibility: Visibility::from_token(modifier),
        final_override: FinalOverride::from_token(modifier),
        owner: owner.to_string(),
        member,
        descriptor,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_field_and_method_rules() {
        let rule = parse_rule("public a.b.C # widen").unwrap().unwrap();
        assert_eq!(rule.visibility, Visibility::Public);
        assert_eq!(rule.owner, "a/b/C");
        assert_eq!(rule.target(), RuleTarget::Class);

        let rule = parse_rule("protected-f a/b/C x").unwrap().unwrap();
        assert_eq!(rule.final_override, FinalOverride::ClearFinal);
        assert_eq!(rule.target(), RuleTarget::Field("x"));

        let rule = parse_rule("private+f a/b/C m(La/b/D;)V").unwrap().unwrap();
        assert_eq!(rule.visibility, Visibility::Private);
        assert_eq!(rule.final_override, FinalOverride::SetFinal);
        assert_eq!(
            rule.target(),
            RuleTarget::Method {
                name: "m",
                descriptor: "(La/b/D;)V"
            }
        );
        assert_eq!(rule.normalized_key(), "a/b/C m(La/b/D;)V");
        assert_eq!(rule.to_string(), "private+f a/b/C m(La/b/D;)V");
    }

    #[test]
    fn unknown_visibility_means_package() {
        let rule = parse_rule("default-f a/b/C").unwrap().unwrap();
        assert_eq!(rule.visibility, Visibility::Package);
        assert_eq!(rule.final_override, FinalOverride::ClearFinal);
    }

    #[test]
    fn wildcards_and_inner_classes() {
        let fields = parse_rule("public a/b/C *").unwrap().unwrap();
        assert_eq!(fields.target(), RuleTarget::AllFields);
        let methods = parse_rule("public a/b/C *()").unwrap().unwrap();
        assert_eq!(methods.target(), RuleTarget::AllMethods);

        let inner = parse_rule("public a/b/C$D").unwrap().unwrap();
        assert!(inner.is_inner_class_rule());
        assert_eq!(inner.outer_owner(), Some("a/b/C"));
        assert!(!methods.is_inner_class_rule());
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert_eq!(parse_rule("   # only a comment").unwrap(), None);
        assert_eq!(parse_rule("").unwrap(), None);
        assert!(parse_rule("public").is_err());
        assert!(parse_rule("public a b c d").is_err());
        assert!(parse_rule("public a/b/C m(I").is_err());
        assert!(parse_rule("public a/b/C (I)V").is_err());
    }
}
