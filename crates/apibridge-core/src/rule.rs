//! Message rules.
//!
//! A rule binds a message predicate to a target API. Rules are written as
//! comma-separated strings:
//!
//! ```text
//! KIND,pattern,apiName[,pathOverride[,methodOverride]]
//! ```
//!
//! `KIND` is one of `COMMAND`, `PREFIX`, `KEYWORD`, `REGEX` or `DEFAULT`
//! (case-insensitive). A `DEFAULT` rule has no pattern, so the short form
//! `DEFAULT,apiName` is accepted as well.
//!
//! Every rule runs the same pipeline: empty or whitespace-only messages are
//! rejected, the kind-specific predicate decides and extracts captures, and
//! the target keys (`apiName`, `pathOverride`, `methodOverride`) are added to
//! whatever the predicate produced.
//!
//! # Example
//!
//! ```
//! use apibridge_core::Rule;
//!
//! let rule = Rule::parse("COMMAND,/call,local_test,/hello,POST").unwrap();
//! let params = rule.match_message("/call foo").unwrap();
//! assert_eq!(params.get("content"), Some("foo"));
//! assert!(rule.match_message("/callfoo").is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::{RuleError, RuleResult};
use crate::params::MatchParams;

/// Capture key for the remainder of `COMMAND` and `PREFIX` matches.
pub const CONTENT_KEY: &str = "content";
/// Capture key for the whole message of `DEFAULT` matches.
pub const MESSAGE_KEY: &str = "message";

/// The five rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Exact command, optionally followed by a space and arguments.
    Command,
    /// Plain prefix, no separator required.
    Prefix,
    /// Substring anywhere in the message.
    Keyword,
    /// Start-anchored regular expression.
    Regex,
    /// Catch-all.
    Default,
}

impl RuleKind {
    /// Returns the canonical upper-case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Prefix => "PREFIX",
            Self::Keyword => "KEYWORD",
            Self::Regex => "REGEX",
            Self::Default => "DEFAULT",
        }
    }
}

impl FromStr for RuleKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COMMAND" => Ok(Self::Command),
            "PREFIX" => Ok(Self::Prefix),
            "KEYWORD" => Ok(Self::Keyword),
            "REGEX" => Ok(Self::Regex),
            "DEFAULT" => Ok(Self::Default),
            _ => Err(RuleError::UnknownKind(s.trim().to_string())),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, not yet compiled, rule string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    /// Rule kind.
    pub kind: RuleKind,
    /// Pattern text; empty for `DEFAULT`.
    pub pattern: String,
    /// Target API name; may be empty when a default API is configured.
    pub api_name: String,
    /// Optional request path, may contain `{$n}` placeholders.
    pub path_override: Option<String>,
    /// Optional HTTP method.
    pub method_override: Option<String>,
}

impl FromStr for RuleDefinition {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let kind: RuleKind = parts[0].parse()?;

        let optional = |idx: usize| {
            parts
                .get(idx)
                .filter(|p| !p.trim().is_empty())
                .map(|p| p.trim().to_string())
        };

        // `DEFAULT,apiName` carries no pattern.
        if kind == RuleKind::Default && parts.len() == 2 {
            return Ok(Self {
                kind,
                pattern: String::new(),
                api_name: parts[1].trim().to_string(),
                path_override: None,
                method_override: None,
            });
        }

        if parts.len() < 3 {
            return Err(RuleError::missing_field(s, "apiName"));
        }

        // An empty pattern is kept: KEYWORD and PREFIX then accept every message.
        Ok(Self {
            kind,
            pattern: parts[1].to_string(),
            api_name: parts[2].trim().to_string(),
            path_override: optional(3),
            method_override: optional(4),
        })
    }
}

/// Kind-specific predicate of a compiled rule.
#[derive(Debug, Clone)]
enum Predicate {
    Command(String),
    Prefix(String),
    Keyword(String),
    Regex(Regex),
    Default,
}

impl Predicate {
    fn compile(kind: RuleKind, pattern: &str) -> RuleResult<Self> {
        Ok(match kind {
            RuleKind::Command => Self::Command(pattern.to_string()),
            RuleKind::Prefix => Self::Prefix(pattern.to_string()),
            RuleKind::Keyword => Self::Keyword(pattern.to_string()),
            RuleKind::Regex => {
                // Anchored at the start only; trailing text is tolerated.
                let anchored = format!(r"\A(?:{pattern})");
                let regex = Regex::new(&anchored).map_err(|e| RuleError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
                Self::Regex(regex)
            }
            RuleKind::Default => Self::Default,
        })
    }

    fn kind(&self) -> RuleKind {
        match self {
            Self::Command(_) => RuleKind::Command,
            Self::Prefix(_) => RuleKind::Prefix,
            Self::Keyword(_) => RuleKind::Keyword,
            Self::Regex(_) => RuleKind::Regex,
            Self::Default => RuleKind::Default,
        }
    }

    /// Runs the predicate, returning the captures on success.
    fn evaluate(&self, message: &str) -> Option<Vec<(String, String)>> {
        match self {
            Self::Command(command) => {
                let rest = message.strip_prefix(command.as_str())?;
                if rest.is_empty() || rest.starts_with(' ') {
                    Some(vec![(CONTENT_KEY.to_string(), rest.trim().to_string())])
                } else {
                    None
                }
            }
            Self::Prefix(prefix) => message
                .strip_prefix(prefix.as_str())
                .map(|rest| vec![(CONTENT_KEY.to_string(), rest.trim().to_string())]),
            Self::Keyword(keyword) => message.contains(keyword.as_str()).then(Vec::new),
            Self::Regex(regex) => {
                let caps = regex.captures(message)?;
                let mut out = Vec::new();
                for i in 1..caps.len() {
                    if let Some(m) = caps.get(i) {
                        out.push((format!("${i}"), m.as_str().to_string()));
                    }
                }
                for name in regex.capture_names().flatten() {
                    if let Some(m) = caps.name(name) {
                        out.push((name.to_string(), m.as_str().to_string()));
                    }
                }
                Some(out)
            }
            Self::Default => Some(vec![(MESSAGE_KEY.to_string(), message.to_string())]),
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    predicate: Predicate,
    pattern: String,
    api_name: String,
    path_override: Option<String>,
    method_override: Option<String>,
}

impl Rule {
    /// Compiles a rule definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if a `REGEX` pattern does not
    /// compile.
    pub fn new(definition: RuleDefinition) -> RuleResult<Self> {
        let predicate = Predicate::compile(definition.kind, &definition.pattern)?;
        Ok(Self {
            predicate,
            pattern: definition.pattern,
            api_name: definition.api_name,
            path_override: definition.path_override,
            method_override: definition.method_override,
        })
    }

    /// Parses and compiles a rule string.
    pub fn parse(rule: &str) -> RuleResult<Self> {
        Self::new(rule.parse()?)
    }

    /// Returns the kind of this rule.
    pub fn kind(&self) -> RuleKind {
        self.predicate.kind()
    }

    /// Returns the pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the target API name.
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Tests the message against this rule.
    ///
    /// Returns `None` for empty or whitespace-only messages regardless of
    /// kind.
    pub fn match_message(&self, message: &str) -> Option<MatchParams> {
        if message.trim().is_empty() {
            return None;
        }

        let captures = self.predicate.evaluate(message)?;

        let mut params = MatchParams::new(self.api_name.clone())
            .with_path_override(self.path_override.clone())
            .with_method_override(self.method_override.clone());
        for (key, value) in captures {
            params.insert(key, value);
        }
        Some(params)
    }
}
