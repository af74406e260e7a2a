//! Ordered rule evaluation.
//!
//! A [`RuleSet`] holds rules in declaration order and returns the parameters
//! of the first rule that matches. There is no priority scoring: a catch-all
//! `DEFAULT` rule must be declared last or it shadows everything after it.
//!
//! ```
//! use apibridge_core::RuleSet;
//!
//! let rules = RuleSet::from_definitions(["KEYWORD,测试,api", "DEFAULT,api"], None);
//! let params = rules.match_message("测试").unwrap();
//! assert!(params.get("message").is_none());
//! ```

use tracing::{debug, trace, warn};

use crate::error::RuleError;
use crate::params::MatchParams;
use crate::rule::{Rule, RuleDefinition};

/// An ordered list of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Builds a rule set from rule strings.
    ///
    /// Rules of unknown kind are skipped silently; rules that fail to parse or
    /// compile are skipped with a warning. Rules with an empty API name target
    /// `default_api` when one is given.
    pub fn from_definitions<I, S>(definitions: I, default_api: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();

        for raw in definitions {
            let raw = raw.as_ref();
            let mut definition = match raw.parse::<RuleDefinition>() {
                Ok(d) => d,
                Err(RuleError::UnknownKind(kind)) => {
                    debug!(rule = %raw, kind = %kind, "Skipping rule of unknown kind");
                    continue;
                }
                Err(e) => {
                    warn!(rule = %raw, error = %e, "Skipping malformed rule");
                    continue;
                }
            };

            if definition.api_name.is_empty()
                && let Some(api) = default_api
            {
                definition.api_name = api.to_string();
            }

            match Rule::new(definition) {
                Ok(rule) => set.push(rule),
                Err(e) => warn!(rule = %raw, error = %e, "Failed to compile rule"),
            }
        }

        debug!(rule_count = set.len(), "Rule set built");
        set
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Appends a rule (builder pattern).
    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates over the rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Returns the parameters of the first matching rule.
    pub fn match_message(&self, message: &str) -> Option<MatchParams> {
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(params) = rule.match_message(message) {
                debug!(
                    rule_index = index,
                    kind = %rule.kind(),
                    api = %params.api_name(),
                    "Rule matched"
                );
                return Some(params);
            }
        }

        trace!("No rule matched");
        None
    }
}
