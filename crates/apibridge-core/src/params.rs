//! Match parameters produced by a successful rule match.

use std::fmt;

/// Key under which the target API name is exposed.
pub const API_NAME_KEY: &str = "apiName";
/// Key under which the path override is exposed.
pub const PATH_OVERRIDE_KEY: &str = "pathOverride";
/// Key under which the method override is exposed.
pub const METHOD_OVERRIDE_KEY: &str = "methodOverride";

/// Prefix of positional capture keys (`$1`, `$2`, ...).
pub const POSITIONAL_PREFIX: char = '$';

/// Parameters produced by a rule match.
///
/// Captures keep their insertion order so that substitution over them is
/// deterministic. The three target keys are always present when iterating;
/// absent overrides read as empty strings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MatchParams {
    captures: Vec<(String, String)>,
    api_name: String,
    path_override: Option<String>,
    method_override: Option<String>,
}

impl MatchParams {
    /// Creates parameters targeting the given API with no captures.
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            ..Default::default()
        }
    }

    /// Sets the path override.
    pub fn with_path_override(mut self, path: Option<String>) -> Self {
        self.path_override = path;
        self
    }

    /// Sets the method override.
    pub fn with_method_override(mut self, method: Option<String>) -> Self {
        self.method_override = method;
        self
    }

    /// Inserts or replaces a capture.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.captures.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.captures.push((key, value)),
        }
    }

    /// Adds a capture (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the target API name.
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Returns the path override, if one was configured.
    pub fn path_override(&self) -> Option<&str> {
        self.path_override.as_deref()
    }

    /// Returns the method override, if one was configured.
    pub fn method_override(&self) -> Option<&str> {
        self.method_override.as_deref()
    }

    /// Looks up a parameter by key, including the three target keys.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            API_NAME_KEY => Some(&self.api_name),
            PATH_OVERRIDE_KEY => Some(self.path_override.as_deref().unwrap_or("")),
            METHOD_OVERRIDE_KEY => Some(self.method_override.as_deref().unwrap_or("")),
            _ => self
                .captures
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
        }
    }

    /// Iterates over the rule-specific captures only.
    pub fn captures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.captures.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over every parameter: captures first, then the target keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let targets: [(&str, &str); 3] = [
            (API_NAME_KEY, self.api_name.as_str()),
            (
                PATH_OVERRIDE_KEY,
                self.path_override.as_deref().unwrap_or(""),
            ),
            (
                METHOD_OVERRIDE_KEY,
                self.method_override.as_deref().unwrap_or(""),
            ),
        ];
        self.captures().chain(targets)
    }

    /// Iterates over positional parameters (`$1`, `$2`, ...) and any other
    /// key carrying the `$` prefix.
    pub fn positional(&self) -> impl Iterator<Item = (&str, &str)> {
        self.captures()
            .filter(|(k, _)| k.starts_with(POSITIONAL_PREFIX))
    }
}

impl fmt::Debug for MatchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
