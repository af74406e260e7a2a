//! Immutable configuration snapshot.
//!
//! A [`ConfigStore`] is built once per load and never mutated. Reloading
//! builds a new store and swaps it in as a whole, so a message is always
//! handled against a single consistent snapshot.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::api::{ApiDefinition, GlobalConfig};
use crate::matcher::RuleSet;

/// Compiled rules plus API definitions, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    global: GlobalConfig,
    apis: HashMap<String, ApiDefinition>,
    rules: RuleSet,
}

impl ConfigStore {
    /// Builds a store from parsed configuration sections.
    ///
    /// APIs without a name are dropped. When two APIs share a name the later
    /// one wins. Rules are compiled with the global default API.
    pub fn new<I, S>(global: GlobalConfig, apis: Vec<ApiDefinition>, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = HashMap::with_capacity(apis.len());
        for api in apis {
            let name = api.name.trim().to_string();
            if name.is_empty() {
                warn!(endpoint = %api.endpoint, "Skipping API without a name");
                continue;
            }
            if index.contains_key(&name) {
                warn!(api = %name, "Duplicate API name, later definition wins");
            }
            index.insert(name, api);
        }

        let rules = RuleSet::from_definitions(rules, global.default_api());

        debug!(
            api_count = index.len(),
            rule_count = rules.len(),
            "Configuration store built"
        );

        Self {
            global,
            apis: index,
            rules,
        }
    }

    /// Looks up an API by name.
    pub fn api(&self, name: &str) -> Option<&ApiDefinition> {
        self.apis.get(name)
    }

    /// Returns the global settings.
    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    /// Returns the compiled rules.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the number of registered APIs.
    pub fn api_count(&self) -> usize {
        self.apis.len()
    }

    /// Returns the registered API names, sorted.
    pub fn api_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.apis.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
