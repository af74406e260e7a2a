//! Configuration validation utilities.
//!
//! Document-level problems (no APIs, no rules, unusable global settings) are
//! errors. Problems scoped to a single API or rule are returned as warnings:
//! the API stays registered and fails when a request is built, the rule is
//! skipped when the rule set is compiled.

use std::collections::HashSet;
use std::fmt;

use apibridge_core::response::PATH_ROOT;
use apibridge_core::{ApiDefinition, GlobalConfig, RuleDefinition, RuleError, RuleKind};

use super::error::{ConfigError, ConfigResult};
use super::schema::GatewayConfig;

/// A non-fatal configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Where the problem is, e.g. `api 'weather'` or `rule #2`.
    pub scope: String,
    /// What is wrong.
    pub message: String,
}

impl ValidationWarning {
    fn new(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.message)
    }
}

/// Validates the entire configuration.
///
/// # Errors
///
/// Returns an error for document-level problems. Per-API and per-rule
/// problems are returned as warnings instead.
pub fn validate_config(config: &GatewayConfig) -> ConfigResult<Vec<ValidationWarning>> {
    validate_global_config(&config.global)?;

    if config.apis.is_empty() {
        return Err(ConfigError::validation("No APIs are defined"));
    }
    if config.rules.is_empty() {
        return Err(ConfigError::validation("No rules are defined"));
    }

    let mut warnings = Vec::new();
    let names = validate_apis_config(&config.apis, &mut warnings);
    validate_rules_config(config, &names, &mut warnings);

    Ok(warnings)
}

/// Validates global configuration settings.
fn validate_global_config(global: &GlobalConfig) -> ConfigResult<()> {
    if !global.timeout_secs.is_finite() || global.timeout_secs <= 0.0 {
        return Err(ConfigError::validation(format!(
            "Timeout must be a positive number of seconds, got {}",
            global.timeout_secs
        )));
    }

    if let Some(proxy) = global.proxy() {
        validate_url(proxy, &["http://", "https://", "socks5://", "socks5h://"])?;
    }

    Ok(())
}

/// Validates all API definitions, returning the set of usable names.
fn validate_apis_config<'a>(
    apis: &'a [ApiDefinition],
    warnings: &mut Vec<ValidationWarning>,
) -> HashSet<&'a str> {
    let mut names = HashSet::new();

    for (index, api) in apis.iter().enumerate() {
        let name = api.name.trim();
        if name.is_empty() {
            warnings.push(ValidationWarning::new(
                format!("api #{index}"),
                "missing name, definition ignored",
            ));
            continue;
        }

        if !names.insert(name) {
            warnings.push(ValidationWarning::new(
                format!("api '{name}'"),
                "duplicate name, the later definition wins",
            ));
        }

        validate_api_config(api, warnings);
    }

    names
}

/// Validates a single API definition.
fn validate_api_config(api: &ApiDefinition, warnings: &mut Vec<ValidationWarning>) {
    let scope = format!("api '{}'", api.name.trim());

    let endpoint = api.endpoint.trim();
    if endpoint.is_empty() {
        warnings.push(ValidationWarning::new(&scope, "missing endpoint"));
    } else if let Err(e) = validate_url(endpoint, &["http://", "https://"]) {
        warnings.push(ValidationWarning::new(&scope, e.to_string()));
    }

    if let Some(extract) = &api.response.extract {
        for path in extract.paths().filter(|p| !p.starts_with(PATH_ROOT)) {
            warnings.push(ValidationWarning::new(
                &scope,
                format!("extraction path '{path}' does not start with '{PATH_ROOT}'"),
            ));
        }
    }

    if api
        .preprocess
        .as_ref()
        .is_some_and(|p| p.enabled && p.template.as_ref().and_then(|t| t.body.as_ref()).is_none())
    {
        warnings.push(ValidationWarning::new(
            &scope,
            "preprocessing enabled without a body template",
        ));
    }
}

/// Validates rule strings against the registered APIs.
fn validate_rules_config(
    config: &GatewayConfig,
    names: &HashSet<&str>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let default_api = config.global.default_api();
    if let Some(api) = default_api
        && !names.contains(api)
    {
        warnings.push(ValidationWarning::new(
            "global",
            format!("default API '{api}' is not defined"),
        ));
    }

    let mut seen_default = false;
    for (index, raw) in config.rules.iter().enumerate() {
        let scope = format!("rule #{index}");

        let definition = match raw.parse::<RuleDefinition>() {
            Ok(d) => d,
            Err(RuleError::UnknownKind(kind)) => {
                warnings.push(ValidationWarning::new(
                    scope,
                    format!("unknown rule kind '{kind}', rule ignored"),
                ));
                continue;
            }
            Err(e) => {
                warnings.push(ValidationWarning::new(scope, format!("{e}, rule ignored")));
                continue;
            }
        };

        if seen_default {
            warnings.push(ValidationWarning::new(
                &scope,
                "unreachable, a DEFAULT rule is declared before it",
            ));
        }
        seen_default |= definition.kind == RuleKind::Default;

        let target = if definition.api_name.is_empty() {
            default_api
        } else {
            Some(definition.api_name.as_str())
        };
        match target {
            None => warnings.push(ValidationWarning::new(
                scope,
                "no API name and no default API configured",
            )),
            Some(api) if !names.contains(api) => warnings.push(ValidationWarning::new(
                scope,
                format!("targets undefined API '{api}'"),
            )),
            Some(_) => {}
        }
    }
}

/// Validates a URL against a list of accepted schemes.
fn validate_url(url: &str, schemes: &[&str]) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("url"));
    }

    if !schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {schemes:?}"),
        ));
    }

    Ok(())
}
