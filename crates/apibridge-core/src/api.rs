//! API and global configuration types.
//!
//! These are the shapes the gateway core consumes. They deserialize straight
//! from the `global` and `apis` sections of the configuration document, so
//! the method tree and body template are validated when the document is
//! loaded rather than on every request.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback key of a method tree node.
pub const DEFAULT_METHOD_KEY: &str = "DEFAULT";

/// Method used when nothing in the tree resolves.
pub const FALLBACK_METHOD: &str = "GET";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Global Config
// =============================================================================

/// Settings shared by every API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// Proxy URL for all outgoing requests; empty means none.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Per-call timeout in seconds.
    #[serde(rename = "timeout", default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// API targeted by rules that leave their API name empty.
    #[serde(rename = "defaultAPI", alias = "default_api", alias = "defaultapi", default)]
    pub default_api: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: default_timeout_secs(),
            default_api: None,
        }
    }
}

fn default_timeout_secs() -> f64 {
    DEFAULT_TIMEOUT.as_secs_f64()
}

impl GlobalConfig {
    /// Returns the per-call timeout.
    ///
    /// Zero, negative and non-finite values fall back to 30 seconds.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Returns the proxy URL, treating an empty string as no proxy.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// Returns the default API name, treating an empty string as none.
    pub fn default_api(&self) -> Option<&str> {
        self.default_api
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

// =============================================================================
// Method Tree
// =============================================================================

/// HTTP method selection: either one method for the whole API or a tree
/// keyed by path segment with `DEFAULT` fallbacks.
///
/// ```json
/// { "/hello": "POST", "users": { "DEFAULT": "GET", "create": "PUT" }, "DEFAULT": "GET" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodTree {
    /// A single method.
    Method(String),
    /// A node keyed by path segment.
    Node(BTreeMap<String, MethodTree>),
}

impl Default for MethodTree {
    fn default() -> Self {
        Self::Node(BTreeMap::new())
    }
}

impl MethodTree {
    /// Resolves the method for a request path.
    ///
    /// Descends one segment at a time. At each node the segment is looked up
    /// as written, then with a leading `/`, then under `DEFAULT`; if none
    /// exists the descent stops. The first method reached wins, otherwise the
    /// current node's `DEFAULT` method, otherwise `GET`.
    pub fn resolve(&self, path: &str) -> &str {
        let mut node = match self {
            Self::Method(method) => return method.as_str(),
            Self::Node(children) => children,
        };

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let next = node
                .get(segment)
                .or_else(|| node.get(&format!("/{segment}")))
                .or_else(|| node.get(DEFAULT_METHOD_KEY));

            match next {
                Some(Self::Method(method)) => return method.as_str(),
                Some(Self::Node(children)) => node = children,
                None => break,
            }
        }

        match node.get(DEFAULT_METHOD_KEY) {
            Some(Self::Method(method)) => method.as_str(),
            _ => FALLBACK_METHOD,
        }
    }
}

// =============================================================================
// API Definition
// =============================================================================

/// Request body preprocessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocess {
    /// Whether the body template is applied.
    #[serde(default)]
    pub enabled: bool,

    /// Request template.
    #[serde(default)]
    pub template: Option<RequestTemplate>,
}

/// Request template; only the body is templated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Body template. String leaves get match parameter keys substituted.
    #[serde(default)]
    pub body: Option<Value>,
}

/// Extraction paths selected by status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Path used when no status entry applies.
    #[serde(default)]
    pub default: Option<String>,

    /// Paths keyed by exact status (`"200"`) or status class (`"4xx"`).
    #[serde(default)]
    pub by_status: BTreeMap<String, String>,
}

impl ExtractConfig {
    /// Iterates over every configured path.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.default
            .as_deref()
            .into_iter()
            .chain(self.by_status.values().map(String::as_str))
    }
}

/// Response handling for one API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Extraction settings; absent means the whole body is used.
    #[serde(default)]
    pub extract: Option<ExtractConfig>,

    /// Text shown when the extracted value is empty.
    #[serde(default)]
    pub fallback: Option<String>,

    /// Display template with `{{key}}` or `{{result}}` tokens.
    #[serde(default)]
    pub format_template: Option<String>,
}

/// One external API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiDefinition {
    /// Unique name referenced by rules.
    pub name: String,

    /// Base URL.
    #[serde(default)]
    pub endpoint: String,

    /// Static headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Method selection.
    #[serde(default)]
    pub methods: MethodTree,

    /// Body preprocessing.
    #[serde(default)]
    pub preprocess: Option<Preprocess>,

    /// Response handling.
    #[serde(default)]
    pub response: ResponseConfig,
}

impl ApiDefinition {
    /// Creates a definition with the given name and endpoint.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Returns the body template if preprocessing is enabled.
    pub fn body_template(&self) -> Option<&Value> {
        self.preprocess
            .as_ref()
            .filter(|p| p.enabled)
            .and_then(|p| p.template.as_ref())
            .and_then(|t| t.body.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> MethodTree {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_string_method() {
        let methods = tree(json!("PUT"));
        assert_eq!(methods.resolve("/anything/here"), "PUT");
    }

    #[test]
    fn test_empty_tree_is_get() {
        assert_eq!(MethodTree::default().resolve("/hello"), "GET");
    }

    #[test]
    fn test_slash_keyed_segment() {
        let methods = tree(json!({"/hello": "POST", "DEFAULT": "GET"}));
        assert_eq!(methods.resolve("/hello"), "POST");
        assert_eq!(methods.resolve("/other"), "GET");
        assert_eq!(methods.resolve(""), "GET");
    }

    #[test]
    fn test_nested_tree() {
        let methods = tree(json!({
            "users": {"create": "PUT", "DEFAULT": "PATCH"},
            "DEFAULT": {"DEFAULT": "DELETE"}
        }));
        assert_eq!(methods.resolve("/users/create"), "PUT");
        assert_eq!(methods.resolve("/users/42"), "PATCH");
        assert_eq!(methods.resolve("/users"), "PATCH");
        assert_eq!(methods.resolve("/misc/x"), "DELETE");
    }

    #[test]
    fn test_descent_stops_without_default() {
        let methods = tree(json!({"users": {"create": "PUT"}}));
        assert_eq!(methods.resolve("/users/42"), "GET");
        assert_eq!(methods.resolve("/orders"), "GET");
    }

    #[test]
    fn test_invalid_tree_shape_is_rejected() {
        let result: Result<MethodTree, _> = serde_json::from_value(json!({"a": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_accepts_both_default_api_spellings() {
        let a: GlobalConfig = serde_json::from_value(json!({"defaultAPI": "x"})).unwrap();
        let b: GlobalConfig = serde_json::from_value(json!({"default_api": "x"})).unwrap();
        assert_eq!(a.default_api(), Some("x"));
        assert_eq!(b.default_api(), Some("x"));
        assert_eq!(a.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_global_config_normalises_empty_values() {
        let global: GlobalConfig =
            serde_json::from_value(json!({"proxy": "", "timeout": 0, "defaultAPI": " "}))
                .unwrap();
        assert_eq!(global.proxy(), None);
        assert_eq!(global.default_api(), None);
        assert_eq!(global.timeout(), DEFAULT_TIMEOUT);

        let global: GlobalConfig = serde_json::from_value(json!({"timeout": 2.5})).unwrap();
        assert_eq!(global.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_body_template_requires_enabled() {
        let mut api: ApiDefinition = serde_json::from_value(json!({
            "name": "a",
            "endpoint": "http://localhost",
            "preprocess": {"enabled": false, "template": {"body": {"q": "content"}}}
        }))
        .unwrap();
        assert!(api.body_template().is_none());

        api.preprocess.as_mut().unwrap().enabled = true;
        assert_eq!(api.body_template(), Some(&json!({"q": "content"})));
    }
}
