//! Request construction.
//!
//! [`RequestBuilder`] turns an [`ApiDefinition`] and the [`MatchParams`] of a
//! matched rule into a [`ResolvedRequest`]:
//!
//! 1. the path override has its `{$n}` placeholders filled in,
//! 2. the URL is the endpoint joined with that path by exactly one `/`,
//! 3. the method comes from the method override or the API's method tree,
//! 4. headers are copied from the definition,
//! 5. for `POST`, `PUT` and `PATCH` the body template is rendered.
//!
//! Body templating is a literal substring replacement of every parameter
//! *key* (not a `{key}` placeholder) inside every string leaf. A template
//! string such as `"content"` becomes the captured text; unrelated text that
//! happens to contain a key is rewritten as well.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::api::ApiDefinition;
use crate::error::{BuildError, BuildResult};
use crate::params::MatchParams;

/// Methods that carry a body.
const BODY_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    /// Absolute URL.
    pub url: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Headers copied from the API definition.
    pub headers: BTreeMap<String, String>,
    /// Optional body.
    pub body: Option<RequestBody>,
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as `application/json`.
    Json(Map<String, Value>),
    /// Sent as raw text.
    Text(String),
}

/// Builds requests for one API.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    api: &'a ApiDefinition,
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder for the given API.
    pub fn new(api: &'a ApiDefinition) -> Self {
        Self { api }
    }

    /// Builds the request for a rule match.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingEndpoint`] if the API has no endpoint and
    /// [`BuildError::InvalidMethod`] if the resolved method is not a valid
    /// HTTP token.
    pub fn build(&self, params: &MatchParams) -> BuildResult<ResolvedRequest> {
        let endpoint = self.api.endpoint.trim();
        if endpoint.is_empty() {
            return Err(BuildError::MissingEndpoint {
                api: self.api.name.clone(),
            });
        }

        let path = substitute_path(params.path_override().unwrap_or(""), params);
        let url = join_url(endpoint, &path);

        let method = match params.method_override() {
            Some(method) if !method.trim().is_empty() => method.trim().to_ascii_uppercase(),
            _ => self.api.methods.resolve(&path).trim().to_ascii_uppercase(),
        };
        if !is_method_token(&method) {
            return Err(BuildError::InvalidMethod(method));
        }

        let body = if BODY_METHODS.contains(&method.as_str()) {
            self.api
                .body_template()
                .map(|template| render_body(template, params))
                .and_then(into_body)
        } else {
            None
        };

        debug!(
            api = %self.api.name,
            method = %method,
            url = %url,
            has_body = body.is_some(),
            "Request built"
        );

        Ok(ResolvedRequest {
            url,
            method,
            headers: self.api.headers.clone(),
            body,
        })
    }
}

/// Replaces `{key}` with its value for every `$`-prefixed parameter.
pub fn substitute_path(path: &str, params: &MatchParams) -> String {
    let mut path = path.to_string();
    for (key, value) in params.positional() {
        let token = format!("{{{key}}}");
        if path.contains(&token) {
            path = path.replace(&token, value);
        }
    }
    path
}

/// Joins an endpoint and a path with exactly one `/`.
pub fn join_url(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Renders a body template against the match parameters.
///
/// The template is deep-copied; string leaves get every parameter key
/// replaced by its value, arrays and objects recurse, other leaves are kept.
pub fn render_body(template: &Value, params: &MatchParams) -> Value {
    match template {
        Value::String(s) => {
            let mut rendered = s.clone();
            for (key, value) in params.iter() {
                if !key.is_empty() && rendered.contains(key) {
                    trace!(key = %key, "Substituting body parameter");
                    rendered = rendered.replace(key, value);
                }
            }
            Value::String(rendered)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_body(v, params)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_body(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn into_body(value: Value) -> Option<RequestBody> {
    match value {
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => Some(RequestBody::Json(map)),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(RequestBody::Text(s)),
        Value::Null => None,
        other => Some(RequestBody::Text(other.to_string())),
    }
}

fn is_method_token(method: &str) -> bool {
    !method.is_empty()
        && method
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
