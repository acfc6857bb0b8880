//! Synthesized scenarios: a ready-to-dispatch request plus what the response must satisfy

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::description::HttpMethod;
use crate::schema::Schema;

/// One request/expected-response pair built from an `x-test` example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    pub description: String,
    pub request: ScenarioRequest,
    pub response: Expectation,
    /// Literal parameters that matched no declared parameter or body property
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
}

/// The request half of a scenario.
///
/// `None` buckets mean "no parameters of this kind", which is distinct from
/// an explicitly empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioRequest {
    pub method: HttpMethod,
    /// Absolute URI with path parameters already expanded
    pub uri: String,
    pub path: Option<Map<String, Value>>,
    pub query: Option<Map<String, Value>>,
    /// Nested (unflattened) JSON body
    pub body: Option<Value>,
    pub headers: Option<Map<String, Value>>,
}

impl ScenarioRequest {
    /// Query bucket as `name=value` pairs; arrays become repeated keys.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (name, value) in self.query.iter().flatten() {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().map(|v| (name.clone(), value_to_param_string(v))));
                }
                Value::Null => {}
                other => pairs.push((name.clone(), value_to_param_string(other))),
            }
        }
        pairs
    }

    /// Headers with their values in string form.
    #[must_use]
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), value_to_param_string(v)))
            .collect()
    }

    /// URI including the query string, form-encoded as the HTTP client sends it.
    #[must_use]
    pub fn url(&self) -> String {
        let pairs = self.query_pairs();
        if pairs.is_empty() {
            return self.uri.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();
        let joiner = if self.uri.contains('?') { '&' } else { '?' };
        format!("{}{joiner}{query}", self.uri)
    }
}

/// Everything the response is checked against. Each layer is optional and
/// checked independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Expectation {
    pub status: u16,
    /// Literal header values from the example
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    /// Literal body fields from the example
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Declared response schema for the status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Schema>,
}

impl Expectation {
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            headers: None,
            schema: None,
            spec: None,
        }
    }
}

/// String form of a literal used in query strings and headers.
#[must_use]
pub fn value_to_param_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
