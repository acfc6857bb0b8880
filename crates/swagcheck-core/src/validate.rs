//! Response validation against a scenario's expectation layers
//!
//! Four checks run independently and each reports every mismatch it finds:
//! status, literal headers, literal body fields, and the declared schema
//! (type and required-field sub-checks).

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scenario::{Expectation, value_to_param_string};
use crate::schema::{Schema, SchemaKind};

/// What came back from the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActualResponse {
    pub status: u16,
    /// Header names are expected lowercased
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON, a string for non-JSON payloads, `None` when empty
    #[serde(default)]
    pub body: Option<Value>,
}

impl ActualResponse {
    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Which check produced a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    Status,
    Header,
    /// Literal body value differs or is missing
    Value,
    /// Declared type not matched
    Type,
    /// Required field missing
    Required,
}

impl MismatchKind {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Status => "Unexpected status code",
            Self::Header => "Header value differs",
            Self::Value => "Body value differs from example",
            Self::Type => "Body value has the wrong type",
            Self::Required => "Required field missing",
        }
    }
}

impl std::fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// One failed assertion at a field path such as `body.owner.name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub path: String,
    /// Expected literal, or the declared type name for type mismatches
    pub expected: Value,
    /// `None` when the actual value is absent
    pub actual: Option<Value>,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let actual = self
            .actual
            .as_ref()
            .map_or_else(|| "nothing".to_string(), Value::to_string);
        match self.kind {
            MismatchKind::Required => write!(f, "{}: required field missing", self.path),
            MismatchKind::Type => write!(
                f,
                "{}: expected {}, got {actual}",
                self.path,
                value_to_param_string(&self.expected)
            ),
            _ => write!(f, "{}: expected {}, got {actual}", self.path, self.expected),
        }
    }
}

/// Run every expectation layer against `actual`.
#[must_use]
pub fn check_response(actual: &ActualResponse, expected: &Expectation) -> Vec<Mismatch> {
    let mut out = Vec::new();
    check_status(actual.status, expected.status, &mut out);
    if let Some(headers) = &expected.headers {
        check_headers(actual, headers, &mut out);
    }
    if let Some(literal) = &expected.schema {
        check_literal(actual.body.as_ref(), literal, "body", &mut out);
    }
    if let Some(spec) = &expected.spec {
        check_types(actual.body.as_ref(), spec, "body", &mut out);
        check_required(actual.body.as_ref().and_then(Value::as_object), spec, "body", &mut out);
    }
    out
}

/// Exact status equality.
pub fn check_status(actual: u16, expected: u16, out: &mut Vec<Mismatch>) {
    if actual != expected {
        out.push(Mismatch {
            kind: MismatchKind::Status,
            path: "status".into(),
            expected: Value::from(expected),
            actual: Some(Value::from(actual)),
        });
    }
}

/// Every expected header must be present with the same string value.
pub fn check_headers(actual: &ActualResponse, expected: &Map<String, Value>, out: &mut Vec<Mismatch>) {
    for (name, value) in expected {
        let want = value_to_param_string(value);
        let got = actual.header(name);
        if got != Some(want.as_str()) {
            out.push(Mismatch {
                kind: MismatchKind::Header,
                path: format!("headers.{name}"),
                expected: Value::String(want),
                actual: got.map(Value::from),
            });
        }
    }
}

/// Compare actual body fields against the example's literal fields.
///
/// Only keys present in `expected` are visited. A present actual value is
/// compared even when it is `0`, `false` or `""`.
pub fn check_literal(actual: Option<&Value>, expected: &Value, path: &str, out: &mut Vec<Mismatch>) {
    match (actual, expected) {
        (Some(Value::Object(actual)), Value::Object(expected)) => {
            for (key, want) in expected {
                check_literal(actual.get(key), want, &format!("{path}.{key}"), out);
            }
        }
        (Some(Value::Array(actual)), Value::Array(expected)) => {
            for (i, want) in expected.iter().enumerate() {
                check_literal(actual.get(i), want, &format!("{path}[{i}]"), out);
            }
        }
        (Some(got), want) if values_equal(got, want) => {}
        (got, want) => out.push(Mismatch {
            kind: MismatchKind::Value,
            path: path.to_string(),
            expected: want.clone(),
            actual: got.cloned(),
        }),
    }
}

/// Strict JSON equality, except numbers compare by value (`1 == 1.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        _ => a == b,
    }
}

/// Declared-type check. Absent values pass; the required check covers them.
pub fn check_types(actual: Option<&Value>, schema: &Schema, path: &str, out: &mut Vec<Mismatch>) {
    let Some(value) = actual else {
        return;
    };
    if !schema.kind.accepts(value) {
        out.push(Mismatch {
            kind: MismatchKind::Type,
            path: path.to_string(),
            expected: Value::from(schema.kind.type_name()),
            actual: Some(value.clone()),
        });
        return;
    }
    match (&schema.kind, value) {
        (SchemaKind::Object { properties }, Value::Object(fields)) => {
            for (key, child) in properties {
                check_types(fields.get(key), child, &format!("{path}.{key}"), out);
            }
        }
        (SchemaKind::Array { items: Some(items) }, Value::Array(elements)) => {
            for (i, element) in elements.iter().enumerate() {
                check_types(Some(element), items, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

/// Required-field check.
///
/// Descends through every declared property whether or not the actual value
/// exists, so nested required fields under an absent parent are still
/// reported. A `null` value counts as present.
pub fn check_required(
    actual: Option<&Map<String, Value>>,
    schema: &Schema,
    path: &str,
    out: &mut Vec<Mismatch>,
) {
    for name in &schema.required {
        if actual.and_then(|fields| fields.get(name)).is_none() {
            out.push(Mismatch {
                kind: MismatchKind::Required,
                path: format!("{path}.{name}"),
                expected: Value::String(name.clone()),
                actual: None,
            });
        }
    }
    for (key, child) in schema.properties().into_iter().flatten() {
        let nested = actual
            .and_then(|fields| fields.get(key))
            .and_then(Value::as_object);
        check_required(nested, child, &format!("{path}.{key}"), out);
    }
}
