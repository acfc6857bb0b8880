//! `$name` placeholders in example literals, filled from runtime variables

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Runtime variable mapping: placeholder name → value.
pub type Variables = BTreeMap<String, Value>;

/// Marker that turns a string literal into a placeholder.
pub const PLACEHOLDER_PREFIX: char = '$';

/// Replace a `$name` string with `variables[name]`.
///
/// Non-strings, strings without the marker, and placeholders with no matching
/// variable are returned unchanged.
#[must_use]
pub fn substitute(value: &Value, variables: &Variables) -> Value {
    let Some(name) = value
        .as_str()
        .and_then(|s| s.strip_prefix(PLACEHOLDER_PREFIX))
    else {
        return value.clone();
    };
    match variables.get(name) {
        Some(replacement) => replacement.clone(),
        None => {
            tracing::warn!(placeholder = name, "no runtime variable for placeholder");
            value.clone()
        }
    }
}

/// Apply [`substitute`] to every literal parameter.
#[must_use]
pub fn substitute_all(literals: &Map<String, Value>, variables: &Variables) -> Map<String, Value> {
    literals
        .iter()
        .map(|(k, v)| (k.clone(), substitute(v, variables)))
        .collect()
}
