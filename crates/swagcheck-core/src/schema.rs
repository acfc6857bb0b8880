//! Typed schema tree
//!
//! Descriptions carry schemas as loose JSON. Everything downstream
//! (body flattening, type and required checks) walks this tagged form instead,
//! so each recursive step matches on a closed set of node kinds.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::description::{ApiDescription, reference_of};
use crate::error::SpecError;

/// Maximum nesting followed while resolving a schema (stops circular `$ref`s).
const MAX_DEPTH: u32 = 20;

/// A resolved schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    #[serde(flatten)]
    pub kind: SchemaKind,
    /// Property names that must be present on the value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Node kind, keyed by the declared `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaKind {
    Object {
        #[serde(default)]
        properties: BTreeMap<String, Schema>,
    },
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<Schema>>,
    },
    Integer,
    Number,
    String,
    Boolean,
    /// No usable `type`: accepts anything
    Any,
}

impl Schema {
    #[must_use]
    pub const fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            required: Vec::new(),
        }
    }

    #[must_use]
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::new(SchemaKind::Object {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        })
    }

    #[must_use]
    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = names.into_iter().map(Into::into).collect();
        self
    }

    /// Convert a JSON schema node, following `$ref`s (nested ones included).
    ///
    /// A node with `properties` but no `type` is read as an object. Unknown
    /// or missing types become [`SchemaKind::Any`]. This is the reading used
    /// by the type and required checks.
    ///
    /// # Errors
    ///
    /// Propagates malformed or unresolved references.
    pub fn from_value(node: &Value, doc: &ApiDescription) -> Result<Self, SpecError> {
        Self::from_value_inner(node, doc, 0, Reading::Resolved)
    }

    /// Convert a node as written, for body routing.
    ///
    /// Only a top-level `$ref` is followed. Nested `$ref`s and nodes without
    /// a `type` have no declared type and become [`SchemaKind::Any`] leaves,
    /// so only inline `type: object` nodes expose their properties.
    ///
    /// # Errors
    ///
    /// Propagates a malformed or unresolved top-level reference.
    pub fn from_declared(node: &Value, doc: &ApiDescription) -> Result<Self, SpecError> {
        Self::from_value_inner(node, doc, 0, Reading::Declared)
    }

    fn from_value_inner(
        node: &Value,
        doc: &ApiDescription,
        depth: u32,
        reading: Reading,
    ) -> Result<Self, SpecError> {
        if depth > MAX_DEPTH {
            return Ok(Self::new(SchemaKind::Any));
        }
        if let Some(raw) = reference_of(node) {
            if reading == Reading::Declared && depth > 0 {
                return Ok(Self::new(SchemaKind::Any));
            }
            let target = doc.resolve_str(raw)?;
            return Self::from_value_inner(target, doc, depth + 1, reading);
        }

        let required = node
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let properties = node.get("properties").and_then(Value::as_object);
        let declared = match node.get("type").and_then(Value::as_str) {
            None if properties.is_some() && reading == Reading::Resolved => Some("object"),
            other => other,
        };
        let kind = match declared {
            Some("object") => {
                let mut resolved = BTreeMap::new();
                for (name, child) in properties.into_iter().flatten() {
                    let child = Self::from_value_inner(child, doc, depth + 1, reading)?;
                    resolved.insert(name.clone(), child);
                }
                SchemaKind::Object {
                    properties: resolved,
                }
            }
            Some("array") => SchemaKind::Array {
                items: node
                    .get("items")
                    .map(|items| {
                        Self::from_value_inner(items, doc, depth + 1, reading).map(Box::new)
                    })
                    .transpose()?,
            },
            Some("integer") => SchemaKind::Integer,
            Some("number") => SchemaKind::Number,
            Some("string") => SchemaKind::String,
            Some("boolean") => SchemaKind::Boolean,
            _ => SchemaKind::Any,
        };

        Ok(Self { kind, required })
    }

    /// Declared properties, if this is an object node.
    #[must_use]
    pub fn properties(&self) -> Option<&BTreeMap<String, Schema>> {
        match &self.kind {
            SchemaKind::Object { properties } => Some(properties),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }
}

/// How much of the written schema is trusted when building the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    /// Every `$ref` followed, untyped nodes with properties read as objects
    Resolved,
    /// Only the top-level `$ref` followed, no type inference
    Declared,
}

impl SchemaKind {
    /// Name of the declared type, as written in descriptions.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Object { .. } => "object",
            Self::Array { .. } => "array",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }

    /// Whether the runtime type of `value` matches this kind.
    ///
    /// `integer` needs a whole number; `number` takes any numeric value.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Object { .. } => value.is_object(),
            Self::Array { .. } => value.is_array(),
            Self::Integer => is_whole_number(value),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Any => true,
        }
    }
}

fn is_whole_number(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0),
        _ => false,
    }
}
