//! Body schema flattening and literal body unflattening
//!
//! Example tests address nested body fields with dotted keys
//! (`owner.name`). Flattening rewrites the body schema's properties into the
//! same dotted form so those keys can be matched; unflattening rebuilds the
//! nested body from the routed dotted literals.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::schema::{Schema, SchemaKind};

/// Replace the properties of an object schema with their dot-joined leaves.
///
/// The schema node itself keeps its kind and `required` list; only the
/// property map changes. Non-object schemas are left alone.
pub fn flatten_schema(schema: &mut Schema) {
    if let SchemaKind::Object { properties } = &mut schema.kind {
        let nested = std::mem::take(properties);
        *properties = flatten_properties(nested);
    }
}

/// Objects with no declared properties are free-form and stay leaves.
fn flatten_properties(properties: BTreeMap<String, Schema>) -> BTreeMap<String, Schema> {
    let mut flat = BTreeMap::new();
    for (key, child) in properties {
        match child.kind {
            SchemaKind::Object { properties: nested } if !nested.is_empty() => {
                for (leaf, schema) in flatten_properties(nested) {
                    flat.insert(format!("{key}.{leaf}"), schema);
                }
            }
            kind => {
                flat.insert(
                    key,
                    Schema {
                        kind,
                        required: child.required,
                    },
                );
            }
        }
    }
    flat
}

/// Rebuild nested objects from dotted keys.
///
/// Intermediate objects are created on demand. A dotted key that runs
/// through an existing non-object value replaces it.
#[must_use]
pub fn unflatten(flat: &Map<String, Value>) -> Map<String, Value> {
    let mut nested = Map::new();
    for (key, value) in flat {
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut nested, &segments, value.clone());
    }
    nested
}

fn insert_path(target: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            target.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let slot = target
                .entry(*head)
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(child) => insert_path(child, rest, value),
                other => {
                    let mut child = Map::new();
                    insert_path(&mut child, rest, value);
                    *other = Value::Object(child);
                }
            }
        }
    }
}
