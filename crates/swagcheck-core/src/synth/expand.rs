//! Parameter expansion: one canonical definition per parameter name
//!
//! References are resolved, and whatever the body parameter is called in
//! the description, it always ends up in the single `body` slot.

use std::collections::BTreeMap;

use crate::description::{ApiDescription, Location, ParameterDefinition, ParameterEntry};
use crate::error::SpecError;
use crate::schema::Schema;
use crate::synth::flatten::flatten_schema;

/// The body parameter with its top-level schema reference resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyParameter {
    /// Name as declared (often, but not always, `body`)
    pub name: String,
    /// Read with [`Schema::from_declared`]: nested `$ref`s are leaves
    pub schema: Option<Schema>,
}

/// Expanded parameter map for one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedParameters {
    named: BTreeMap<String, ParameterDefinition>,
    body: Option<BodyParameter>,
}

impl ExpandedParameters {
    /// Non-body parameter declared under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.named.get(name)
    }

    #[must_use]
    pub const fn body(&self) -> Option<&BodyParameter> {
        self.body.as_ref()
    }

    /// Whether the body schema is an object declaring property `key`.
    #[must_use]
    pub fn body_has_property(&self, key: &str) -> bool {
        self.body
            .as_ref()
            .and_then(|b| b.schema.as_ref())
            .and_then(Schema::properties)
            .is_some_and(|props| props.contains_key(key))
    }

    /// Flatten the body schema in place (see [`flatten_schema`]).
    pub fn flatten_body(&mut self) {
        if let Some(schema) = self.body.as_mut().and_then(|b| b.schema.as_mut()) {
            flatten_schema(schema);
        }
    }

    fn insert(&mut self, definition: ParameterDefinition, doc: &ApiDescription) -> Result<(), SpecError> {
        if definition.location == Location::Body {
            let schema = definition
                .schema
                .as_ref()
                .map(|s| Schema::from_declared(s, doc))
                .transpose()?;
            self.body = Some(BodyParameter {
                name: definition.name,
                schema,
            });
        } else {
            self.named.insert(definition.name.clone(), definition);
        }
        Ok(())
    }
}

/// Build the expanded map for a declared parameter list.
///
/// Later declarations of the same name replace earlier ones, so operation
/// parameters override path-level ones.
///
/// # Errors
///
/// Propagates reference failures; a referenced parameter that is not a
/// parameter object is an [`SpecError::InvalidDescription`].
pub fn expand_parameters(
    entries: &[ParameterEntry],
    doc: &ApiDescription,
) -> Result<ExpandedParameters, SpecError> {
    let mut expanded = ExpandedParameters::default();
    for entry in entries {
        let definition = match entry {
            ParameterEntry::Inline(definition) => definition.clone(),
            ParameterEntry::Reference { reference } => {
                let target = doc.resolve_str(reference)?;
                serde_json::from_value(target.clone()).map_err(|e| {
                    SpecError::InvalidDescription(format!("parameter {reference}: {e}"))
                })?
            }
        };
        expanded.insert(definition, doc)?;
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaKind;
    use serde_json::json;

    fn doc() -> ApiDescription {
        ApiDescription::from_value(json!({
            "parameters": {
                "limit": {"name": "limit", "in": "query"},
                "newPet": {"name": "pet", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}
            },
            "definitions": {
                "Pet": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "owner": {"type": "object", "properties": {"name": {"type": "string"}}}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn entries(value: serde_json::Value) -> Vec<ParameterEntry> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn inline_body_kept_under_body() {
        let doc = doc();
        let expanded = expand_parameters(
            &entries(json!([{
                "name": "payload", "in": "body",
                "schema": {"type": "object", "properties": {"name": {"type": "string"}}}
            }])),
            &doc,
        )
        .unwrap();

        let body = expanded.body().unwrap();
        assert_eq!(body.name, "payload");
        assert!(expanded.get("payload").is_none());
        assert!(expanded.body_has_property("name"));
    }

    #[test]
    fn body_schema_reference_resolved() {
        let doc = doc();
        let expanded = expand_parameters(
            &entries(json!([{"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}])),
            &doc,
        )
        .unwrap();
        let schema = expanded.body().unwrap().schema.as_ref().unwrap();
        assert!(schema.is_object());
        assert_eq!(schema.properties().unwrap()["name"].kind, SchemaKind::String);
    }

    #[test]
    fn referenced_parameter_stored_under_its_name() {
        let doc = doc();
        let expanded =
            expand_parameters(&entries(json!([{"$ref": "#/parameters/limit"}])), &doc).unwrap();
        let limit = expanded.get("limit").unwrap();
        assert_eq!(limit.location, Location::Query);
    }

    #[test]
    fn referenced_body_parameter_goes_to_body() {
        let doc = doc();
        let expanded =
            expand_parameters(&entries(json!([{"$ref": "#/parameters/newPet"}])), &doc).unwrap();
        assert!(expanded.get("pet").is_none());
        assert!(expanded.body_has_property("owner"));
    }

    #[test]
    fn nested_body_reference_stays_a_leaf() {
        let doc = ApiDescription::from_value(json!({
            "definitions": {
                "Category": {"type": "object", "properties": {"id": {"type": "integer"}}},
                "Pet": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "category": {"$ref": "#/definitions/Category"},
                        "meta": {"properties": {"a": {"type": "string"}}}
                    }
                }
            }
        }))
        .unwrap();
        let mut expanded = expand_parameters(
            &entries(json!([{"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}])),
            &doc,
        )
        .unwrap();
        expanded.flatten_body();

        assert!(expanded.body_has_property("category"));
        assert!(expanded.body_has_property("meta"));
        assert!(!expanded.body_has_property("category.id"));
        assert!(!expanded.body_has_property("meta.a"));
    }

    #[test]
    fn untyped_body_schema_routes_nothing() {
        let doc = doc();
        let expanded = expand_parameters(
            &entries(json!([{"name": "body", "in": "body", "schema": {"properties": {"name": {"type": "string"}}}}])),
            &doc,
        )
        .unwrap();
        assert!(expanded.body().is_some());
        assert!(!expanded.body_has_property("name"));
    }

    #[test]
    fn later_declaration_wins() {
        let doc = doc();
        let expanded = expand_parameters(
            &entries(json!([
                {"name": "id", "in": "query"},
                {"name": "id", "in": "path"}
            ])),
            &doc,
        )
        .unwrap();
        assert_eq!(expanded.get("id").unwrap().location, Location::Path);
    }

    #[test]
    fn flatten_body_rekeys_properties() {
        let doc = doc();
        let mut expanded = expand_parameters(
            &entries(json!([{"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Pet"}}])),
            &doc,
        )
        .unwrap();
        assert!(expanded.body_has_property("owner"));
        expanded.flatten_body();
        assert!(expanded.body_has_property("owner.name"));
        assert!(!expanded.body_has_property("owner"));
    }

    #[test]
    fn broken_parameter_reference_propagates() {
        let doc = doc();
        let err = expand_parameters(&entries(json!([{"$ref": "#/parameters/offset"}])), &doc)
            .unwrap_err();
        assert_eq!(
            err,
            SpecError::UnresolvedReference("#/parameters/offset".into())
        );
    }

    #[test]
    fn empty_list_is_empty() {
        let doc = doc();
        let expanded = expand_parameters(&[], &doc).unwrap();
        assert!(expanded.body().is_none());
        assert!(expanded.get("petId").is_none());
    }
}
