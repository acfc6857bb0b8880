//! Swagger 2.0 API description: paths, operations, parameters and `x-test` examples
//!
//! The raw JSON tree is kept alongside the typed view so that local
//! references (`#/definitions/Pet`, `#/parameters/limit`) can be resolved
//! against any part of the document.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SpecError;

/// HTTP methods an operation can be declared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
    ];

    /// Match a path-item key. Non-method keys (`parameters`, `x-*`) yield `None`.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter lives in the HTTP request.
///
/// Any `in` value other than the four known ones (e.g. `formData`) maps to
/// `Invalid`, and literal values routed there never reach the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    Query,
    Header,
    Body,
    #[serde(other)]
    Invalid,
}

/// A local reference such as `#/definitions/Pet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    raw: String,
    pointer: String,
}

impl Reference {
    /// Parse a `$ref` string. Only document-local pointers are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::MalformedReference`] unless the string starts with `#/`.
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        match raw.strip_prefix('#') {
            Some(pointer) if pointer.starts_with('/') => Ok(Self {
                raw: raw.to_string(),
                pointer: pointer.to_string(),
            }),
            _ => Err(SpecError::MalformedReference(raw.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// The `$ref` string of a JSON node, if it is a reference object.
#[must_use]
pub fn reference_of(node: &Value) -> Option<&str> {
    node.get("$ref").and_then(Value::as_str)
}

/// A declared parameter: either inline or a reference to a shared definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterEntry {
    Reference {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline(ParameterDefinition),
}

/// `{name, in, schema?}` as written in the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "in")]
    pub location: Location,
    /// Body parameters only; may itself be a `$ref`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default)]
    pub required: bool,
}

/// Literal request half of an example test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
}

/// Literal expectation for one status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// One entry of an operation's `x-test` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub request: ExampleRequest,
    /// Status code (as written) → expectation
    #[serde(default)]
    pub response: BTreeMap<String, ExampleResponse>,
}

#[derive(Deserialize)]
struct OperationObject {
    parameters: Option<Vec<ParameterEntry>>,
    #[serde(default)]
    responses: Map<String, Value>,
    #[serde(rename = "x-test", default)]
    examples: Vec<ExampleTest>,
}

/// One HTTP method under one URI.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: HttpMethod,
    /// Path-level parameters first, then operation-level ones.
    pub parameters: Vec<ParameterEntry>,
    /// A `parameters` list was written at path or operation level, even if empty
    pub declares_parameters: bool,
    /// Status code (as written) → response object
    pub responses: Map<String, Value>,
    pub examples: Vec<ExampleTest>,
}

impl Operation {
    /// `"get /pets/{id}"` style label used in logs and reports.
    #[must_use]
    pub fn label(&self, uri: &str) -> String {
        format!("{} {uri}", self.method)
    }
}

/// All operations declared under one URI template.
#[derive(Debug, Clone, PartialEq)]
pub struct PathItem {
    pub uri: String,
    pub operations: Vec<Operation>,
}

/// A loaded API description. Immutable once built.
#[derive(Debug, Clone)]
pub struct ApiDescription {
    root: Value,
    host: Option<String>,
    base_path: Option<String>,
    paths: Vec<PathItem>,
}

impl ApiDescription {
    /// Build the typed view over a parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidDescription`] if `paths`, a path item or an
    /// operation does not have the expected shape.
    pub fn from_value(root: Value) -> Result<Self, SpecError> {
        let host = root.get("host").and_then(Value::as_str).map(str::to_string);
        let base_path = root
            .get("basePath")
            .and_then(Value::as_str)
            .map(str::to_string);

        let paths = match root.get("paths") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(paths)) => paths
                .iter()
                .map(|(uri, item)| parse_path_item(uri, item))
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(SpecError::InvalidDescription(
                    "`paths` must be an object".into(),
                ));
            }
        };

        Ok(Self {
            root,
            host,
            base_path,
            paths,
        })
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    #[must_use]
    pub fn paths(&self) -> &[PathItem] {
        &self.paths
    }

    /// Walk a reference from the document root.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::UnresolvedReference`] when a segment is missing.
    pub fn resolve(&self, reference: &Reference) -> Result<&Value, SpecError> {
        self.root
            .pointer(&reference.pointer)
            .ok_or_else(|| SpecError::UnresolvedReference(reference.raw.clone()))
    }

    /// Parse and resolve a raw `$ref` string.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::MalformedReference`] or [`SpecError::UnresolvedReference`].
    pub fn resolve_str(&self, raw: &str) -> Result<&Value, SpecError> {
        let reference = Reference::parse(raw)?;
        let target = self.resolve(&reference)?;
        tracing::debug!(reference = raw, "resolved reference");
        Ok(target)
    }

    /// Follow `node` if it is a reference object, otherwise return it as is.
    ///
    /// # Errors
    ///
    /// Same as [`ApiDescription::resolve_str`].
    pub fn follow<'a>(&'a self, node: &'a Value) -> Result<&'a Value, SpecError> {
        match reference_of(node) {
            Some(raw) => self.resolve_str(raw),
            None => Ok(node),
        }
    }
}

fn parse_path_item(uri: &str, item: &Value) -> Result<PathItem, SpecError> {
    let Some(fields) = item.as_object() else {
        return Err(SpecError::InvalidDescription(format!(
            "path item {uri} must be an object"
        )));
    };

    let shared: Option<Vec<ParameterEntry>> = match fields.get("parameters") {
        Some(params) => Some(serde_json::from_value(params.clone()).map_err(|e| {
            SpecError::InvalidDescription(format!("parameters of {uri}: {e}"))
        })?),
        None => None,
    };

    let mut operations = Vec::new();
    for (key, body) in fields {
        let Some(method) = HttpMethod::from_key(key) else {
            continue;
        };
        let object: OperationObject = serde_json::from_value(body.clone())
            .map_err(|e| SpecError::InvalidDescription(format!("{method} {uri}: {e}")))?;

        let declares_parameters = shared.is_some() || object.parameters.is_some();
        let mut parameters = shared.clone().unwrap_or_default();
        parameters.extend(object.parameters.unwrap_or_default());

        operations.push(Operation {
            method,
            parameters,
            declares_parameters,
            responses: object.responses,
            examples: object.examples,
        });
    }

    Ok(PathItem {
        uri: uri.to_string(),
        operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ApiDescription {
        ApiDescription::from_value(json!({
            "swagger": "2.0",
            "host": "api.example.com",
            "basePath": "/v1",
            "paths": {
                "/pets/{id}": {
                    "parameters": [{"$ref": "#/parameters/id"}],
                    "get": {
                        "parameters": [{"name": "verbose", "in": "query"}],
                        "responses": {"200": {"schema": {"$ref": "#/definitions/Pet"}}},
                        "x-test": [{"description": "fetch", "request": {"parameters": {"id": 1}}}]
                    },
                    "x-owner": "team-pets"
                }
            },
            "parameters": {
                "id": {"name": "id", "in": "path", "required": true}
            },
            "definitions": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn reads_host_and_base_path() {
        let doc = sample();
        assert_eq!(doc.host(), Some("api.example.com"));
        assert_eq!(doc.base_path(), Some("/v1"));
    }

    #[test]
    fn skips_non_method_keys() {
        let doc = sample();
        assert_eq!(doc.paths().len(), 1);
        let item = &doc.paths()[0];
        assert_eq!(item.uri, "/pets/{id}");
        assert_eq!(item.operations.len(), 1);
        assert_eq!(item.operations[0].method, HttpMethod::Get);
    }

    #[test]
    fn merges_path_level_parameters_first() {
        let doc = sample();
        let op = &doc.paths()[0].operations[0];
        assert_eq!(op.parameters.len(), 2);
        assert!(matches!(
            &op.parameters[0],
            ParameterEntry::Reference { reference } if reference == "#/parameters/id"
        ));
        assert!(matches!(
            &op.parameters[1],
            ParameterEntry::Inline(p) if p.name == "verbose" && p.location == Location::Query
        ));
    }

    #[test]
    fn tracks_whether_parameters_are_declared() {
        let doc = ApiDescription::from_value(json!({
            "paths": {
                "/a": {"get": {}, "put": {"parameters": []}},
                "/b": {"parameters": [], "get": {}}
            }
        }))
        .unwrap();
        let a = &doc.paths()[0].operations;
        assert!(!a[0].declares_parameters);
        assert!(a[1].declares_parameters);
        assert!(a[1].parameters.is_empty());
        assert!(doc.paths()[1].operations[0].declares_parameters);
    }

    #[test]
    fn reads_examples() {
        let doc = sample();
        let op = &doc.paths()[0].operations[0];
        assert_eq!(op.examples.len(), 1);
        assert_eq!(op.examples[0].description.as_deref(), Some("fetch"));
        let params = op.examples[0].request.parameters.as_ref().unwrap();
        assert_eq!(params["id"], json!(1));
        assert!(op.examples[0].response.is_empty());
    }

    #[test]
    fn unknown_location_is_invalid() {
        let p: ParameterDefinition =
            serde_json::from_value(json!({"name": "file", "in": "formData"})).unwrap();
        assert_eq!(p.location, Location::Invalid);
    }

    #[test]
    fn resolve_definition() {
        let doc = sample();
        let pet = doc.resolve_str("#/definitions/Pet").unwrap();
        assert_eq!(pet["type"], "object");
    }

    #[test]
    fn resolve_nested_segment() {
        let doc = sample();
        let name = doc.resolve_str("#/definitions/Pet/properties/name").unwrap();
        assert_eq!(name, &json!({"type": "string"}));
    }

    #[test]
    fn resolve_missing_segment_fails() {
        let doc = sample();
        let err = doc.resolve_str("#/definitions/Dog").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnresolvedReference("#/definitions/Dog".into())
        );
    }

    #[test]
    fn malformed_reference_rejected() {
        assert_eq!(
            Reference::parse("definitions/Pet").unwrap_err(),
            SpecError::MalformedReference("definitions/Pet".into())
        );
        assert!(Reference::parse("other.json#/definitions/Pet").is_err());
    }

    #[test]
    fn reference_keeps_raw_text() {
        let r = Reference::parse("#/definitions/Pet").unwrap();
        assert_eq!(r.as_str(), "#/definitions/Pet");
    }

    #[test]
    fn follow_passes_through_inline_nodes() {
        let doc = sample();
        let inline = json!({"type": "integer"});
        assert_eq!(doc.follow(&inline).unwrap(), &inline);
        let by_ref = json!({"$ref": "#/definitions/Pet"});
        assert_eq!(doc.follow(&by_ref).unwrap()["type"], "object");
    }

    #[test]
    fn paths_must_be_object() {
        let err = ApiDescription::from_value(json!({"paths": []})).unwrap_err();
        assert!(matches!(err, SpecError::InvalidDescription(_)));
    }

    #[test]
    fn missing_paths_is_empty() {
        let doc = ApiDescription::from_value(json!({"host": "h"})).unwrap();
        assert!(doc.paths().is_empty());
        assert_eq!(doc.base_path(), None);
    }

    #[test]
    fn method_from_key() {
        assert_eq!(HttpMethod::from_key("delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::from_key("parameters"), None);
        assert_eq!(HttpMethod::Patch.to_string(), "patch");
    }
}
