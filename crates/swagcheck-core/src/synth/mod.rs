//! Scenario synthesis from `x-test` examples
//!
//! Per operation the declared parameters are expanded (and the body schema
//! flattened) once. Per example the literals are substituted, routed, and
//! assembled into a [`Scenario`].

pub mod expand;
pub mod flatten;
pub mod route;
pub mod substitute;
pub mod template;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::description::{ApiDescription, ExampleTest, HttpMethod, Operation};
use crate::error::SpecError;
use crate::scenario::{Expectation, Scenario, ScenarioRequest};
use crate::schema::Schema;

use expand::{ExpandedParameters, expand_parameters};
use flatten::unflatten;
use route::{RoutedParameters, route};
use substitute::{Variables, substitute_all};

const DEFAULT_STATUS: u16 = 200;
const DEFAULT_HOST: &str = "localhost";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Explicit inputs to synthesis besides the description itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    pub host: String,
    pub base_path: String,
    pub variables: Variables,
}

impl SynthesisOptions {
    /// Host and base path as declared by the description.
    #[must_use]
    pub fn for_description(doc: &ApiDescription) -> Self {
        Self {
            host: doc.host().unwrap_or(DEFAULT_HOST).to_string(),
            base_path: doc.base_path().unwrap_or_default().to_string(),
            variables: Variables::new(),
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

/// Scenarios of one method under one URI, in example order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MethodScenarios {
    pub method: HttpMethod,
    pub scenarios: Vec<Scenario>,
}

/// All methods declared under one URI template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteScenarios {
    pub uri: String,
    pub methods: Vec<MethodScenarios>,
}

/// Synthesis output: URI → method → ordered scenarios.
///
/// Operations without examples are kept with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioSet {
    pub routes: Vec<RouteScenarios>,
}

impl ScenarioSet {
    /// Scenarios for one operation, if it is declared.
    #[must_use]
    pub fn get(&self, uri: &str, method: HttpMethod) -> Option<&[Scenario]> {
        self.routes
            .iter()
            .find(|r| r.uri == uri)?
            .methods
            .iter()
            .find(|m| m.method == method)
            .map(|m| m.scenarios.as_slice())
    }

    /// Every scenario with its URI template and method.
    pub fn iter(&self) -> impl Iterator<Item = (&str, HttpMethod, &Scenario)> {
        self.routes.iter().flat_map(|r| {
            r.methods.iter().flat_map(move |m| {
                m.scenarios
                    .iter()
                    .map(move |s| (r.uri.as_str(), m.method, s))
            })
        })
    }

    /// Total number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(operations with at least one scenario, operations)`
    #[must_use]
    pub fn coverage(&self) -> (usize, usize) {
        self.routes
            .iter()
            .flat_map(|r| &r.methods)
            .fold((0, 0), |(tested, total), m| {
                (tested + usize::from(!m.scenarios.is_empty()), total + 1)
            })
    }
}

/// Synthesize every example of every operation in the description.
///
/// # Errors
///
/// Fails on the first reference that is malformed or does not resolve.
pub fn synthesize(
    doc: &ApiDescription,
    options: &SynthesisOptions,
) -> Result<ScenarioSet, SpecError> {
    let mut routes = Vec::with_capacity(doc.paths().len());
    for item in doc.paths() {
        let mut methods = Vec::with_capacity(item.operations.len());
        for op in &item.operations {
            methods.push(MethodScenarios {
                method: op.method,
                scenarios: synthesize_operation(doc, &item.uri, op, options)?,
            });
        }
        routes.push(RouteScenarios {
            uri: item.uri.clone(),
            methods,
        });
    }
    let set = ScenarioSet { routes };
    let (tested, total) = set.coverage();
    tracing::debug!(scenarios = set.len(), tested, total, "synthesis complete");
    Ok(set)
}

/// Scenarios for a single operation.
///
/// # Errors
///
/// Same as [`synthesize`].
pub fn synthesize_operation(
    doc: &ApiDescription,
    uri: &str,
    op: &Operation,
    options: &SynthesisOptions,
) -> Result<Vec<Scenario>, SpecError> {
    if op.examples.is_empty() {
        return Ok(Vec::new());
    }

    let mut expanded = expand_parameters(&op.parameters, doc)?;
    expanded.flatten_body();

    op.examples
        .iter()
        .map(|example| synthesize_example(doc, uri, op, &expanded, example, options))
        .collect()
}

fn synthesize_example(
    doc: &ApiDescription,
    uri: &str,
    op: &Operation,
    expanded: &ExpandedParameters,
    example: &ExampleTest,
    options: &SynthesisOptions,
) -> Result<Scenario, SpecError> {
    let routed = match &example.request.parameters {
        Some(literals) if op.declares_parameters => {
            route(substitute_all(literals, &options.variables), expanded)
        }
        _ => RoutedParameters::default(),
    };
    let dropped: Vec<String> = routed.invalid.keys().cloned().collect();

    let path_values = routed.path.clone().unwrap_or_default();
    let expanded_uri = template::expand(uri, &path_values);

    let body = routed.body.map(|flat| Value::Object(unflatten(&flat)));
    let headers = merge_headers(example.request.headers.as_ref(), routed.header, body.is_some());

    let status = expected_status(example);
    let response = expectation(doc, op, example, status)?;

    let description = example
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| op.label(uri));

    Ok(Scenario {
        description,
        request: ScenarioRequest {
            method: op.method,
            uri: format!("http://{}{}{expanded_uri}", options.host, options.base_path),
            path: routed.path,
            query: routed.query,
            body,
            headers,
        },
        response,
        dropped,
    })
}

/// A single declared status is authoritative; otherwise 200.
fn expected_status(example: &ExampleTest) -> u16 {
    let mut keys = example.response.keys();
    match (keys.next(), keys.next()) {
        (Some(only), None) => match only.trim().parse::<u16>() {
            Ok(status) if status > 0 => status,
            _ => {
                tracing::warn!(status = %only, "unparseable example status, using 200");
                DEFAULT_STATUS
            }
        },
        _ => DEFAULT_STATUS,
    }
}

fn merge_headers(
    declared: Option<&Map<String, Value>>,
    routed: Option<Map<String, Value>>,
    has_body: bool,
) -> Option<Map<String, Value>> {
    let mut headers = declared.cloned().unwrap_or_default();
    headers.extend(routed.into_iter().flatten());

    if has_body
        && !headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("content-type"))
    {
        headers.insert("content-type".into(), Value::from(JSON_CONTENT_TYPE));
    }

    (!headers.is_empty()).then_some(headers)
}

fn expectation(
    doc: &ApiDescription,
    op: &Operation,
    example: &ExampleTest,
    status: u16,
) -> Result<Expectation, SpecError> {
    let key = status.to_string();
    let literal = example.response.get(&key);

    let spec = match op.responses.get(&key) {
        Some(declared) => doc
            .follow(declared)?
            .get("schema")
            .map(|schema| Schema::from_value(schema, doc))
            .transpose()?,
        None => None,
    };

    Ok(Expectation {
        status,
        headers: literal.and_then(|r| r.headers.clone()),
        schema: literal.and_then(|r| r.schema.clone()),
        spec,
    })
}
