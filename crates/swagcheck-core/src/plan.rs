//! Plan types and pre-flight checks
//!
//! Describes what a run *would* send without sending any requests.
//! Used for previews and CI checks of x-test coverage.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scenario::Scenario;
use crate::synth::ScenarioSet;
use crate::synth::substitute::PLACEHOLDER_PREFIX;

// ── Plan types ──

/// Complete plan: operations, scenario counts, and warnings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Per-operation scenarios
    pub operations: Vec<OperationPlan>,
    /// Scenarios that would be dispatched
    pub total_scenarios: usize,
    /// Operations with at least one example
    pub tested_operations: usize,
    pub total_operations: usize,
    pub validations: Vec<Validation>,
}

/// Scenarios of one operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OperationPlan {
    /// Operation label, e.g. "POST /pets"
    pub operation: String,
    pub scenarios: Vec<ScenarioPlan>,
}

/// One planned request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioPlan {
    pub description: String,
    /// Request line, e.g. "GET http://host/pets?limit=5"
    pub request: String,
    pub expected_status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
}

/// A validation check result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub check: String,
    pub status: ValidationStatus,
    pub message: String,
}

/// Status of a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl Validation {
    fn new(check: &str, status: ValidationStatus, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            status,
            message: message.into(),
        }
    }
}

impl Plan {
    /// Plan every scenario of `set`; `spec` is the description file it came from.
    #[must_use]
    pub fn build(set: &ScenarioSet, spec: &Path) -> Self {
        let mut operations = Vec::new();
        let mut untested = Vec::new();

        for route in &set.routes {
            for m in &route.methods {
                let operation = format!("{} {}", m.method.as_str().to_uppercase(), route.uri);
                if m.scenarios.is_empty() {
                    untested.push(operation);
                    continue;
                }
                operations.push(OperationPlan {
                    operation,
                    scenarios: m.scenarios.iter().map(scenario_plan).collect(),
                });
            }
        }

        let (tested_operations, total_operations) = set.coverage();
        let mut validations = vec![spec_check(spec)];
        validations.push(coverage_check(&untested, tested_operations, total_operations));
        for (_, _, scenario) in set.iter() {
            validations.extend(scenario_checks(scenario));
        }

        Self {
            operations,
            total_scenarios: set.len(),
            tested_operations,
            total_operations,
            validations,
        }
    }

    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Plan: {} scenarios across {}/{} operations\n",
            self.total_scenarios, self.tested_operations, self.total_operations,
        ));

        for op in &self.operations {
            lines.push(format!("{} ({} scenarios):", op.operation, op.scenarios.len()));
            for s in &op.scenarios {
                lines.push(format!("  - {} -> {}", s.description, s.expected_status));
                lines.push(format!("    {}", s.request));
                if !s.dropped.is_empty() {
                    lines.push(format!("    Dropped: {}", s.dropped.join(", ")));
                }
            }
            lines.push(String::new());
        }

        lines.push("Validation:".into());
        for v in &self.validations {
            lines.push(format!("  [{}] {}", v.status, v.message));
        }

        lines.join("\n")
    }

    /// Returns true if any validation has Error status.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Error)
    }

    /// Returns true if any validation has Warning status.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Warning)
    }
}

fn scenario_plan(scenario: &Scenario) -> ScenarioPlan {
    ScenarioPlan {
        description: scenario.description.clone(),
        request: format!(
            "{} {}",
            scenario.request.method.as_str().to_uppercase(),
            scenario.request.url()
        ),
        expected_status: scenario.response.status,
        dropped: scenario.dropped.clone(),
    }
}

fn spec_check(spec: &Path) -> Validation {
    if spec.exists() {
        Validation::new(
            "spec",
            ValidationStatus::Ok,
            format!("spec: {} (exists)", spec.display()),
        )
    } else {
        Validation::new(
            "spec",
            ValidationStatus::Error,
            format!("spec: {} (not found)", spec.display()),
        )
    }
}

fn coverage_check(untested: &[String], tested: usize, total: usize) -> Validation {
    if total == 0 {
        Validation::new("coverage", ValidationStatus::Error, "coverage: no operations declared")
    } else if untested.is_empty() {
        Validation::new(
            "coverage",
            ValidationStatus::Ok,
            format!("coverage: all {total} operations have x-test examples"),
        )
    } else {
        Validation::new(
            "coverage",
            ValidationStatus::Warning,
            format!(
                "coverage: {tested}/{total} operations tested; missing: {}",
                untested.join(", ")
            ),
        )
    }
}

/// Dropped parameters and `$placeholders` left unsubstituted.
fn scenario_checks(scenario: &Scenario) -> Vec<Validation> {
    let mut checks = Vec::new();
    if !scenario.dropped.is_empty() {
        checks.push(Validation::new(
            "parameters",
            ValidationStatus::Warning,
            format!(
                "{}: dropped undeclared parameters: {}",
                scenario.description,
                scenario.dropped.join(", ")
            ),
        ));
    }

    let request = &scenario.request;
    let mut placeholders = Vec::new();
    for bucket in [&request.path, &request.query, &request.headers]
        .into_iter()
        .flatten()
    {
        placeholders.extend(bucket.values().filter_map(placeholder));
    }
    if let Some(body) = &request.body {
        collect_placeholders(body, &mut placeholders);
    }
    if !placeholders.is_empty() {
        checks.push(Validation::new(
            "variables",
            ValidationStatus::Warning,
            format!(
                "{}: no value for {}",
                scenario.description,
                placeholders.join(", ")
            ),
        ));
    }
    checks
}

fn placeholder(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| s.starts_with(PLACEHOLDER_PREFIX))
        .map(str::to_string)
}

fn collect_placeholders(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(fields) => fields.values().for_each(|v| collect_placeholders(v, out)),
        other => out.extend(placeholder(other)),
    }
}
