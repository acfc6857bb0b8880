//! swagcheck-core: scenario synthesis and response validation for Swagger `x-test` examples
//!
//! An [`ApiDescription`] is turned into a [`ScenarioSet`] by [`synthesize`]:
//! one ready-to-dispatch request plus expectation per example. Responses
//! are checked with [`check_response`]. Nothing here performs network I/O.

pub mod config;
pub mod description;
pub mod error;
pub mod http_file;
pub mod plan;
pub mod report;
pub mod scenario;
pub mod schema;
pub mod synth;
pub mod validate;

pub use config::{Config, ConfigError};
pub use description::{ApiDescription, HttpMethod, Location, Operation, Reference};
pub use error::SpecError;
pub use http_file::to_http_file;
pub use plan::Plan;
pub use report::{Outcome, ScenarioResult, SuiteReport, Verdict, VerdictStatus};
pub use scenario::{Expectation, Scenario, ScenarioRequest};
pub use schema::{Schema, SchemaKind};
pub use synth::substitute::Variables;
pub use synth::{ScenarioSet, SynthesisOptions, synthesize};
pub use validate::{ActualResponse, Mismatch, MismatchKind, check_response};

/// JSON Schema of the synthesized scenario output.
///
/// # Errors
///
/// Returns error if the schema cannot be serialized
pub fn generate_schema() -> serde_json::Result<String> {
    let schema = schemars::schema_for!(ScenarioSet);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_generation_produces_valid_json() {
        let schema = generate_schema().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&schema).unwrap();
        assert_eq!(
            parsed.get("title").and_then(|v| v.as_str()),
            Some("ScenarioSet")
        );
    }
}
