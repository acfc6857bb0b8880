//! Suite execution: synthesize once, dispatch each scenario, validate

use std::path::PathBuf;

use swagcheck_core::{
    ApiDescription, Config, ScenarioResult, ScenarioSet, SpecError, SuiteReport,
    SynthesisOptions, Variables, check_response, synthesize,
};

use crate::dispatch::Dispatcher;
use crate::loader::load_description;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Runs every synthesized scenario of one description
pub struct SuiteRunner {
    spec_path: PathBuf,
    host: Option<String>,
    base_path: Option<String>,
    variables: Variables,
    stop_on_failure: bool,
    /// Substring of "METHOD /uri" selecting operations to run
    filter: Option<String>,
}

impl SuiteRunner {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            spec_path: config.spec.clone(),
            host: config.host.clone(),
            base_path: config.base_path.clone(),
            variables: config.variables.clone(),
            stop_on_failure: config.stop_on_failure,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    #[must_use]
    pub fn spec_path(&self) -> &std::path::Path {
        &self.spec_path
    }

    /// Synthesis inputs: description values overridden by config.
    #[must_use]
    pub fn options(&self, doc: &ApiDescription) -> SynthesisOptions {
        let mut options =
            SynthesisOptions::for_description(doc).with_variables(self.variables.clone());
        if let Some(host) = &self.host {
            options = options.with_host(host.clone());
        }
        if let Some(base_path) = &self.base_path {
            options = options.with_base_path(base_path.clone());
        }
        options
    }

    /// Load the description and synthesize its scenarios. No requests are sent.
    ///
    /// # Errors
    ///
    /// Returns error if the description cannot be loaded or a reference in it
    /// does not resolve.
    pub fn synthesize(&self) -> Result<ScenarioSet, RunnerError> {
        let doc = load_description(&self.spec_path)?;
        Ok(synthesize(&doc, &self.options(&doc))?)
    }

    /// Run `set` through `dispatcher`, in description order.
    pub fn run_with(&self, set: &ScenarioSet, dispatcher: &dyn Dispatcher) -> SuiteReport {
        let mut report = SuiteReport::default();

        for (uri, method, scenario) in set.iter() {
            let operation = format!("{} {uri}", method.as_str().to_uppercase());
            if self
                .filter
                .as_deref()
                .is_some_and(|f| !operation.contains(f))
            {
                continue;
            }

            let request = scenario.request.clone();
            let result = match dispatcher.dispatch(&scenario.request) {
                Ok(actual) => {
                    let mismatches = check_response(&actual, &scenario.response);
                    ScenarioResult::validated(
                        uri,
                        &scenario.description,
                        request,
                        actual.status,
                        mismatches,
                    )
                }
                Err(e) => ScenarioResult::errored(uri, &scenario.description, request, e.to_string()),
            };

            let outcome = result.outcome();
            tracing::info!(
                operation = %operation,
                description = %scenario.description,
                %outcome,
                mismatches = result.mismatches.len(),
                "scenario executed"
            );
            report.results.push(result);

            if self.stop_on_failure && outcome != swagcheck_core::Outcome::Passed {
                report.stopped_early = true;
                break;
            }
        }

        report
    }
}
