//! Suite results and the final pass/fail verdict

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::description::HttpMethod;
use crate::scenario::ScenarioRequest;
use crate::validate::Mismatch;

/// Result of running one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioResult {
    /// URI template the scenario was synthesized for
    pub uri: String,
    pub method: HttpMethod,
    pub description: String,
    pub request: ScenarioRequest,
    /// Actual status, when a response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<Mismatch>,
    /// Transport failure, when no response arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How a scenario ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Errored,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
            Self::Errored => write!(f, "ERROR"),
        }
    }
}

impl ScenarioResult {
    /// A response arrived and was validated.
    #[must_use]
    pub fn validated(
        uri: &str,
        description: &str,
        request: ScenarioRequest,
        status: u16,
        mismatches: Vec<Mismatch>,
    ) -> Self {
        Self {
            uri: uri.to_string(),
            method: request.method,
            description: description.to_string(),
            request,
            status: Some(status),
            mismatches,
            error: None,
        }
    }

    /// The request never got a response.
    #[must_use]
    pub fn errored(
        uri: &str,
        description: &str,
        request: ScenarioRequest,
        error: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.to_string(),
            method: request.method,
            description: description.to_string(),
            request,
            status: None,
            mismatches: Vec::new(),
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.error.is_some() {
            Outcome::Errored
        } else if self.mismatches.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed
        }
    }

    /// `"GET /pets/{id}: description"`
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} {}: {}",
            self.method.as_str().to_uppercase(),
            self.uri,
            self.description
        )
    }
}

/// All results of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SuiteReport {
    pub results: Vec<ScenarioResult>,
    /// Execution halted at the first failure
    #[serde(default)]
    pub stopped_early: bool,
}

impl SuiteReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(Outcome::Passed)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }

    #[must_use]
    pub fn errored(&self) -> usize {
        self.count(Outcome::Errored)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome() == outcome).count()
    }

    /// Results that did not pass, in run order.
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results
            .iter()
            .filter(|r| r.outcome() != Outcome::Passed)
    }

    /// PASS requires at least one scenario and every scenario passing.
    ///
    /// Exit codes: 0 pass, 1 any mismatch, 2 transport errors only,
    /// 3 nothing was run.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        let (total, failed, errored) = (self.total(), self.failed(), self.errored());

        let (status, exit_code) = if total == 0 {
            (VerdictStatus::Fail, 3)
        } else if failed > 0 {
            (VerdictStatus::Fail, 1)
        } else if errored > 0 {
            (VerdictStatus::Fail, 2)
        } else {
            (VerdictStatus::Pass, 0)
        };

        let reason = if status == VerdictStatus::Pass {
            "All scenarios passed".to_string()
        } else if total == 0 {
            "No scenarios were run".to_string()
        } else {
            let mut parts = Vec::new();
            if failed > 0 {
                let mismatches: usize = self.results.iter().map(|r| r.mismatches.len()).sum();
                parts.push(format!("{failed} failed ({mismatches} mismatches)"));
            }
            if errored > 0 {
                parts.push(format!("{errored} errors (connection/transport)"));
            }
            parts.join("; ")
        };

        Verdict {
            status,
            exit_code,
            reason,
        }
    }
}

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
