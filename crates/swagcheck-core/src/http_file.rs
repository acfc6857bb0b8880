//! `.http` reproduction files for scenarios that did not pass

use crate::report::ScenarioResult;
use crate::scenario::ScenarioRequest;

/// Generate .http file content from non-passing results
#[must_use]
pub fn to_http_file(results: &[&ScenarioResult]) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "# Auto-generated reproduction cases ({} scenarios)",
        results.len()
    ));
    lines.push(String::new());

    for (idx, result) in results.iter().enumerate() {
        lines.push(format!("### [{idx}] {} - {}", result.outcome(), result.label()));
        if let Some(error) = &result.error {
            lines.push(format!("# error: {error}"));
        }
        for mismatch in &result.mismatches {
            lines.push(format!("# {mismatch}"));
        }
        lines.push(request_to_http(&result.request));
        lines.push(String::new());
        lines.push("###".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Generate a single request as .http format
#[must_use]
pub fn request_to_http(request: &ScenarioRequest) -> String {
    let mut lines = vec![format!(
        "{} {}",
        request.method.as_str().to_uppercase(),
        request.url()
    )];

    for (key, value) in request.header_pairs() {
        lines.push(format!("{key}: {value}"));
    }

    if let Some(body) = &request.body {
        lines.push(String::new());
        lines.push(body.to_string());
    }

    lines.join("\n")
}
