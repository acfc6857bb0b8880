//! Sending scenario requests

use std::collections::BTreeMap;
use std::time::Duration;

use swagcheck_core::{ActualResponse, ScenarioRequest};

/// Issues one request and reports what came back.
///
/// Any HTTP status is a response; only transport failures are errors.
pub trait Dispatcher {
    /// # Errors
    ///
    /// Returns error when no response could be obtained.
    fn dispatch(&self, request: &ScenarioRequest) -> Result<ActualResponse, DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("cannot build HTTP client: {0}")]
    Client(String),
    #[error("invalid HTTP method '{0}'")]
    Method(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("cannot read response body: {0}")]
    Body(String),
}

/// Blocking reqwest dispatcher
pub struct HttpDispatcher {
    client: reqwest::blocking::Client,
}

impl HttpDispatcher {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(&self, request: &ScenarioRequest) -> Result<ActualResponse, DispatchError> {
        let name = request.method.as_str().to_ascii_uppercase();
        let method = reqwest::Method::from_bytes(name.as_bytes())
            .map_err(|_| DispatchError::Method(name.clone()))?;

        let mut req = self.client.request(method, &request.uri);
        for (k, v) in request.header_pairs() {
            // Header values that are invalid in HTTP never reach the server.
            if reqwest::header::HeaderValue::from_str(&v).is_ok() {
                req = req.header(k, v);
            } else {
                tracing::warn!(header = %k, "skipping header with invalid value");
            }
        }
        let query = request.query_pairs();
        if !query.is_empty() {
            req = req.query(&query);
        }
        if let Some(body) = &request.body {
            req = req.body(body.to_string());
        }

        let resp = req
            .send()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers = collect_headers(resp.headers());
        let text = resp
            .text()
            .map_err(|e| DispatchError::Body(e.to_string()))?;

        Ok(ActualResponse {
            status,
            headers,
            body: parse_body(&text),
        })
    }
}

/// Lowercased names; repeated headers joined with `", "`.
fn collect_headers(map: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

/// JSON when it parses, the raw text otherwise, `None` when empty.
fn parse_body(text: &str) -> Option<serde_json::Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    )
}
