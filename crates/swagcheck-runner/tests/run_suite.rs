//! Suite execution with a scripted dispatcher and a real local server

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use swagcheck_core::{
    ActualResponse, Config, HttpMethod, MismatchKind, Outcome, ScenarioRequest, VerdictStatus,
};
use swagcheck_runner::{DispatchError, Dispatcher, HttpDispatcher, SuiteRunner};

const PETSTORE: &str = include_str!("../../swagcheck-core/tests/fixtures/petstore.json");

/// Replies from a script keyed by "METHOD uri", recording every request.
struct ScriptedDispatcher {
    replies: BTreeMap<String, Result<ActualResponse, String>>,
    seen: RefCell<Vec<String>>,
}

impl ScriptedDispatcher {
    fn new() -> Self {
        Self {
            replies: BTreeMap::new(),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn reply(mut self, key: &str, status: u16, body: Option<Value>) -> Self {
        let response = ActualResponse {
            status,
            headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
            body,
        };
        self.replies.insert(key.to_string(), Ok(response));
        self
    }

    fn fail(mut self, key: &str, message: &str) -> Self {
        self.replies.insert(key.to_string(), Err(message.to_string()));
        self
    }
}

impl Dispatcher for ScriptedDispatcher {
    fn dispatch(&self, request: &ScenarioRequest) -> Result<ActualResponse, DispatchError> {
        let key = format!("{} {}", request.method.as_str().to_uppercase(), request.url());
        self.seen.borrow_mut().push(key.clone());
        match self.replies.get(&key) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(DispatchError::Transport(message.clone())),
            None => Ok(ActualResponse {
                status: 404,
                ..ActualResponse::default()
            }),
        }
    }
}

fn runner_for(dir: &Path) -> SuiteRunner {
    let spec = dir.join("swagger.json");
    std::fs::write(&spec, PETSTORE).unwrap();
    let config = Config {
        spec,
        variables: BTreeMap::from([
            ("petId".to_string(), json!(101)),
            ("petName".to_string(), json!("patrick")),
        ]),
        ..Config::default()
    };
    SuiteRunner::from_config(&config)
}

fn healthy() -> ScriptedDispatcher {
    let pet = json!({"id": 101, "name": "patrick", "owner": {"name": "spongebob"}});
    ScriptedDispatcher::new()
        .reply(
            "GET http://petstore.swagger.io/pets?tags=dogs&tags=cats&limit=50",
            200,
            Some(json!([pet])),
        )
        .reply("GET http://petstore.swagger.io/pets", 200, Some(json!([])))
        .reply(
            "POST http://petstore.swagger.io/pets",
            200,
            Some(json!({"id": 1, "name": "garythesnail", "owner": {"name": "spongebob"}})),
        )
        .reply("GET http://petstore.swagger.io/pets/101", 200, Some(pet))
        .reply("DELETE http://petstore.swagger.io/pets/101", 204, None)
}

#[test]
fn all_scenarios_pass() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path());
    let set = runner.synthesize().unwrap();

    let dispatcher = healthy();
    let report = runner.run_with(&set, &dispatcher);

    assert_eq!(report.total(), 6);
    assert_eq!(report.passed(), 6, "{:#?}", report.failures().collect::<Vec<_>>());
    let verdict = report.verdict();
    assert_eq!(verdict.status, VerdictStatus::Pass);
    assert_eq!(verdict.exit_code, 0);
    assert_eq!(dispatcher.seen.borrow().len(), 6);
}

#[test]
fn mismatches_fail_the_suite() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path());
    let set = runner.synthesize().unwrap();

    let dispatcher = healthy().reply(
        "GET http://petstore.swagger.io/pets/101",
        200,
        Some(json!({"id": "101"})),
    );
    let report = runner.run_with(&set, &dispatcher);

    assert_eq!(report.failed(), 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.method, HttpMethod::Get);
    assert_eq!(failure.uri, "/pets/{id}");
    let kinds: Vec<MismatchKind> = failure.mismatches.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MismatchKind::Type, MismatchKind::Required, MismatchKind::Required]
    );
    assert_eq!(report.verdict().exit_code, 1);
}

#[test]
fn transport_errors_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path());
    let set = runner.synthesize().unwrap();

    let dispatcher = healthy().fail("DELETE http://petstore.swagger.io/pets/101", "connection reset");
    let report = runner.run_with(&set, &dispatcher);

    assert_eq!(report.errored(), 1);
    let errored = report.failures().next().unwrap();
    assert_eq!(errored.outcome(), Outcome::Errored);
    assert_eq!(errored.error.as_deref(), Some("request failed: connection reset"));
    assert_eq!(report.verdict().exit_code, 2);
}

#[test]
fn stop_on_failure_halts() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path()).with_stop_on_failure(true);
    let set = runner.synthesize().unwrap();

    let dispatcher = ScriptedDispatcher::new();
    let report = runner.run_with(&set, &dispatcher);

    assert!(report.stopped_early);
    assert_eq!(report.total(), 1);
    assert_eq!(dispatcher.seen.borrow().len(), 1);
}

#[test]
fn filter_selects_operations() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(dir.path()).with_filter(Some("DELETE".into()));
    let set = runner.synthesize().unwrap();

    let report = runner.run_with(&set, &healthy());
    assert_eq!(report.total(), 1);
    assert_eq!(report.results[0].method, HttpMethod::Delete);
    assert_eq!(report.results[0].status, Some(204));
}

/// Accept one connection, capture the raw request, answer with `response`.
fn one_shot_server(response: String) -> (String, std::thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).unwrap();
            raw.extend_from_slice(&buf[..n]);
            if n == 0 || request_complete(&raw) {
                break;
            }
        }
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&raw).into_owned()
    });
    (addr, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    body.len() >= length
}

#[test]
fn http_dispatcher_sends_scenario_request() {
    let body = r#"{"id":7,"name":"patrick"}"#;
    let (addr, server) = one_shot_server(format!(
        "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nX-Rate-Limit: 5\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ));

    let request = ScenarioRequest {
        method: HttpMethod::Post,
        uri: format!("http://{addr}/pets"),
        path: Some(serde_json::Map::new()),
        query: json!({"tags": ["a", "b"]}).as_object().cloned(),
        body: Some(json!({"name": "patrick"})),
        headers: json!({"content-type": "application/json", "x-trace": 42})
            .as_object()
            .cloned(),
    };

    let dispatcher = HttpDispatcher::new(Duration::from_secs(5)).unwrap();
    let actual = dispatcher.dispatch(&request).unwrap();
    let raw = server.join().unwrap();

    assert!(raw.starts_with("POST /pets?tags=a&tags=b HTTP/1.1"), "{raw}");
    assert!(raw.contains("x-trace: 42"), "{raw}");
    assert!(raw.ends_with(r#"{"name":"patrick"}"#), "{raw}");

    assert_eq!(actual.status, 201);
    assert_eq!(actual.header("X-RATE-LIMIT"), Some("5"));
    assert_eq!(actual.body, Some(json!({"id": 7, "name": "patrick"})));
}

#[test]
fn http_dispatcher_reports_connection_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let request = ScenarioRequest {
        method: HttpMethod::Get,
        uri: format!("http://{addr}/pets"),
        path: None,
        query: None,
        body: None,
        headers: None,
    };
    let dispatcher = HttpDispatcher::new(Duration::from_secs(2)).unwrap();
    let err = dispatcher.dispatch(&request).unwrap_err();
    assert!(matches!(err, DispatchError::Transport(_)));
}
