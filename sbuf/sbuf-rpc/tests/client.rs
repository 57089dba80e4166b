use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sbuf_rpc::{
    CancelToken, Client, RpcError, Transport, TransportError, TransportResponse, call_api,
};
use sbuf_wire::Value;

// ── scripted transport ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Recorded {
    url: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

/// Plays back a fixed script of outcomes and records every request it sees.
struct ScriptedTransport {
    script: Mutex<Vec<Result<TransportResponse, TransportError>>>,
    seen: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn ok(status: u16, body: &[u8]) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl Transport for ScriptedTransport {
    fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<TransportResponse, TransportError> {
        self.seen.lock().unwrap().push(Recorded {
            url: url.to_string(),
            headers: headers.clone(),
            body: body.to_vec(),
        });
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(TransportError::Io("script exhausted".to_string()));
        }
        script.remove(0)
    }
}

fn client_with_script(
    script: Vec<Result<TransportResponse, TransportError>>,
) -> (Client, &'static ScriptedTransport) {
    let transport: &'static ScriptedTransport = Box::leak(Box::new(ScriptedTransport::new(script)));
    let mut client = Client::with_transport("http://svc", Box::new(StaticRef(transport)));
    client.retry_unit = Duration::from_millis(1);
    (client, transport)
}

/// Lets a leaked transport be observed after the client takes "ownership".
struct StaticRef(&'static ScriptedTransport);

impl Transport for StaticRef {
    fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<TransportResponse, TransportError> {
        self.0.post(url, headers, body)
    }
}

// ── call ─────────────────────────────────────────────────────────────────────

#[test]
fn successful_call_returns_the_body() {
    let (client, transport) = client_with_script(vec![ScriptedTransport::ok(200, b"\x2A")]);
    let body = client
        .call(&CancelToken::new(), "/get_count", b"\x05")
        .unwrap();
    assert_eq!(body, b"\x2A");

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].url, "http://svc/get_count");
    assert_eq!(seen[0].body, b"\x05");
}

#[test]
fn http_408_retries_until_success() {
    let (client, transport) = client_with_script(vec![
        ScriptedTransport::ok(408, b""),
        ScriptedTransport::ok(408, b""),
        ScriptedTransport::ok(200, b"ok"),
    ]);
    let body = client.call(&CancelToken::new(), "/x", b"").unwrap();
    assert_eq!(body, b"ok");
    assert_eq!(transport.seen.lock().unwrap().len(), 3);
}

#[test]
fn io_failures_are_retriable() {
    let (client, transport) = client_with_script(vec![
        Err(TransportError::Io("connection refused".to_string())),
        ScriptedTransport::ok(200, b"ok"),
    ]);
    let body = client.call(&CancelToken::new(), "/x", b"").unwrap();
    assert_eq!(body, b"ok");
    assert_eq!(transport.seen.lock().unwrap().len(), 2);
}

#[test]
fn io_failure_on_final_attempt_is_no_conn() {
    let (client, transport) = client_with_script(vec![
        Err(TransportError::Io("refused".to_string())),
        Err(TransportError::Io("refused".to_string())),
        Err(TransportError::Io("refused".to_string())),
        Err(TransportError::Io("refused".to_string())),
    ]);
    let err = client.call(&CancelToken::new(), "/x", b"").unwrap_err();
    assert_eq!(err, RpcError::NoConn);
    // retries = 3 means four attempts in total.
    assert_eq!(transport.seen.lock().unwrap().len(), 4);
}

#[test]
fn timeout_on_final_attempt_is_timeout() {
    let (client, _) = client_with_script(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
    ]);
    let err = client.call(&CancelToken::new(), "/x", b"").unwrap_err();
    assert_eq!(err, RpcError::Timeout);
}

#[test]
fn non_retriable_statuses_surface_verbatim_without_retry() {
    let (client, transport) = client_with_script(vec![ScriptedTransport::ok(401, b"")]);
    let err = client.call(&CancelToken::new(), "/x", b"").unwrap_err();
    assert_eq!(err, RpcError::NotAuth);
    assert_eq!(transport.seen.lock().unwrap().len(), 1);

    let (client, _) = client_with_script(vec![ScriptedTransport::ok(418, b"")]);
    let err = client.call(&CancelToken::new(), "/x", b"").unwrap_err();
    assert_eq!(err, RpcError::Status(418));
    assert_eq!(err.status(), 418);
}

#[test]
fn cancellation_during_backoff_returns_timeout_immediately() {
    let (mut client, _) = client_with_script(vec![
        ScriptedTransport::ok(408, b""),
        ScriptedTransport::ok(200, b"late"),
    ]);
    client.retry_unit = Duration::from_secs(30);

    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let started = Instant::now();
    let err = client.call(&cancel, "/x", b"").unwrap_err();
    handle.join().unwrap();

    assert_eq!(err, RpcError::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancellation_during_an_in_flight_request_returns_timeout_immediately() {
    // A transport that hangs well past any test budget.
    struct StuckTransport;

    impl Transport for StuckTransport {
        fn post(
            &self,
            _url: &str,
            _headers: &HashMap<String, String>,
            _body: &[u8],
        ) -> Result<TransportResponse, TransportError> {
            std::thread::sleep(Duration::from_secs(30));
            Ok(TransportResponse {
                status: 200,
                body: b"late".to_vec(),
            })
        }
    }

    let client = Client::with_transport("http://svc", Box::new(StuckTransport));
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let started = Instant::now();
    let err = client.call(&cancel, "/x", b"").unwrap_err();
    handle.join().unwrap();

    assert_eq!(err, RpcError::Timeout);
    // The call must not wait out the transport's 30s hang.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancelled_token_short_circuits_before_any_request() {
    let (client, transport) = client_with_script(vec![ScriptedTransport::ok(200, b"never")]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = client.call(&cancel, "/x", b"").unwrap_err();
    assert_eq!(err, RpcError::Timeout);
    assert!(transport.seen.lock().unwrap().is_empty());
}

#[test]
fn headers_and_authorization_ride_every_request() {
    let (mut client, transport) = client_with_script(vec![ScriptedTransport::ok(200, b"")]);
    client.set_header("X-Trace", "abc");
    client.set_authorization("tok123");
    assert!(client.is_authorized());
    assert_eq!(client.authorization(), Some("Bearer tok123"));

    client.call(&CancelToken::new(), "/x", b"").unwrap();
    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].headers["X-Trace"], "abc");
    assert_eq!(seen[0].headers["Authorization"], "Bearer tok123");
    drop(seen);

    client.remove_authorization();
    assert!(!client.is_authorized());
}

// ── call_api framing ─────────────────────────────────────────────────────────

#[test]
fn call_api_round_trips_the_get_count_scenario() {
    let schema = sbuf_schema::compile("get_count(page u8) => u8").unwrap();
    let api = schema.apis[0].clone();

    let (client, transport) = client_with_script(vec![ScriptedTransport::ok(200, b"\x2A")]);
    let result = call_api(
        &client,
        &CancelToken::new(),
        &schema,
        &api,
        &[Value::U8(5)],
    )
    .unwrap();
    assert_eq!(result, Some(Value::U8(42)));

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0].url, "http://svc/get_count");
    assert_eq!(seen[0].body, b"\x05");
}

#[test]
fn call_api_with_nil_result_returns_none() {
    let schema = sbuf_schema::compile("user.drop(id u32) => nil").unwrap();
    let api = schema.apis[0].clone();

    let (client, transport) = client_with_script(vec![ScriptedTransport::ok(200, b"")]);
    let result = call_api(
        &client,
        &CancelToken::new(),
        &schema,
        &api,
        &[Value::U32(7)],
    )
    .unwrap();
    assert_eq!(result, None);
    assert_eq!(
        transport.seen.lock().unwrap()[0].url,
        "http://svc/user.drop"
    );
}

#[test]
fn undecodable_response_is_resp_err() {
    let schema = sbuf_schema::compile("get_count(page u8) => u32").unwrap();
    let api = schema.apis[0].clone();

    let (client, _) = client_with_script(vec![ScriptedTransport::ok(200, b"\x01")]);
    let err = call_api(&client, &CancelToken::new(), &schema, &api, &[Value::U8(1)]).unwrap_err();
    assert_eq!(err, RpcError::RespErr);
}

#[test]
fn unencodable_arguments_are_req_err_without_any_request() {
    let schema = sbuf_schema::compile("put(tags [text]) => nil").unwrap();
    let api = schema.apis[0].clone();

    let (client, transport) = client_with_script(vec![ScriptedTransport::ok(200, b"")]);
    let oversized = Value::List(vec![Value::text("x"); 256]);
    let err = call_api(&client, &CancelToken::new(), &schema, &api, &[oversized]).unwrap_err();
    assert_eq!(err, RpcError::ReqErr);
    assert!(transport.seen.lock().unwrap().is_empty());
}
