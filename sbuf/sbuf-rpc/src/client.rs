//! Retrying RPC client.
//!
//! Headers are per-instance state; configure them before sharing the client
//! across threads. Retries back off linearly (`i` retry units before attempt
//! `i + 1`) and cooperate with a caller-supplied [`CancelToken`]: a firing
//! token turns the call into an immediate `Timeout`, whether it fires during
//! the backoff sleep or while a request is in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use sbuf_core::{Api, Schema};
use sbuf_wire::{Value, decode, encode_args};

use crate::cancel::CancelToken;
use crate::error::RpcError;
use crate::transport::{Transport, TransportError, TransportResponse, UreqTransport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How often an in-flight request checks the cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(10);

pub struct Client {
    pub base_url: String,
    /// Additional attempts after the first; 3 means up to 4 requests.
    pub retries: u32,
    /// Unit of the linear backoff between attempts.
    pub retry_unit: Duration,
    headers: HashMap<String, String>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Box::new(UreqTransport::new(DEFAULT_TIMEOUT)))
    }

    pub fn with_transport(base_url: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            retries: 3,
            retry_unit: Duration::from_secs(1),
            headers: HashMap::new(),
            transport: Arc::from(transport),
        }
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn remove_header(&mut self, key: &str) {
        self.headers.remove(key);
    }

    pub fn set_authorization(&mut self, token: &str) {
        self.set_header("Authorization", format!("Bearer {token}"));
    }

    pub fn authorization(&self) -> Option<&str> {
        self.header("Authorization")
    }

    pub fn remove_authorization(&mut self) {
        self.remove_header("Authorization");
    }

    pub fn is_authorized(&self) -> bool {
        self.authorization().is_some_and(|v| !v.is_empty())
    }

    /// POST `body` to `path` and return the response body on a 200.
    ///
    /// Retriable outcomes (transport timeout, transport I/O failure, HTTP
    /// 408) are retried up to `retries` times; every other non-200 status
    /// maps verbatim onto [`RpcError`].
    pub fn call(
        &self,
        cancel: &CancelToken,
        path: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, RpcError> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 0..=self.retries {
            if attempt > 0 && cancel.sleep(self.retry_unit * attempt) {
                return Err(RpcError::Timeout);
            }
            if cancel.is_cancelled() {
                return Err(RpcError::Timeout);
            }

            let Some(outcome) = self.post_racing_cancel(cancel, &url, body) else {
                return Err(RpcError::Timeout);
            };

            let last = attempt == self.retries;
            match outcome {
                Ok(response) if response.status == 200 => return Ok(response.body),
                Ok(response) if response.status == 408 => {
                    if last {
                        return Err(RpcError::Timeout);
                    }
                }
                Ok(response) => return Err(RpcError::from_status(response.status)),
                Err(TransportError::Timeout) => {
                    if last {
                        return Err(RpcError::Timeout);
                    }
                }
                Err(TransportError::Io(_)) => {
                    if last {
                        return Err(RpcError::NoConn);
                    }
                }
            }
        }
        Err(RpcError::NoConn)
    }

    /// Run the blocking transport call on a worker thread and poll the
    /// cancel token while it is in flight, in the same slices as
    /// [`CancelToken::sleep`]. Returns `None` once the token fires; the
    /// abandoned request finishes in the background and its late send is
    /// dropped.
    fn post_racing_cancel(
        &self,
        cancel: &CancelToken,
        url: &str,
        body: &[u8],
    ) -> Option<Result<TransportResponse, TransportError>> {
        let (tx, rx) = mpsc::channel();
        let transport = Arc::clone(&self.transport);
        let url = url.to_string();
        let headers = self.headers.clone();
        let body = body.to_vec();
        thread::spawn(move || {
            let _ = tx.send(transport.post(&url, &headers, &body));
        });

        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(outcome) => return Some(outcome),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Some(Err(TransportError::Io(
                        "transport worker exited without a response".to_string(),
                    )));
                }
            }
        }
    }
}

/// Invoke `api` through `client`: arguments encode back-to-back in
/// declaration order, the result decodes from the response body unless the
/// API returns `nil`.
pub fn call_api(
    client: &Client,
    cancel: &CancelToken,
    schema: &Schema,
    api: &Api,
    args: &[Value],
) -> Result<Option<Value>, RpcError> {
    let body = encode_args(schema, &api.args, args).map_err(|_| RpcError::ReqErr)?;
    let response = client.call(cancel, &api.path(), &body)?;
    if api.result.is_nil() {
        return Ok(None);
    }
    let result = decode(schema, &api.result, &response).map_err(|_| RpcError::RespErr)?;
    Ok(Some(result))
}
