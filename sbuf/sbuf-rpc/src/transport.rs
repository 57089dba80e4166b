//! Pluggable HTTP POST transport.
//!
//! The client's retry and cancellation logic is transport-agnostic; the
//! default implementation rides on `ureq`. Tests swap in scripted
//! transports.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

/// A completed HTTP exchange. Non-200 statuses are data, not errors; only
/// failures to complete the exchange surface as [`TransportError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request or response timed out on the socket.
    #[error("transport timeout")]
    Timeout,

    /// Any other I/O failure (refused connection, reset, DNS, ...).
    #[error("transport i/o failure: {0}")]
    Io(String),
}

pub trait Transport: Send + Sync {
    fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<TransportResponse, TransportError>;
}

/// Default transport backed by a `ureq` agent with a fixed per-request
/// timeout.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Transport for UreqTransport {
    fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self.agent.post(url);
        for (key, value) in headers {
            request = request.set(key, value);
        }

        let response = match request.send_bytes(body) {
            Ok(response) => response,
            // A status outcome is still a completed exchange.
            Err(ureq::Error::Status(status, response)) => {
                let body = read_body(response)?;
                return Ok(TransportResponse { status, body });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(classify_transport(&transport));
            }
        };

        let status = response.status();
        let body = read_body(response)?;
        Ok(TransportResponse { status, body })
    }
}

fn read_body(response: ureq::Response) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| io_to_transport(&e))?;
    Ok(body)
}

fn classify_transport(transport: &ureq::Transport) -> TransportError {
    let mut source = std::error::Error::source(transport);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return io_to_transport(io);
        }
        source = err.source();
    }
    TransportError::Io(transport.to_string())
}

fn io_to_transport(err: &std::io::Error) -> TransportError {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
        _ => TransportError::Io(err.to_string()),
    }
}
