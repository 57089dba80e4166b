//! RPC outcome taxonomy.
//!
//! Outcomes travel as HTTP status codes; `0` is the client-side sentinel for
//! "no connection was established at all".

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// No connection (client-side sentinel, status 0).
    #[error("no connection")]
    NoConn,

    /// Request timed out, after retries where applicable (408).
    #[error("timeout")]
    Timeout,

    /// The peer could not decode the request (400).
    #[error("request decode failed")]
    ReqErr,

    /// The response could not be encoded or decoded (500).
    #[error("response encode/decode failed")]
    RespErr,

    /// Unauthorized (401).
    #[error("unauthorized")]
    NotAuth,

    /// Unknown endpoint (404).
    #[error("not found")]
    NotExist,

    /// Any other non-200 status, surfaced verbatim.
    #[error("http status {0}")]
    Status(u16),
}

impl RpcError {
    pub fn status(self) -> u16 {
        match self {
            RpcError::NoConn => 0,
            RpcError::Timeout => 408,
            RpcError::ReqErr => 400,
            RpcError::RespErr => 500,
            RpcError::NotAuth => 401,
            RpcError::NotExist => 404,
            RpcError::Status(code) => code,
        }
    }

    pub fn from_status(code: u16) -> Self {
        match code {
            0 => RpcError::NoConn,
            408 => RpcError::Timeout,
            400 => RpcError::ReqErr,
            500 => RpcError::RespErr,
            401 => RpcError::NotAuth,
            404 => RpcError::NotExist,
            other => RpcError::Status(other),
        }
    }
}
