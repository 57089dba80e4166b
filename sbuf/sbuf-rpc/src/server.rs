//! Server-side request dispatch.
//!
//! The router is transport-agnostic: a host HTTP server feeds it the request
//! path and raw body and writes back the returned status and bytes. Handlers
//! own their decoded request and encoded response; nothing is shared between
//! concurrent dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use sbuf_core::{Api, Schema};
use sbuf_wire::{Value, decode_args, encode};

use crate::error::RpcError;

/// What the host server should write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    fn error(err: RpcError) -> Self {
        Self {
            status: err.status(),
            body: Vec::new(),
        }
    }
}

pub type Handler = Box<dyn Fn(&[u8]) -> Result<Vec<u8>, RpcError> + Send + Sync>;

/// Wraps a handler with cross-cutting behavior; composed outermost-first.
pub type Middleware = Box<dyn Fn(Handler) -> Handler>;

pub fn compose(middlewares: Vec<Middleware>, handler: Handler) -> Handler {
    middlewares
        .into_iter()
        .rev()
        .fold(handler, |inner, middleware| middleware(inner))
}

/// Maps `/<full.api.name>` paths to handlers.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the API's path (dots preserved).
    pub fn register(&mut self, api_name: &str, handler: Handler) {
        self.routes.insert(format!("/{api_name}"), handler);
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn dispatch(&self, path: &str, body: &[u8]) -> Response {
        let Some(handler) = self.routes.get(path) else {
            return Response::error(RpcError::NotExist);
        };
        match handler(body) {
            Ok(body) => Response::ok(body),
            Err(err) => Response::error(err),
        }
    }
}

/// Adapt a typed-logic function into a byte handler for one API.
///
/// Request framing errors map to 400 on the caller, response encoding
/// failures to 500; logic errors pass through with their own status. A
/// logic function that returns no value for a non-`nil` API is a 500.
pub fn api_handler<F>(schema: Arc<Schema>, api: Api, logic: F) -> Handler
where
    F: Fn(Vec<Value>) -> Result<Option<Value>, RpcError> + Send + Sync + 'static,
{
    Box::new(move |body| {
        let args = decode_args(&schema, &api.args, body).map_err(|_| RpcError::ReqErr)?;
        let result = logic(args)?;
        match result {
            Some(value) if !api.result.is_nil() => encode(&schema, &api.result, &value)
                .map(|b| b.to_vec())
                .map_err(|_| RpcError::RespErr),
            // The logic function violated the API's declared result type;
            // an empty 200 here would be indistinguishable from a nil API.
            None if !api.result.is_nil() => Err(RpcError::RespErr),
            _ => Ok(Vec::new()),
        }
    })
}
