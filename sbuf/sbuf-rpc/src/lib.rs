//! RPC runtime for sbuf schemas.
//!
//! The compiler pipeline is synchronous and single-threaded; this crate is
//! the concurrent half of the system. Servers dispatch statelessly per
//! request, clients retry with linear backoff under a cooperative
//! cancellation token, and every buffer is owned per call.

mod cancel;
mod client;
mod error;
mod server;
mod transport;

pub use cancel::CancelToken;
pub use client::{Client, call_api};
pub use error::RpcError;
pub use server::{Handler, Middleware, Response, Router, api_handler, compose};
pub use transport::{Transport, TransportError, TransportResponse, UreqTransport};
