//! Deferred HTTP requests with typed results and sequential chaining.
//!
//! # Overview
//! A `Request` describes one network call: URL, method, JSON payload,
//! headers and a decode function. `start` assembles the message, hands it to
//! a `Transport` and delivers the decoded `Result` to a callback. `concat`
//! chains two requests sharing an error type; the second only runs if the
//! first succeeds.
//!
//! # Design
//! - Requests are immutable values; all in-flight state lives in the transport.
//! - The transport is a trait object shared by reference, so tests can swap in
//!   a recording transport and production code can use `UreqTransport`.
//! - Callbacks are `FnOnce`, so a result is delivered at most once.
//! - Payloads are JSON objects of `serde_json::Value`, which always encode;
//!   typed data is serialized at construction time instead.

pub mod concat;
pub mod decode;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;

#[cfg(test)]
mod testing;

pub use concat::ConcatRequest;
pub use error::{ApiError, RequestError, TransportError};
pub use http::{HttpMethod, HttpRequest, Payload, RawResponse, ResponseMeta};
pub use request::{Callback, Decoder, Inspector, Request, Requestable};
pub use transport::{Completion, Transport, UreqTransport};
