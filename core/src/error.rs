//! Error types for requests, transports and the bundled decoders.
//!
//! # Design
//! `TransportError` is what a transport reports when a call could not
//! complete; it travels inside `RawResponse` and is never raised by the core
//! itself. `RequestError` covers construction-time failures. `ApiError` is the
//! error type of the decoders in `decode`; endpoints with their own error type
//! are free to ignore it.

use thiserror::Error;

/// The underlying call could not complete (connect, DNS, TLS, I/O).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport failed: {0}")]
    Failed(String),

    #[error("invalid request message: {0}")]
    InvalidMessage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Io(io) => TransportError::Io(io),
            other => TransportError::Failed(other.to_string()),
        }
    }
}

/// Errors raised while constructing a `Request`.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The payload serialized to something other than a JSON object.
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Errors produced by the decoders in `decode`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport could not complete the call.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The transport completed without an error but also without a status.
    #[error("no response received")]
    MissingResponse,

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned an unexpected status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),
}
