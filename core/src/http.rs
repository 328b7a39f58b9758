//! HTTP message types exchanged with the transport.
//!
//! # Design
//! These types describe the outbound message and the raw outcome of a call as
//! plain data. `Request` assembles an `HttpRequest` lazily at start time and
//! hands it to a `Transport`; the transport answers with a `RawResponse` that
//! the endpoint's decode function turns into a typed result.
//!
//! All fields use owned types (`String`, `Vec`) so messages can be moved onto
//! whatever thread the transport completes on.

use std::fmt;

use crate::error::TransportError;

/// JSON object sent as the request body.
pub type Payload = serde_json::Map<String, serde_json::Value>;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method for a request.
///
/// Any method token can be represented; tokens without a dedicated variant are
/// kept verbatim in `Custom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Custom(token) => token,
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(token: &str) -> Self {
        match token {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            other => HttpMethod::Custom(other.to_string()),
        }
    }
}

impl From<String> for HttpMethod {
    fn from(token: String) -> Self {
        HttpMethod::from(token.as_str())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound HTTP message described as plain data.
///
/// Built by `Request::message`. The transport is responsible for executing it
/// against the network and completing with the corresponding `RawResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing value whose name matches
    /// case-insensitively. The original name's position is kept.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(entry) => {
                entry.0 = name.to_string();
                entry.1 = value.to_string();
            }
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }
}

/// Status line and headers of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

/// The untyped outcome of one HTTP call.
///
/// The expected shape is either `error` set, or `response` (and usually
/// `data`) set. Nothing enforces this; decoders must cope with any mix.
#[derive(Debug, Default)]
pub struct RawResponse {
    pub data: Option<Vec<u8>>,
    pub response: Option<ResponseMeta>,
    pub error: Option<TransportError>,
}

impl RawResponse {
    pub fn success(response: ResponseMeta, data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(error: TransportError) -> Self {
        Self {
            data: None,
            response: None,
            error: Some(error),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|meta| meta.status)
    }

    /// Body decoded as UTF-8, lossy. Empty when there is no body.
    pub fn text(&self) -> String {
        self.data
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}
