//! Ready-made decode functions for JSON endpoints.
//!
//! Endpoints may supply any decoder; these cover the common case of "expect a
//! status, parse the body as JSON" with `ApiError` as the error type.

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::RawResponse;
use crate::request::Callback;

/// Decoder expecting `expected` and a JSON body of type `T`.
pub fn json<T>(expected: u16) -> impl Fn(RawResponse, Callback<T, ApiError>) + Send + Sync + 'static
where
    T: DeserializeOwned + Send + 'static,
{
    move |raw: RawResponse, callback: Callback<T, ApiError>| callback(parse_json(raw, expected))
}

/// Decoder expecting `expected` and ignoring the body.
pub fn empty(expected: u16) -> impl Fn(RawResponse, Callback<(), ApiError>) + Send + Sync + 'static {
    move |raw: RawResponse, callback: Callback<(), ApiError>| callback(parse_empty(raw, expected))
}

/// Decoder accepting any 2xx status; the body becomes a `serde_json::Value`
/// (`Null` when empty).
pub fn value() -> impl Fn(RawResponse, Callback<serde_json::Value, ApiError>) + Send + Sync + 'static {
    |raw: RawResponse, callback: Callback<serde_json::Value, ApiError>| callback(parse_value(raw))
}

pub fn parse_json<T: DeserializeOwned>(raw: RawResponse, expected: u16) -> Result<T, ApiError> {
    let data = check_status(raw, |status| status == expected)?;
    serde_json::from_slice(&data).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

pub fn parse_empty(raw: RawResponse, expected: u16) -> Result<(), ApiError> {
    check_status(raw, |status| status == expected)?;
    Ok(())
}

pub fn parse_value(raw: RawResponse) -> Result<serde_json::Value, ApiError> {
    let data = check_status(raw, |status| (200..300).contains(&status))?;
    if data.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&data).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map transport errors and unexpected statuses to the appropriate `ApiError`
/// variant, returning the body otherwise.
fn check_status(
    raw: RawResponse,
    accept: impl Fn(u16) -> bool,
) -> Result<Vec<u8>, ApiError> {
    if let Some(error) = raw.error {
        return Err(ApiError::Transport(error));
    }
    let meta = raw.response.ok_or(ApiError::MissingResponse)?;
    let data = raw.data.unwrap_or_default();
    if accept(meta.status) {
        return Ok(data);
    }
    if meta.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: meta.status,
        body: String::from_utf8_lossy(&data).into_owned(),
    })
}
