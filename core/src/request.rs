//! A deferred HTTP call and its typed result.
//!
//! # Design
//! `Request` is an immutable description: transport handle, URL, method,
//! payload, headers and a decode function. Nothing happens until `start`,
//! which assembles the outbound message, submits it, and routes the raw
//! outcome through the decode function into the caller's callback. A request
//! may be started any number of times; each start is an independent call.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::concat::ConcatRequest;
use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest, Payload, RawResponse, APPLICATION_JSON, CONTENT_TYPE};
use crate::transport::Transport;

/// Receives the result of a started request. `FnOnce`, so it fires at most once.
pub type Callback<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

/// Turns a raw response into a typed result and hands it to the callback.
///
/// A decoder should invoke the callback exactly once, synchronously or not.
pub type Decoder<T, E> = Arc<dyn Fn(RawResponse, Callback<T, E>) + Send + Sync + 'static>;

/// Observes every assembled message together with the payload it came from.
pub type Inspector = Arc<dyn Fn(&HttpRequest, &Payload) + Send + Sync + 'static>;

/// Anything that can be started with a callback.
pub trait Requestable {
    type Output: Send + 'static;
    type Error: Send + 'static;

    fn start<F>(&self, callback: F)
    where
        F: FnOnce(Result<Self::Output, Self::Error>) + Send + 'static;
}

/// A deferred network call producing `Result<T, E>`.
pub struct Request<T, E> {
    transport: Arc<dyn Transport>,
    url: String,
    method: HttpMethod,
    handle: Decoder<T, E>,
    payload: Payload,
    headers: Vec<(String, String)>,
    inspector: Option<Inspector>,
}

impl<T, E> Request<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<D>(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        method: impl Into<HttpMethod>,
        handle: D,
    ) -> Self
    where
        D: Fn(RawResponse, Callback<T, E>) + Send + Sync + 'static,
    {
        Self {
            transport,
            url: url.into(),
            method: method.into(),
            handle: Arc::new(handle),
            payload: Payload::new(),
            headers: Vec::new(),
            inspector: None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Serialize `value` into the payload at construction time.
    ///
    /// Fails if `value` does not serialize or is not a JSON object.
    pub fn with_serialized_payload<P: Serialize>(self, value: &P) -> Result<Self, RequestError> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(payload) => Ok(self.with_payload(payload)),
            other => Err(RequestError::NotAnObject(json_kind(&other))),
        }
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_inspector<I>(mut self, inspector: I) -> Self
    where
        I: Fn(&HttpRequest, &Payload) + Send + Sync + 'static,
    {
        self.inspector = Some(Arc::new(inspector));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Assemble the outbound message.
    ///
    /// The body is the JSON encoding of the payload, absent when the payload
    /// is empty. `Content-Type: application/json` is always set first; caller
    /// headers are applied afterwards in order and win on a name collision.
    pub fn message(&self) -> HttpRequest {
        let body = if self.payload.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(self.payload.clone()).to_string())
        };
        let mut message = HttpRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: Vec::with_capacity(self.headers.len() + 1),
            body,
        };
        message.set_header(CONTENT_TYPE, APPLICATION_JSON);
        for (name, value) in &self.headers {
            message.set_header(name, value);
        }
        message
    }

    /// Issue the call. Returns immediately; `callback` receives whatever the
    /// decode function produces once the transport completes.
    pub fn start<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let message = self.message();
        if let Some(inspector) = &self.inspector {
            inspector(&message, &self.payload);
        }

        let request_id = Uuid::new_v4();
        debug!(%request_id, method = %message.method, url = %message.url, "starting request");

        let handle = Arc::clone(&self.handle);
        let callback: Callback<T, E> = Box::new(callback);
        self.transport.submit(
            message,
            Box::new(move |raw: RawResponse| {
                match (&raw.error, raw.status()) {
                    (Some(error), _) => debug!(%request_id, %error, "request failed in transport"),
                    (None, Some(status)) => debug!(%request_id, status, "request completed"),
                    (None, None) => debug!(%request_id, "request completed without response"),
                }
                handle(raw, callback)
            }),
        );
    }

    /// Chain `other` after this request. Nothing is executed.
    pub fn concat<S>(&self, other: &Request<S, E>) -> ConcatRequest<T, S, E>
    where
        S: Send + 'static,
    {
        ConcatRequest::new(self.clone(), other.clone())
    }
}

impl<T, E> Requestable for Request<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    fn start<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        Request::start(self, callback)
    }
}

impl<T, E> Clone for Request<T, E> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            url: self.url.clone(),
            method: self.method.clone(),
            handle: Arc::clone(&self.handle),
            payload: self.payload.clone(),
            headers: self.headers.clone(),
            inspector: self.inspector.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Request<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("payload", &self.payload)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::http::ResponseMeta;
    use crate::testing::{RecordingTransport, Reply};

    const URL: &str = "https://samples.example.com/dbconnections/signup";

    fn status_decoder(raw: RawResponse, callback: Callback<u16, String>) {
        match (raw.error, raw.response) {
            (Some(error), _) => callback(Err(error.to_string())),
            (None, Some(meta)) => callback(Ok(meta.status)),
            (None, None) => callback(Err("no response".to_string())),
        }
    }

    fn request(transport: &Arc<RecordingTransport>, method: &str) -> Request<u16, String> {
        let transport: Arc<dyn Transport> = transport.clone();
        Request::new(transport, URL, method, status_decoder)
    }

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn get_without_payload_has_no_body() {
        let transport = Arc::new(RecordingTransport::new());
        let message = request(&transport, "GET").message();
        assert_eq!(message.method, HttpMethod::Get);
        assert_eq!(message.url, URL);
        assert!(message.body.is_none());
        assert_eq!(
            message.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn post_payload_is_json_encoded() {
        let transport = Arc::new(RecordingTransport::new());
        let message = request(&transport, "POST")
            .with_payload(payload(json!({"name": "a"})))
            .message();
        assert_eq!(message.method, HttpMethod::Post);
        let body: serde_json::Value = serde_json::from_str(message.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "a"}));
    }

    #[test]
    fn nested_payload_survives_encoding() {
        let transport = Arc::new(RecordingTransport::new());
        let original = json!({
            "email": "info@example.com",
            "user_metadata": {"first_name": "Ada", "tags": [1, 2, 3]},
            "verified": false,
            "connection": null,
        });
        let message = request(&transport, "POST")
            .with_payload(payload(original.clone()))
            .message();
        let body: serde_json::Value = serde_json::from_str(message.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, original);
    }

    #[test]
    fn caller_headers_follow_content_type() {
        let transport = Arc::new(RecordingTransport::new());
        let message = request(&transport, "GET")
            .with_headers([("Authorization", "Bearer token"), ("Auth0-Client", "abc")])
            .message();
        assert_eq!(
            message.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Bearer token".to_string()),
                ("Auth0-Client".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn caller_content_type_overrides_default() {
        let transport = Arc::new(RecordingTransport::new());
        let message = request(&transport, "POST")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .message();
        assert_eq!(
            message.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(message.headers.len(), 1);
    }

    #[test]
    fn last_duplicate_header_wins() {
        let transport = Arc::new(RecordingTransport::new());
        let message = request(&transport, "GET")
            .with_header("X-Trace", "1")
            .with_header("x-trace", "2")
            .message();
        assert_eq!(message.header("X-Trace"), Some("2"));
        assert_eq!(message.headers.len(), 2);
    }

    #[test]
    fn serialized_payload_must_be_an_object() {
        #[derive(Serialize)]
        struct Credentials {
            username: String,
            password: String,
        }

        let transport = Arc::new(RecordingTransport::new());
        let req = request(&transport, "POST")
            .with_serialized_payload(&Credentials {
                username: "ada".to_string(),
                password: "secret".to_string(),
            })
            .unwrap();
        assert_eq!(req.payload()["username"], "ada");

        let err = request(&transport, "POST")
            .with_serialized_payload(&vec![1, 2])
            .unwrap_err();
        assert!(matches!(err, RequestError::NotAnObject("an array")));
    }

    #[test]
    fn unserializable_payload_is_a_construction_error() {
        let transport = Arc::new(RecordingTransport::new());
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], "non-string key");
        let err = request(&transport, "POST")
            .with_serialized_payload(&map)
            .unwrap_err();
        assert!(matches!(err, RequestError::Serialization(_)));
    }

    #[test]
    fn start_delivers_decoded_result() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_reply(Reply::Status(201, "{}".to_string()));

        let (tx, rx) = mpsc::channel();
        request(&transport, "POST").start(move |result| tx.send(result).unwrap());

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, Ok(201));
        assert_eq!(transport.submitted().len(), 1);
        assert_eq!(transport.submitted()[0].method, HttpMethod::Post);
    }

    #[test]
    fn transport_failure_reaches_decoder() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_reply(Reply::Fail("connection refused".to_string()));

        let (tx, rx) = mpsc::channel();
        request(&transport, "GET").start(move |result| tx.send(result).unwrap());

        let err = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap_err();
        assert!(err.contains("connection refused"), "{err}");
    }

    #[test]
    fn every_start_is_an_independent_call() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_reply(Reply::Status(200, String::new()));
        transport.push_reply(Reply::Status(204, String::new()));

        let req = request(&transport, "DELETE");
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        req.start(move |result| tx.send(result).unwrap());
        req.start(move |result| tx2.send(result).unwrap());

        let mut statuses = vec![
            rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap(),
            rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap(),
        ];
        statuses.sort();
        assert_eq!(statuses, vec![200, 204]);
        assert_eq!(transport.submitted().len(), 2);
    }

    #[test]
    fn inspector_sees_message_and_original_payload() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_reply(Reply::Status(200, String::new()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let req = request(&transport, "POST")
            .with_payload(payload(json!({"client_id": "CLIENT"})))
            .with_inspector(move |message, payload| {
                sink.lock()
                    .unwrap()
                    .push((message.clone(), payload.clone()));
            });

        let (tx, rx) = mpsc::channel();
        req.start(move |result| tx.send(result).unwrap());
        rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, transport.submitted()[0]);
        assert_eq!(seen[0].1["client_id"], "CLIENT");
    }

    #[test]
    fn decoder_may_complete_asynchronously() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_reply(Reply::Status(200, "late".to_string()));

        let transport_dyn: Arc<dyn Transport> = transport.clone();
        let req: Request<String, String> =
            Request::new(transport_dyn, URL, "GET", |raw: RawResponse, callback| {
                std::thread::spawn(move || callback(Ok(raw.text())));
            });

        let (tx, rx) = mpsc::channel();
        req.start(move |result| tx.send(result).unwrap());
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Ok("late".to_string())
        );
    }

    #[test]
    fn raw_response_shape_is_passed_through() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_reply(Reply::Raw(RawResponse {
            data: Some(b"partial".to_vec()),
            response: Some(ResponseMeta {
                status: 500,
                headers: Vec::new(),
            }),
            error: None,
        }));

        let (tx, rx) = mpsc::channel();
        request(&transport, "GET").start(move |result| tx.send(result).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Ok(500));
    }
}
