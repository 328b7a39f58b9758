//! In-memory transport used by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;

use crate::error::TransportError;
use crate::http::{HttpRequest, RawResponse, ResponseMeta};
use crate::transport::{Completion, Transport};

/// Scripted outcome for one submission.
pub(crate) enum Reply {
    Status(u16, String),
    Fail(String),
    Raw(RawResponse),
}

/// Records every submitted message and completes from a reply queue on a
/// separate thread. An empty queue answers `200` with an empty body.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    submitted: Mutex<Vec<HttpRequest>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn submitted(&self) -> Vec<HttpRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.submitted().into_iter().map(|r| r.url).collect()
    }
}

impl Transport for RecordingTransport {
    fn submit(&self, request: HttpRequest, completion: Completion) {
        self.submitted.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(200, String::new()));
        let raw = match reply {
            Reply::Status(status, body) => RawResponse::success(
                ResponseMeta {
                    status,
                    headers: Vec::new(),
                },
                body.into_bytes(),
            ),
            Reply::Fail(message) => RawResponse::failure(TransportError::Failed(message)),
            Reply::Raw(raw) => raw,
        };
        thread::spawn(move || completion(raw));
    }
}
