//! The seam between requests and the network.
//!
//! A `Transport` accepts one assembled `HttpRequest` and completes exactly
//! once with a `RawResponse`, on a thread of its own choosing. It is shared by
//! reference (`Arc<dyn Transport>`) and must tolerate concurrent submissions
//! from unrelated requests.

use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, warn};

use crate::error::TransportError;
use crate::http::{HttpRequest, RawResponse, ResponseMeta};

/// Completion handler for one submitted call.
pub type Completion = Box<dyn FnOnce(RawResponse) + Send + 'static>;

/// Capability for issuing one HTTP call and receiving one completion.
pub trait Transport: Send + Sync {
    /// Submit `request` and return without waiting for the network.
    fn submit(&self, request: HttpRequest, completion: Completion);
}

/// Transport backed by a shared `ureq::Agent`.
///
/// Every submission runs on its own thread; the agent's connection pool is
/// shared across all of them. There is one OS thread per in-flight call and no
/// upper bound on how many run at once. Non-2xx statuses are delivered as data
/// so that decoders see the real status and body.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent. Keep `http_status_as_error(false)` on it,
    /// otherwise error statuses surface as transport failures.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn submit(&self, request: HttpRequest, completion: Completion) {
        let agent = self.agent.clone();
        // Parked outside the worker so a failed spawn can still complete.
        let slot = Arc::new(Mutex::new(Some(completion)));
        let worker_slot = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name("ureq-transport".to_string())
            .spawn(move || {
                let raw = execute(&agent, request);
                if let Some(completion) = take(&worker_slot) {
                    completion(raw);
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn transport worker");
            if let Some(completion) = take(&slot) {
                completion(RawResponse::failure(TransportError::Io(e)));
            }
        }
    }
}

fn take(slot: &Mutex<Option<Completion>>) -> Option<Completion> {
    match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// Run one request to completion on the current thread.
fn execute(agent: &ureq::Agent, request: HttpRequest) -> RawResponse {
    match execute_inner(agent, request) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "transport call failed");
            RawResponse::failure(e)
        }
    }
}

fn execute_inner(agent: &ureq::Agent, request: HttpRequest) -> Result<RawResponse, TransportError> {
    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let mut response = match request.body {
        Some(body) => agent.run(
            builder
                .body(body)
                .map_err(|e| TransportError::InvalidMessage(e.to_string()))?,
        )?,
        None => agent.run(
            builder
                .body(())
                .map_err(|e| TransportError::InvalidMessage(e.to_string()))?,
        )?,
    };

    let meta = ResponseMeta {
        status: response.status().as_u16(),
        headers: response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
    };
    // ureq caps bodies at 10 MiB by default; a completed call is never a
    // transport failure because of its size.
    let data = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()?;
    Ok(RawResponse::success(meta, data))
}
