//! Sequential composition of two requests.
//!
//! The second request is submitted only from inside the first one's
//! completion, so the two calls never overlap. A failure of the first is
//! handed to the caller unchanged and the second is never started.

use std::fmt;

use tracing::debug;

use crate::request::{Request, Requestable};

/// Runs `first`, then `second` if `first` succeeded. The first success value
/// is discarded; the caller receives `second`'s result.
pub struct ConcatRequest<F, S, E> {
    first: Request<F, E>,
    second: Request<S, E>,
}

impl<F, S, E> ConcatRequest<F, S, E>
where
    F: Send + 'static,
    S: Send + 'static,
    E: Send + 'static,
{
    pub fn new(first: Request<F, E>, second: Request<S, E>) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &Request<F, E> {
        &self.first
    }

    pub fn second(&self) -> &Request<S, E> {
        &self.second
    }

    pub fn start<C>(&self, callback: C)
    where
        C: FnOnce(Result<S, E>) + Send + 'static,
    {
        let second = self.second.clone();
        self.first.start(move |result| match result {
            Err(cause) => {
                debug!(url = %second.url(), "first request failed, skipping second");
                callback(Err(cause))
            }
            Ok(_) => second.start(callback),
        });
    }
}

impl<F, S, E> Requestable for ConcatRequest<F, S, E>
where
    F: Send + 'static,
    S: Send + 'static,
    E: Send + 'static,
{
    type Output = S;
    type Error = E;

    fn start<C>(&self, callback: C)
    where
        C: FnOnce(Result<S, E>) + Send + 'static,
    {
        ConcatRequest::start(self, callback)
    }
}

impl<F, S, E> Clone for ConcatRequest<F, S, E> {
    fn clone(&self) -> Self {
        Self {
            first: self.first.clone(),
            second: self.second.clone(),
        }
    }
}

impl<F, S, E> fmt::Debug for ConcatRequest<F, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcatRequest")
            .field("first", &self.first)
            .field("second", &self.second)
            .finish()
    }
}
