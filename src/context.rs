//! Cancellation and deadline scope for API calls.
//!
//! Every request carries a [`Context`]. The transport executor races the
//! whole round trip against [`Context::done`], so a canceled or expired
//! context aborts the call promptly with the matching error.

use crate::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug)]
struct Inner {
    canceled: watch::Sender<bool>,
    deadline: Option<Instant>,
}

/// Cheaply cloneable cancellation scope. Clones share cancellation state.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    fn new(deadline: Option<Instant>) -> Self {
        let (canceled, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner { canceled, deadline }),
        }
    }

    /// A context that is never done unless canceled explicitly.
    pub fn background() -> Self {
        Self::new(None)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Some(Instant::now() + timeout))
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::new(Some(deadline))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.inner.canceled.send_replace(true);
    }

    /// The error a call made under this context would fail with, if the
    /// context is already done.
    pub fn err(&self) -> Option<Error> {
        if *self.inner.canceled.borrow() {
            return Some(Error::Canceled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is canceled or its deadline passes.
    pub async fn done(&self) -> Error {
        let mut rx = self.inner.canceled.subscribe();
        let canceled = async move {
            // The sender lives as long as `self`, so this only returns once canceled.
            let _ = rx.wait_for(|c| *c).await;
        };
        match self.inner.deadline {
            Some(deadline) => tokio::select! {
                _ = canceled => Error::Canceled,
                _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
            },
            None => {
                canceled.await;
                Error::Canceled
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
