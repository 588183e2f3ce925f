//! Per-call cancellation and deadline signal.
//!
//! Every core operation takes a [`CallContext`] and runs each storage call
//! through [`CallContext::run`], which aborts with `Cancelled` or
//! `DeadlineExceeded` as soon as the caller's signal fires. Cancellation is
//! cooperative: the core never cancels on its own.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::services::ServiceError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context with no deadline that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().with_deadline(Instant::now() + timeout)
    }

    /// Keep the earlier of the existing and the given deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Context cancelled when the returned guard is dropped.
    ///
    /// Transport handlers hold the guard for the duration of the request so a
    /// dropped request future cancels any work still observing the context.
    pub fn cancel_on_drop(timeout: Option<Duration>) -> (Self, DropGuard) {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        let ctx = Self {
            token,
            deadline: timeout.map(|t| Instant::now() + t),
        };
        (ctx, guard)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the signal already fired.
    pub fn check(&self) -> Result<(), ServiceError> {
        if self.token.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ServiceError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ServiceError::Cancelled),
            _ = deadline => Err(ServiceError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
