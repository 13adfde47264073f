//! Per-call execution context: cancellation plus an optional deadline.

use crate::error::HttpError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation and deadline attached to one call.
///
/// The context travels on the [`Request`](crate::Request), so interceptors can
/// inspect it or replace it. The transport round trip runs under it: whichever
/// of cancellation, deadline, or completion happens first decides the result.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    timeout: Duration,
}

impl CallContext {
    /// Context bound only to `token`, without a deadline
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            timeout: Duration::ZERO,
        }
    }

    /// Context that is never cancelled and has no deadline
    #[must_use]
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Same context with a deadline `timeout` from now; zero keeps no deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if timeout > Duration::ZERO {
            // Past the clock's range there is no reachable deadline
            self.deadline = Instant::now().checked_add(timeout);
            self.timeout = timeout;
        }
        self
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the call. In-flight transport work is dropped.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Drive `fut` under this context.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Cancelled`] if the token fires first,
    /// [`HttpError::Timeout`] if the deadline passes first, otherwise the
    /// result of `fut`.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, HttpError>
    where
        F: Future<Output = Result<T, HttpError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(HttpError::Cancelled),
            () = deadline => Err(HttpError::Timeout(self.timeout)),
            result = fut => result,
        }
    }
}

/// Derive the context for one call.
///
/// A caller token is never cancelled by the pipeline itself: the call runs on a
/// child token. The returned guard cancels that token when the call returns,
/// on every path.
pub fn derive(caller: Option<&CancellationToken>, timeout: Duration) -> (CallContext, DropGuard) {
    let token = caller.map_or_else(CancellationToken::new, CancellationToken::child_token);
    let guard = token.clone().drop_guard();
    (CallContext::new(token).with_timeout(timeout), guard)
}
