/**
 * Cancellation Scopes
 *
 * Two levels of cooperative cancellation:
 *
 * - `RequestScope` belongs to one inbound request. It is cancelled when the
 *   client disconnects (the handler future is dropped, which drops the
 *   `DropGuard` held by the deadline middleware) or when the soft deadline
 *   passes.
 * - `TaskScope` is derived from a request scope for one runner invocation.
 *   Any background unit can trip it to stop its siblings; tripping never
 *   affects the request scope.
 *
 * Cancellation is checked at explicit checkpoints. Nothing is interrupted
 * preemptively, so a unit past its last checkpoint may still commit.
 */

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::backend::error::ApiError;

/// Per-request cancellation signal
#[derive(Debug, Clone)]
pub struct RequestScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestScope {
    /// Scope with a soft deadline `timeout` from now
    pub fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Scope without a deadline, cancelled only explicitly
    pub fn unbounded() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Cancel the request. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the request was cancelled or its deadline has passed
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Resolves once the request is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => self.token.cancel(),
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Guard that cancels the request when dropped
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Derive a trippable scope for a group of background units
    pub fn derive(&self) -> TaskScope {
        TaskScope {
            local: self.token.child_token(),
            request: self.clone(),
        }
    }
}

/// Scope shared by the units of one runner invocation
#[derive(Debug, Clone)]
pub struct TaskScope {
    request: RequestScope,
    local: CancellationToken,
}

impl TaskScope {
    /// Abort sibling units. Idempotent.
    pub fn trip(&self) {
        self.local.cancel();
    }

    /// Whether a sibling tripped this scope
    pub fn is_tripped(&self) -> bool {
        self.local.is_cancelled() && !self.request.is_cancelled()
    }

    /// Whether work under this scope should stop
    pub fn is_cancelled(&self) -> bool {
        self.local.is_cancelled() || self.request.is_cancelled()
    }

    /// Checkpoint before an irreversible effect
    ///
    /// Returns `ApiError::Cancelled`, which the runner treats as a silent
    /// abort rather than a failure to report.
    pub fn checkpoint(&self) -> Result<(), ApiError> {
        if self.is_cancelled() {
            Err(ApiError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The request scope this was derived from
    pub fn request(&self) -> &RequestScope {
        &self.request
    }
}
