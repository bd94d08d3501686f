/**
 * Cancellable Task Runner
 *
 * Handlers dispatch their blocking work (storage calls, file writes) to
 * background units and wait for the first terminal outcome:
 *
 * 1. The request scope is cancelled (client gone or soft deadline): 408.
 * 2. Any unit fails: that unit's error.
 * 3. Every unit reports success: the collected values.
 *
 * Units never write the response. Each unit checks its `TaskScope` before
 * and after its work; a unit that observes cancellation exits without
 * reporting. A failing unit trips the scope before it reports, so siblings
 * that have not reached their checkpoint yet will not commit.
 *
 * # Example
 *
 * ```rust,ignore
 * let mut runner = TaskRunner::new(&request);
 * runner.spawn("write_avatar", move |scope| async move { ... });
 * runner.spawn("update_avatar", move |scope| async move { ... });
 * runner.join().await?;
 * ```
 */

use std::future::Future;

use tokio::sync::mpsc;

use crate::backend::error::ApiError;
use crate::backend::tasks::scope::{RequestScope, TaskScope};

/// Terminal report from one unit
enum UnitReport<T> {
    Done(&'static str, T),
    Failed(&'static str, ApiError),
}

/// A group of background units sharing one `TaskScope`
pub struct TaskRunner<T> {
    scope: TaskScope,
    tx: mpsc::UnboundedSender<UnitReport<T>>,
    rx: mpsc::UnboundedReceiver<UnitReport<T>>,
    expected: usize,
}

impl<T: Send + 'static> TaskRunner<T> {
    /// Create a runner scoped to `request`
    pub fn new(request: &RequestScope) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            scope: request.derive(),
            tx,
            rx,
            expected: 0,
        }
    }

    /// The scope handed to every unit
    pub fn scope(&self) -> &TaskScope {
        &self.scope
    }

    /// Start a background unit
    ///
    /// `work` receives a clone of the runner's scope and should call
    /// `scope.checkpoint()?` before each irreversible effect.
    pub fn spawn<F, Fut>(&mut self, unit: &'static str, work: F)
    where
        F: FnOnce(TaskScope) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.expected += 1;
        let scope = self.scope.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            if scope.is_cancelled() {
                tracing::debug!(unit, "Skipping unit: scope already cancelled");
                return;
            }

            match work(scope.clone()).await {
                Ok(value) => {
                    if scope.is_cancelled() {
                        tracing::debug!(unit, "Discarding unit result: scope cancelled");
                        return;
                    }
                    let _ = tx.send(UnitReport::Done(unit, value));
                }
                Err(ApiError::Cancelled) => {
                    tracing::debug!(unit, "Unit aborted at checkpoint");
                }
                Err(err) => {
                    scope.trip();
                    let _ = tx.send(UnitReport::Failed(unit, err));
                }
            }
        });
    }

    /// Wait for the first terminal outcome
    ///
    /// Returns the values of all units in completion order, or the first
    /// error. Cancellation of the request wins over any report that arrives
    /// at the same time.
    pub async fn join(self) -> Result<Vec<T>, ApiError> {
        let TaskRunner {
            scope,
            tx,
            mut rx,
            expected,
        } = self;
        drop(tx);

        let mut values = Vec::with_capacity(expected);
        if expected == 0 {
            return Ok(values);
        }

        let outcome = loop {
            tokio::select! {
                biased;

                _ = scope.request().cancelled() => break Err(ApiError::Cancelled),

                report = rx.recv() => match report {
                    Some(UnitReport::Done(unit, value)) => {
                        tracing::debug!(unit, "Unit completed");
                        values.push(value);
                        if values.len() == expected {
                            break Ok(std::mem::take(&mut values));
                        }
                    }
                    Some(UnitReport::Failed(unit, err)) => {
                        tracing::debug!(unit, error = %err, "Unit failed");
                        break Err(err);
                    }
                    None if scope.request().is_cancelled() => break Err(ApiError::Cancelled),
                    None => {
                        break Err(ApiError::upstream(format!(
                            "{} of {} units exited without reporting",
                            expected - values.len(),
                            expected
                        )))
                    }
                },
            }
        };

        if outcome.is_err() {
            scope.trip();
        }

        outcome
    }
}

/// Run a single unit under `request` and return its value
pub async fn run_unit<T, F, Fut>(request: &RequestScope, unit: &'static str, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(TaskScope) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let mut runner = TaskRunner::new(request);
    runner.spawn(unit, work);

    runner
        .join()
        .await?
        .pop()
        .ok_or_else(|| ApiError::upstream(format!("unit {unit} produced no value")))
}
