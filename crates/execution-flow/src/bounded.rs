//! Per-operation bounds, cancellation and the run deadline

use std::future::Future;
use std::time::Duration;

use session_driver::DriverError;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::{Op, StepError};

/// Interruption sources shared by every step of one run
#[derive(Debug, Clone)]
pub struct RunGuard {
    cancel: CancellationToken,
    deadline: Instant,
}

impl RunGuard {
    pub fn new(cancel: CancellationToken, run_budget: Duration) -> Self {
        Self {
            cancel,
            deadline: Instant::now() + run_budget,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Run `step` bounded by `limit`, returning early on cancellation or
    /// when the run deadline passes. The step future is dropped in both cases.
    pub async fn step<T, F>(&self, op: Op, limit: Duration, step: F) -> Result<T, StepError>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(StepError::Cancelled(op));
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StepError::Cancelled(op)),
            _ = tokio::time::sleep_until(self.deadline) => Err(StepError::DeadlineExceeded(op)),
            outcome = timeout(limit, step) => match outcome {
                Ok(result) => result.map_err(StepError::from),
                Err(_) => Err(StepError::TimedOut {
                    op,
                    after_ms: limit.as_millis() as u64,
                }),
            },
        }
    }
}

/// Bound `step` by `limit` alone; used for cleanup after the run was interrupted.
pub async fn uninterruptible<T, F>(op: Op, limit: Duration, step: F) -> Result<T, StepError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match timeout(limit, step).await {
        Ok(result) => result.map_err(StepError::from),
        Err(_) => Err(StepError::TimedOut {
            op,
            after_ms: limit.as_millis() as u64,
        }),
    }
}
