//! Cancellable task series
//!
//! An operation against a persistent store runs as a series of named steps
//! (`open`, then the operation itself). The runner checks the caller's
//! cancellation token before each step and races the step against it, so a
//! cancelled series unwinds without running the steps that follow.

use std::future::Future;
use std::pin::pin;

use futures::future::{select, Either};
use storekit::tracing::prefix;
use storekit_core::{StoreError, StoreResult};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs the steps of one task series.
#[derive(Debug, Clone, Copy)]
pub struct TaskRunner<'t> {
    token: &'t CancellationToken,
}

impl<'t> TaskRunner<'t> {
    pub fn new(token: &'t CancellationToken) -> Self {
        Self { token }
    }

    /// Run one step.
    ///
    /// Errors are wrapped as `TaskFailed` naming the step. Cancellation,
    /// before or during the step, is reported as `Aborted`.
    pub async fn step<T>(
        &self,
        task: &str,
        work: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        if self.token.is_cancelled() {
            debug!("{} series aborted before {}", prefix::TASK, task);
            return Err(StoreError::Aborted);
        }

        let work = pin!(work);
        let cancelled = pin!(self.token.cancelled());

        match select(work, cancelled).await {
            Either::Left((Ok(value), _)) => Ok(value),
            Either::Left((Err(e), _)) => Err(wrap(task, e)),
            Either::Right(((), _)) => {
                debug!("{} series aborted during {}", prefix::TASK, task);
                Err(StoreError::Aborted)
            }
        }
    }
}

fn wrap(task: &str, err: StoreError) -> StoreError {
    match err {
        StoreError::Aborted => StoreError::Aborted,
        StoreError::TaskFailed { .. } => err,
        source => StoreError::TaskFailed {
            task: task.to_string(),
            source: Box::new(source),
        },
    }
}
