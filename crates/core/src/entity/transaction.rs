use std::time::Duration;

use async_trait::async_trait;

use crate::document::{DocumentError, DocumentStore};

use super::{BatchBuilder, EntityStore, JsonSerializer};

/// Decides whether a failed transaction should be attempted again.
#[async_trait]
pub trait RetryPolicy: Send + Sync {
    /// Called after the `failures`-th failed submission (starting at 1).
    ///
    /// Implementations may pause before returning `true`.
    async fn should_retry(&self, error: &DocumentError, failures: u32) -> bool;
}

/// Never retries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetry;

#[async_trait]
impl RetryPolicy for NoRetry {
    async fn should_retry(&self, _error: &DocumentError, _failures: u32) -> bool {
        false
    }
}

/// Retries update conflicts up to a fixed number of times.
#[derive(Debug, Clone, Copy)]
pub struct RetryConflicts {
    max_retries: u32,
    pause: Duration,
}

impl RetryConflicts {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            pause: Duration::ZERO,
        }
    }

    /// Waits for `pause` before each retry.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

#[async_trait]
impl RetryPolicy for RetryConflicts {
    async fn should_retry(&self, error: &DocumentError, failures: u32) -> bool {
        if !error.is_conflict() || failures > self.max_retries {
            return false;
        }

        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }

        true
    }
}

impl<S: DocumentStore, J: JsonSerializer> EntityStore<S, J> {
    /// Runs `body` against a fresh batch and submits it atomically.
    ///
    /// When the submission fails, `policy` decides whether to start over
    /// with a new, empty batch, running `body` again from scratch. An error
    /// returned by `body` aborts immediately without submitting anything.
    pub async fn transaction<T, E, P, F>(&self, policy: &P, mut body: F) -> Result<T, E>
    where
        P: RetryPolicy + ?Sized,
        E: From<DocumentError>,
        F: AsyncFnMut(&mut BatchBuilder<'_, S, J>) -> Result<T, E>,
    {
        let mut failures: u32 = 0;

        loop {
            let mut batch = self.batch();
            let result = body(&mut batch).await?;

            let err = match batch.submit().await {
                Ok(()) => return Ok(result),
                Err(err) => err,
            };

            failures += 1;
            if !policy.should_retry(&err, failures).await {
                return Err(err.into());
            }

            tracing::debug!(failures, error = %err, "Retrying transaction");
        }
    }
}
