// Subscriber & Handler Options
use super::error::{DomainError, Result};
use tokio::sync::Semaphore;

/// Default number of messages handled concurrently across all queues
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

/// Per-handler options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandlerOptions {
    /// Visibility delay (seconds) applied when the handler fails.
    /// The message becomes receivable again after this delay.
    pub wait_time: i64,
}

impl HandlerOptions {
    pub fn new(wait_time: i64) -> Self {
        Self { wait_time }
    }

    pub fn validate(&self) -> Result<()> {
        if self.wait_time < 0 {
            return Err(DomainError::InvalidWaitTime(self.wait_time));
        }
        Ok(())
    }
}

/// Engine-wide options, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberOptions {
    /// Maximum number of handler invocations running at once, across all queues
    pub concurrency_limit: usize,
}

impl SubscriberOptions {
    pub fn new(concurrency_limit: usize) -> Self {
        Self { concurrency_limit }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit < 1 {
            return Err(DomainError::InvalidConcurrencyLimit(self.concurrency_limit));
        }
        // Upper bound of the permit pool backing the limit
        if self.concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(DomainError::ConcurrencyLimitTooLarge {
                got: self.concurrency_limit,
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(())
    }
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
        }
    }
}
