// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("set 0 or more for wait_time (got {0})")]
    InvalidWaitTime(i64),

    #[error("set 1 or more for concurrency_limit (got {0})")]
    InvalidConcurrencyLimit(usize),

    #[error("concurrency_limit must be at most {max} (got {got})")]
    ConcurrencyLimitTooLarge { got: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, DomainError>;
