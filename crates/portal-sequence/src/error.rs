use thiserror::Error;

/// Errors returned while allocating sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("counter service unavailable: {0}")]
    Unavailable(String),
    #[error("counter operation timed out: {0}")]
    Timeout(String),
    #[error("counter returned an unusable value: {0}")]
    InvalidValue(i64),
}
