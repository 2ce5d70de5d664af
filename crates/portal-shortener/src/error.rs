use portal_core::StorageError;
use portal_sequence::SequenceError;
use thiserror::Error;

/// Result type for shortening operations.
pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("url is already a short url: {0}")]
    InputIsShortUrl(String),
    #[error("url is already shortened as {0}")]
    AlreadyMapped(String),
    #[error("mapping conflict: {0}")]
    Conflict(String),
    #[error("sequence allocation failed: {0}")]
    Allocator(#[from] SequenceError),
    #[error("storage error: {0}")]
    Storage(StorageError),
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(message) => Self::Conflict(message),
            other => Self::Storage(other),
        }
    }
}
