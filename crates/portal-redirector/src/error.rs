use portal_core::{CacheError, CoreError, StorageError};
use thiserror::Error;

/// Result type for redirect operations.
pub type Result<T> = std::result::Result<T, RedirectorError>;

#[derive(Debug, Clone, Error)]
pub enum RedirectorError {
    #[error("short code is required")]
    ShortCodeRequired,
    #[error("invalid character {character:?} at offset {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("in-flight lookup was cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<CoreError> for RedirectorError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::Empty => Self::ShortCodeRequired,
            CoreError::InvalidCharacter {
                character,
                position,
            } => Self::InvalidCharacter {
                character,
                position,
            },
            other @ (CoreError::TooLong { .. } | CoreError::Overflow(_)) => {
                Self::InvalidShortCode(other.to_string())
            }
        }
    }
}
