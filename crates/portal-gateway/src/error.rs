use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portal_core::{CacheError, StorageError};
use portal_redirector::RedirectorError;
use portal_sequence::SequenceError;
use portal_shortener::ShortenerError;
use tracing::warn;

use crate::model::ErrorResponse;
use crate::reachability::ProbeError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Shortener(ShortenerError),
    Redirector(RedirectorError),
    Unreachable(ProbeError),
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        Self::Shortener(value)
    }
}

impl From<RedirectorError> for AppError {
    fn from(value: RedirectorError) -> Self {
        Self::Redirector(value)
    }
}

impl From<ProbeError> for AppError {
    fn from(value: ProbeError) -> Self {
        Self::Unreachable(value)
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::Conflict(_) => StatusCode::CONFLICT,
        StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        StorageError::Query(_) | StorageError::InvalidData(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn cache_status(err: &CacheError) -> StatusCode {
    match err {
        CacheError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn sequence_status(err: &SequenceError) -> StatusCode {
    match err {
        SequenceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SequenceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SequenceError::InvalidValue(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Shortener(err) => match err {
                ShortenerError::InvalidUrl(_) | ShortenerError::InputIsShortUrl(_) => {
                    StatusCode::BAD_REQUEST
                }
                ShortenerError::AlreadyMapped(_) | ShortenerError::Conflict(_) => {
                    StatusCode::CONFLICT
                }
                ShortenerError::Allocator(err) => sequence_status(err),
                ShortenerError::Storage(err) => storage_status(err),
                ShortenerError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            },
            AppError::Redirector(err) => match err {
                RedirectorError::ShortCodeRequired
                | RedirectorError::InvalidCharacter { .. }
                | RedirectorError::InvalidShortCode(_) => StatusCode::BAD_REQUEST,
                RedirectorError::NotFound(_) => StatusCode::NOT_FOUND,
                RedirectorError::Storage(err) => storage_status(err),
                RedirectorError::Cache(err) => cache_status(err),
                RedirectorError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                RedirectorError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            },
            AppError::Unreachable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Shortener(err) => err.to_string(),
            AppError::Redirector(err) => err.to_string(),
            AppError::Unreachable(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.detail(), "Request failed");
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "service unavailable".to_string(),
                StatusCode::GATEWAY_TIMEOUT => "deadline exceeded".to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.detail()
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
