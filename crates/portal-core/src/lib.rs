//! Core types and traits for the Portal URL shortener.
//!
//! This crate provides the short code alphabet and the shared types and
//! traits used by both the shortener service and the redirector service.

pub mod alphabet;
pub mod cache;
pub mod error;
pub mod repository;
pub mod shortcode;

pub use cache::UrlCache;
pub use error::{CacheError, CoreError, StorageError};
pub use repository::{long_url_digest, Mapping, ReadRepository, Repository};
pub use shortcode::ShortCode;
