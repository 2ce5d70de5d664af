//! URL shortening: turns a long URL into a short URL backed by a freshly
//! allocated sequence number.

pub mod error;
pub mod service;
pub mod shortener;

pub use error::{Result, ShortenerError};
pub use service::ShortenerService;
pub use shortener::Shortener;
