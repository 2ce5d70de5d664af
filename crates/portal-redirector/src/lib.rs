//! Redirect resolution with a cache-aside read path.
//!
//! A [`RedirectorService`] validates a caller-supplied short code, optionally
//! consults the [`ExistenceFilter`](portal_cache::ExistenceFilter), and then
//! resolves through a [`CachedRepository`]. The cached repository coalesces
//! concurrent cache misses for the same code into a single store query.
//!
//! ```rust
//! use portal_cache::MokaUrlCache;
//! use portal_redirector::{CachedRepository, Redirector, RedirectorService};
//! use portal_storage::InMemoryRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = CachedRepository::new(InMemoryRepository::new(), MokaUrlCache::new());
//! let service = RedirectorService::new(repository);
//!
//! match service.redirect("d").await {
//!     Ok(url) => println!("Redirect to: {url}"),
//!     Err(e) => println!("Not redirected: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod redirector;
pub mod repository;
pub mod service;

pub use error::{RedirectorError, Result};
pub use redirector::Redirector;
pub use repository::cached::DEFAULT_CACHE_TTL;
pub use repository::CachedRepository;
pub use service::RedirectorService;
