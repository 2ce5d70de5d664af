//! Mapping store adapters.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use portal_core::repository::{ReadRepository, Repository, Result};
pub use portal_core::StorageError;
