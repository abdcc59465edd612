//! datagate Storage - Store Contracts
//!
//! The gateway reads results from a [`CacheStore`] and admits work into a
//! [`JobQueue`]. Both are external, shared and possibly slow; the traits here
//! are object-safe so the API layer can hold them as `Arc<dyn ...>`.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryCacheStore, InMemoryJobQueue};
pub use traits::{CacheStore, JobQueue};
