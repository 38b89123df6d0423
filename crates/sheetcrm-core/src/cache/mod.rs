//! Shared read-through cache for all spreadsheet datasets.
//!
//! One [`CacheService`] instance backs every reader in the process. It owns
//! the per-dataset TTL cache, coalesces concurrent fetches for the same
//! dataset into one remote call, and carries the global write clock that
//! the staleness protocol is built on.

pub mod service;

pub use service::{CacheService, RowMatch};
