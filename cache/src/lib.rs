//! A bounded indirection cache for message store items.
//!
//! Items whose in-memory payload may be dropped register with an
//! [`ItemStorageManager`] and are linked, oldest first, into one of two
//! size-bounded FIFO lists. When a list grows past its ceiling the oldest
//! handles are discarded:
//!
//! - **Stored** items already have a durable copy, so discarding only drops
//!   the cache's link.
//! - **Unstored** items exist only in memory, so discarding also calls
//!   [`Indirection::release_if_discardable`] on the victim.
//!
//! # Features
//! - **Arena-indexed lists**: handles are linked by generational index, never
//!   by pointer; a handle can sit in at most one list at a time.
//! - **Narrow locking**: every list operation is its own critical section and
//!   release callbacks run with no list lock held, so they may re-enter.
//! - **Observability**: per-pool and aggregate statistics, capacity warnings
//!   through `tracing`, and an XML dump of the current lists.
//! - **Configuration**: optional `serde` feature for loading limits from YAML.

// Public modules that form the API
pub mod builder;
pub mod config;
pub mod error;
pub mod indirection;
pub mod list;
pub mod manager;
pub mod metrics;
pub mod policy;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export the primary user-facing types for convenience
pub use builder::StorageManagerBuilder;
pub use config::{StorageConfig, WarningThresholds};
pub use error::{ConfigError, InvariantError};
pub use indirection::{CacheLink, Indirection, StorageKind, StorageStrategy};
pub use list::{Discarded, IndirectionList, ListEntry};
pub use manager::{CapacityWarning, ItemStorageManager};
pub use metrics::CacheStatistics;
pub use policy::{
  Admission, DiscardPolicy, IndirectionCache, IndirectionManager, StoredItemManager,
  UnstoredItemManager,
};
