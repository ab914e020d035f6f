//! Cache Module
//!
//! TTL-backed value storage used as the last known-good source for the
//! external percentage.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::{MemoryStore, StoreResult, ValueStore};

// == Public Constants ==
/// Key under which the current percentage is stored unless configured otherwise
pub const DEFAULT_PERCENTAGE_KEY: &str = "percentage:current";
