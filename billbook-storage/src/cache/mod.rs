//! In-memory read-through cache in front of the hosted backend.
//!
//! [`CacheStore`] keeps type-erased values keyed by [`CacheKey`] strings,
//! each with its own expiry. Reads go through
//! [`CacheStore::fetch_or_load`], which returns a fresh value or runs the
//! supplied loader exactly once no matter how many callers ask at the same
//! time. Writes elsewhere in the application call the
//! [`CachedReads`] change hooks, which apply an [`InvalidationPlan`].
//!
//! # Example
//!
//! ```ignore
//! let reads = CachedReads::new(remote, CacheStore::new(CacheConfig::from_env()));
//!
//! let parties = reads.parties(business_id).await;   // remote read
//! let parties = reads.parties(business_id).await;   // served from memory
//!
//! reads.invoice_changed(business_id);                // drops listings
//! ```

pub mod clock;
pub mod config;
pub mod entry;
pub mod invalidation;
pub mod key;
pub mod reads;
pub mod store;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, TtlClass};
pub use entry::CacheEntry;
pub use invalidation::{EntityChange, InvalidationPlan};
pub use key::{operations, CacheKey};
pub use reads::{CachedReads, DASHBOARD_RECENT_LIMIT};
pub use store::CacheStore;
pub use traits::{CacheStats, CacheValue, RemoteSource};
