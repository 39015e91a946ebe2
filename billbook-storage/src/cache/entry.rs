//! Cached entries and their freshness rule.

use billbook_core::Timestamp;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Type-erased cached value. Readers downcast to the type they asked for.
pub(crate) type SharedValue = Arc<dyn Any + Send + Sync>;

/// One cached value with the time it was stored and how long it stays valid.
///
/// The entry is fresh while `now - timestamp <= expiry`. A timestamp in the
/// future (clock moved backwards) counts as age zero.
#[derive(Clone)]
pub struct CacheEntry {
    pub(crate) data: SharedValue,
    pub(crate) timestamp: Timestamp,
    pub(crate) expiry: Duration,
}

impl CacheEntry {
    pub(crate) fn new(data: SharedValue, timestamp: Timestamp, expiry: Duration) -> Self {
        Self {
            data,
            timestamp,
            expiry,
        }
    }

    /// When the value was stored.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// How long the value stays valid after `timestamp`.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Age of the entry as of `now`.
    pub fn age(&self, now: Timestamp) -> Duration {
        now.signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, now: Timestamp) -> bool {
        self.age(now) <= self.expiry
    }

    /// Clone the value out if it has type `T`.
    pub(crate) fn value<T: Clone + 'static>(&self) -> Option<T> {
        self.data.downcast_ref::<T>().cloned()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("timestamp", &self.timestamp)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
