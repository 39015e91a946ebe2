//! Cacheable value marker, remote source trait, and cache statistics.

use async_trait::async_trait;
use billbook_core::{
    BillbookResult, Business, BusinessId, Invoice, InvoiceKind, Item, Party, PartyId, Payment,
};

/// Marker trait for values the cache can hold.
///
/// `Default` supplies the empty value returned when a load fails under the
/// swallow-on-error policy of [`CacheStore::fetch_or_load`].
///
/// [`CacheStore::fetch_or_load`]: super::CacheStore::fetch_or_load
pub trait CacheValue: Clone + Default + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Default + Send + Sync + 'static {}

/// The hosted backend of record, seen as a set of async reads.
///
/// Implementations must be cheap to share behind an `Arc`; every cached
/// read clones the `Arc` into its loader.
#[async_trait]
pub trait RemoteSource: Send + Sync + 'static {
    /// All parties of a business.
    async fn parties(&self, business_id: BusinessId) -> BillbookResult<Vec<Party>>;

    /// All items of a business.
    async fn items(&self, business_id: BusinessId) -> BillbookResult<Vec<Item>>;

    /// The business profile, if it exists.
    async fn business(&self, business_id: BusinessId) -> BillbookResult<Option<Business>>;

    /// The newest `limit` invoices of one kind, newest first.
    async fn recent_invoices(
        &self,
        business_id: BusinessId,
        kind: InvoiceKind,
        limit: usize,
    ) -> BillbookResult<Vec<Invoice>>;

    /// Every invoice raised for or by a party.
    async fn party_invoices(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Invoice>>;

    /// Every payment to or from a party.
    async fn party_payments(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Payment>>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from memory.
    pub hits: u64,
    /// Reads that found nothing fresh.
    pub misses: u64,
    /// Loader invocations that succeeded.
    pub loads: u64,
    /// Loader invocations that failed or timed out.
    pub load_failures: u64,
    /// Callers that joined a load already in flight.
    pub coalesced: u64,
    /// Entries dropped because they expired.
    pub evictions: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
