//! Cached reads against a [`RemoteSource`].
//!
//! Each fetcher derives its key from the operation name and scoping ids,
//! picks its TTL class and goes through [`CacheStore::fetch_or_load`], so
//! a failed remote read shows up as an empty listing.

use std::sync::Arc;

use billbook_core::{
    build_ledger, summarize, BillbookResult, Business, BusinessId, DashboardSummary, EntityIdType,
    EntityType, Invoice, InvoiceKind, Item, Ledger, Party, PartyId, StorageError,
};
use futures_util::future::{join4, try_join};

use super::config::TtlClass;
use super::invalidation::EntityChange;
use super::key::CacheKey;
use super::store::CacheStore;
use super::traits::RemoteSource;

/// Number of recent invoices per kind shown on the dashboard.
pub const DASHBOARD_RECENT_LIMIT: usize = 5;

/// Read-through accessors for one remote source.
pub struct CachedReads<S: RemoteSource> {
    source: Arc<S>,
    store: CacheStore,
}

impl<S: RemoteSource> CachedReads<S> {
    pub fn new(source: Arc<S>, store: CacheStore) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// All parties of a business.
    pub async fn parties(&self, business_id: BusinessId) -> Vec<Party> {
        let source = Arc::clone(&self.source);
        self.store
            .fetch_or_load(
                CacheKey::parties(business_id),
                move || async move { source.parties(business_id).await },
                self.store.config().ttl_for(TtlClass::Entity),
            )
            .await
    }

    /// All items of a business.
    pub async fn items(&self, business_id: BusinessId) -> Vec<Item> {
        let source = Arc::clone(&self.source);
        self.store
            .fetch_or_load(
                CacheKey::items(business_id),
                move || async move { source.items(business_id).await },
                self.store.config().ttl_for(TtlClass::Entity),
            )
            .await
    }

    /// The business profile, `None` when it does not exist or the read failed.
    pub async fn business(&self, business_id: BusinessId) -> Option<Business> {
        let source = Arc::clone(&self.source);
        self.store
            .fetch_or_load(
                CacheKey::business(business_id),
                move || async move { source.business(business_id).await },
                self.store.config().ttl_for(TtlClass::Profile),
            )
            .await
    }

    /// Newest `limit` invoices of one kind.
    pub async fn recent_invoices(
        &self,
        business_id: BusinessId,
        kind: InvoiceKind,
        limit: usize,
    ) -> Vec<Invoice> {
        let source = Arc::clone(&self.source);
        self.store
            .fetch_or_load(
                CacheKey::recent_invoices(business_id, kind, limit),
                move || async move { source.recent_invoices(business_id, kind, limit).await },
                self.store.config().ttl_for(TtlClass::Listing),
            )
            .await
    }

    /// Dashboard figures from the cached listings. The four reads run
    /// concurrently.
    pub async fn dashboard(&self, business_id: BusinessId) -> DashboardSummary {
        let (parties, items, sales, purchases) = join4(
            self.parties(business_id),
            self.items(business_id),
            self.recent_invoices(business_id, InvoiceKind::Sales, DASHBOARD_RECENT_LIMIT),
            self.recent_invoices(business_id, InvoiceKind::Purchase, DASHBOARD_RECENT_LIMIT),
        )
        .await;

        let mut invoices = sales;
        invoices.extend(purchases);
        summarize(&parties, &items, &invoices)
    }

    /// Ledger of one party.
    ///
    /// The party comes from the cached list; its invoices and payments are
    /// always read from the source so balances are current.
    pub async fn party_ledger(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Ledger> {
        let party = self
            .parties(business_id)
            .await
            .into_iter()
            .find(|party| party.party_id == party_id)
            .ok_or(StorageError::NotFound {
                entity_type: EntityType::Party,
                id: party_id.as_uuid(),
            })?;

        let (invoices, payments) = try_join(
            self.source.party_invoices(business_id, party_id),
            self.source.party_payments(business_id, party_id),
        )
        .await?;

        let ledger = build_ledger(&party, &invoices, &payments);
        tracing::debug!(
            party_id = %party_id,
            rows = ledger.rows.len(),
            closing_balance = ledger.closing_balance,
            "built party ledger"
        );
        Ok(ledger)
    }

    /// Drop what a write of `entity_type` makes stale. Returns the number
    /// of entries removed.
    pub fn changed(&self, entity_type: EntityType, business_id: BusinessId) -> usize {
        let removed = EntityChange::new(entity_type, business_id)
            .plan()
            .apply(&self.store);
        tracing::debug!(entity = ?entity_type, business_id = %business_id, removed, "applied invalidation plan");
        removed
    }

    pub fn party_changed(&self, business_id: BusinessId) -> usize {
        self.changed(EntityType::Party, business_id)
    }

    pub fn item_changed(&self, business_id: BusinessId) -> usize {
        self.changed(EntityType::Item, business_id)
    }

    pub fn invoice_changed(&self, business_id: BusinessId) -> usize {
        self.changed(EntityType::Invoice, business_id)
    }

    pub fn payment_changed(&self, business_id: BusinessId) -> usize {
        self.changed(EntityType::Payment, business_id)
    }

    pub fn business_changed(&self, business_id: BusinessId) -> usize {
        self.changed(EntityType::Business, business_id)
    }
}

impl<S: RemoteSource> Clone for CachedReads<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: self.store.clone(),
        }
    }
}
