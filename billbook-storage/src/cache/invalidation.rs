//! Which cached listings a mutation makes stale.

use billbook_core::{BusinessId, EntityType};

use super::key::CacheKey;
use super::store::CacheStore;

/// A write that happened against the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityChange {
    pub entity_type: EntityType,
    pub business_id: BusinessId,
}

impl EntityChange {
    pub fn new(entity_type: EntityType, business_id: BusinessId) -> Self {
        Self {
            entity_type,
            business_id,
        }
    }

    /// Keys and prefixes to drop after this change.
    ///
    /// Invoices move party balances and item stock, and payments move
    /// balances and paid amounts, so those listings go too.
    pub fn plan(&self) -> InvalidationPlan {
        let business = self.business_id;
        let mut plan = InvalidationPlan::default();
        match self.entity_type {
            EntityType::Party => {
                plan.keys.push(CacheKey::parties(business));
            }
            EntityType::Item => {
                plan.keys.push(CacheKey::items(business));
            }
            EntityType::Invoice => {
                plan.keys.push(CacheKey::parties(business));
                plan.keys.push(CacheKey::items(business));
                plan.prefixes.push(CacheKey::recent_invoices_prefix(business));
            }
            EntityType::Payment => {
                plan.keys.push(CacheKey::parties(business));
                plan.prefixes.push(CacheKey::recent_invoices_prefix(business));
            }
            EntityType::Business => {
                plan.keys.push(CacheKey::business(business));
            }
        }
        plan
    }
}

/// Exact keys and key prefixes to remove from a [`CacheStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: Vec<CacheKey>,
    pub prefixes: Vec<String>,
}

impl InvalidationPlan {
    /// Remove everything the plan names. Returns the number of entries removed.
    pub fn apply(&self, store: &CacheStore) -> usize {
        let mut removed = store.invalidate(&self.keys);
        for prefix in &self.prefixes {
            removed += store.invalidate_prefix(prefix);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.prefixes.is_empty()
    }
}
