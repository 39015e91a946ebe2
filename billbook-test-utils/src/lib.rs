//! Billbook Test Utilities
//!
//! Centralized test infrastructure for the Billbook workspace:
//! - Instrumented remote sources (counting, failing, delayed)
//! - Proptest generators for entity types
//! - Test fixtures for common scenarios
//! - Custom assertions for Billbook-specific errors

// Re-export storage types used by most tests
pub use billbook_storage::{
    CacheConfig, CacheKey, CacheStore, CachedReads, InMemoryRemote, ManualClock, RemoteSource,
    SeedData,
};

// Re-export core types for convenience
pub use billbook_core::{
    BalanceType, BillbookError, BillbookResult, Business, BusinessId, CacheError, ConfigError,
    EntityIdType, EntityType, Invoice, InvoiceId, InvoiceKind, InvoiceLine, InvoiceStatus, Item,
    ItemId, Party, PartyId, PartyType, Payment, PaymentDirection, PaymentId, PaymentMode,
    StorageError, Timestamp, ValidationError,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

// ============================================================================
// INSTRUMENTED REMOTES
// ============================================================================

/// Remote wrapper that counts calls per operation.
#[derive(Debug, Default)]
pub struct CountingRemote<S> {
    inner: S,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl<S: RemoteSource> CountingRemote<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of calls made to `operation` (the trait method name).
    pub fn calls(&self, operation: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.values().sum()
    }

    fn record(&self, operation: &'static str) {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        *calls.entry(operation).or_insert(0) += 1;
    }
}

#[async_trait]
impl<S: RemoteSource> RemoteSource for CountingRemote<S> {
    async fn parties(&self, business_id: BusinessId) -> BillbookResult<Vec<Party>> {
        self.record("parties");
        self.inner.parties(business_id).await
    }

    async fn items(&self, business_id: BusinessId) -> BillbookResult<Vec<Item>> {
        self.record("items");
        self.inner.items(business_id).await
    }

    async fn business(&self, business_id: BusinessId) -> BillbookResult<Option<Business>> {
        self.record("business");
        self.inner.business(business_id).await
    }

    async fn recent_invoices(
        &self,
        business_id: BusinessId,
        kind: InvoiceKind,
        limit: usize,
    ) -> BillbookResult<Vec<Invoice>> {
        self.record("recent_invoices");
        self.inner.recent_invoices(business_id, kind, limit).await
    }

    async fn party_invoices(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Invoice>> {
        self.record("party_invoices");
        self.inner.party_invoices(business_id, party_id).await
    }

    async fn party_payments(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Payment>> {
        self.record("party_payments");
        self.inner.party_payments(business_id, party_id).await
    }
}

/// Remote wrapper that fails its first `failures` calls, then delegates.
#[derive(Debug)]
pub struct FailingRemote<S> {
    inner: S,
    remaining: AtomicUsize,
}

impl<S: RemoteSource> FailingRemote<S> {
    pub fn new(inner: S, failures: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(failures),
        }
    }

    /// A remote that never succeeds.
    pub fn always(inner: S) -> Self {
        Self::new(inner, usize::MAX)
    }

    fn check(&self, operation: &str) -> BillbookResult<()> {
        let failed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(StorageError::RemoteFailed {
                operation: operation.to_string(),
                reason: "injected failure".to_string(),
            }
            .into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<S: RemoteSource> RemoteSource for FailingRemote<S> {
    async fn parties(&self, business_id: BusinessId) -> BillbookResult<Vec<Party>> {
        self.check("parties")?;
        self.inner.parties(business_id).await
    }

    async fn items(&self, business_id: BusinessId) -> BillbookResult<Vec<Item>> {
        self.check("items")?;
        self.inner.items(business_id).await
    }

    async fn business(&self, business_id: BusinessId) -> BillbookResult<Option<Business>> {
        self.check("business")?;
        self.inner.business(business_id).await
    }

    async fn recent_invoices(
        &self,
        business_id: BusinessId,
        kind: InvoiceKind,
        limit: usize,
    ) -> BillbookResult<Vec<Invoice>> {
        self.check("recent_invoices")?;
        self.inner.recent_invoices(business_id, kind, limit).await
    }

    async fn party_invoices(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Invoice>> {
        self.check("party_invoices")?;
        self.inner.party_invoices(business_id, party_id).await
    }

    async fn party_payments(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Payment>> {
        self.check("party_payments")?;
        self.inner.party_payments(business_id, party_id).await
    }
}

/// Remote wrapper that sleeps before every call.
#[derive(Debug)]
pub struct DelayedRemote<S> {
    inner: S,
    delay: Duration,
}

impl<S: RemoteSource> DelayedRemote<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<S: RemoteSource> RemoteSource for DelayedRemote<S> {
    async fn parties(&self, business_id: BusinessId) -> BillbookResult<Vec<Party>> {
        tokio::time::sleep(self.delay).await;
        self.inner.parties(business_id).await
    }

    async fn items(&self, business_id: BusinessId) -> BillbookResult<Vec<Item>> {
        tokio::time::sleep(self.delay).await;
        self.inner.items(business_id).await
    }

    async fn business(&self, business_id: BusinessId) -> BillbookResult<Option<Business>> {
        tokio::time::sleep(self.delay).await;
        self.inner.business(business_id).await
    }

    async fn recent_invoices(
        &self,
        business_id: BusinessId,
        kind: InvoiceKind,
        limit: usize,
    ) -> BillbookResult<Vec<Invoice>> {
        tokio::time::sleep(self.delay).await;
        self.inner.recent_invoices(business_id, kind, limit).await
    }

    async fn party_invoices(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Invoice>> {
        tokio::time::sleep(self.delay).await;
        self.inner.party_invoices(business_id, party_id).await
    }

    async fn party_payments(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Payment>> {
        tokio::time::sleep(self.delay).await;
        self.inner.party_payments(business_id, party_id).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Billbook entity types.

    use super::*;
    use billbook_core::GST_SLABS;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID (for generic ID generation).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_business_id() -> impl Strategy<Value = BusinessId> {
        arb_uuid().prop_map(BusinessId::new)
    }

    pub fn arb_party_id() -> impl Strategy<Value = PartyId> {
        arb_uuid().prop_map(PartyId::new)
    }

    /// Generate a date within one financial year.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..365).prop_map(|offset| {
            let start = NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid fixture");
            start + chrono::Duration::days(offset)
        })
    }

    /// Generate a rupee amount with paise precision.
    pub fn arb_amount() -> impl Strategy<Value = f64> {
        (0u64..10_000_000).prop_map(|paise| paise as f64 / 100.0)
    }

    pub fn arb_gst_rate() -> impl Strategy<Value = f64> {
        prop::sample::select(GST_SLABS.to_vec())
    }

    pub fn arb_invoice_kind() -> impl Strategy<Value = InvoiceKind> {
        prop_oneof![Just(InvoiceKind::Sales), Just(InvoiceKind::Purchase)]
    }

    pub fn arb_payment_direction() -> impl Strategy<Value = PaymentDirection> {
        prop_oneof![
            Just(PaymentDirection::Received),
            Just(PaymentDirection::Made)
        ]
    }

    pub fn arb_balance_type() -> impl Strategy<Value = BalanceType> {
        prop_oneof![Just(BalanceType::ToCollect), Just(BalanceType::ToPay)]
    }

    /// Generate a valid invoice line.
    pub fn arb_invoice_line() -> impl Strategy<Value = InvoiceLine> {
        (1u32..100, 1u64..1_000_000, 0u32..=100, arb_gst_rate()).prop_map(
            |(quantity, rate_paise, discount, gst_rate)| InvoiceLine {
                item_id: None,
                description: "Generated item".to_string(),
                quantity: quantity as f64,
                rate: rate_paise as f64 / 100.0,
                discount_percent: discount as f64,
                gst_rate,
            },
        )
    }

    /// Generate a party of a business.
    pub fn arb_party(business_id: BusinessId) -> impl Strategy<Value = Party> {
        (
            arb_party_id(),
            prop_oneof![Just(PartyType::Customer), Just(PartyType::Supplier)],
            arb_amount(),
            arb_balance_type(),
        )
            .prop_map(move |(party_id, party_type, opening_balance, balance_type)| Party {
                party_id,
                business_id,
                name: format!("Party {}", party_id),
                party_type,
                phone: None,
                gstin: None,
                state: None,
                opening_balance,
                balance_type,
                as_of_date: NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid fixture"),
                created_at: Utc::now(),
            })
    }

    /// Generate an invoice for a party, with totals computed from its lines.
    pub fn arb_invoice(business_id: BusinessId, party_id: PartyId) -> impl Strategy<Value = Invoice> {
        (
            arb_uuid(),
            arb_invoice_kind(),
            arb_date(),
            prop::collection::vec(arb_invoice_line(), 1..6),
        )
            .prop_map(move |(id, kind, invoice_date, lines)| {
                let mut invoice = Invoice {
                    invoice_id: InvoiceId::new(id),
                    business_id,
                    party_id,
                    kind,
                    number: format!("GEN-{}", id.simple()),
                    invoice_date,
                    due_date: None,
                    lines,
                    subtotal: 0.0,
                    tax_total: 0.0,
                    net_total: 0.0,
                    amount_paid: 0.0,
                    status: InvoiceStatus::Unpaid,
                    created_at: Utc::now(),
                };
                billbook_core::apply_totals(&mut invoice).expect("valid fixture");
                invoice
            })
    }

    /// Generate a payment for a party.
    pub fn arb_payment(business_id: BusinessId, party_id: PartyId) -> impl Strategy<Value = Payment> {
        (arb_uuid(), arb_payment_direction(), arb_amount(), arb_date()).prop_map(
            move |(id, direction, amount, payment_date)| Payment {
                payment_id: PaymentId::new(id),
                business_id,
                party_id,
                direction,
                amount,
                payment_date,
                mode: PaymentMode::Cash,
                invoice_id: None,
                created_at: Utc::now(),
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture")
    }

    /// A GST-registered business in Maharashtra.
    pub fn business() -> Business {
        Business {
            business_id: BusinessId::now_v7(),
            name: "Patil Hardware".to_string(),
            gstin: Some("27AAPFU0939F1ZV".to_string()),
            state: "Maharashtra".to_string(),
            address: Some("Shop 4, Station Road, Pune".to_string()),
            phone: Some("9800000001".to_string()),
            email: None,
            created_at: Utc::now(),
        }
    }

    /// A customer with an opening balance to collect.
    pub fn customer(business_id: BusinessId, opening_balance: f64) -> Party {
        Party {
            party_id: PartyId::now_v7(),
            business_id,
            name: "Sharma Traders".to_string(),
            party_type: PartyType::Customer,
            phone: Some("9800000002".to_string()),
            gstin: None,
            state: Some("Maharashtra".to_string()),
            opening_balance,
            balance_type: BalanceType::ToCollect,
            as_of_date: date(2024, 4, 1),
            created_at: Utc::now(),
        }
    }

    /// A supplier we owe an opening balance to.
    pub fn supplier(business_id: BusinessId, opening_balance: f64) -> Party {
        Party {
            name: "Gujarat Cements".to_string(),
            party_type: PartyType::Supplier,
            state: Some("Gujarat".to_string()),
            balance_type: BalanceType::ToPay,
            ..customer(business_id, opening_balance)
        }
    }

    pub fn item(business_id: BusinessId, name: &str, stock_quantity: f64) -> Item {
        Item {
            item_id: ItemId::now_v7(),
            business_id,
            name: name.to_string(),
            hsn_code: Some("2523".to_string()),
            unit: "bag".to_string(),
            sale_price: 420.0,
            purchase_price: 380.0,
            gst_rate: 28.0,
            stock_quantity,
            low_stock_alert: Some(10.0),
        }
    }

    pub fn line(quantity: f64, rate: f64, gst_rate: f64) -> InvoiceLine {
        InvoiceLine {
            item_id: None,
            description: "Line item".to_string(),
            quantity,
            rate,
            discount_percent: 0.0,
            gst_rate,
        }
    }

    /// An invoice with totals computed from `lines`.
    pub fn invoice(
        party: &Party,
        kind: InvoiceKind,
        invoice_date: NaiveDate,
        lines: Vec<InvoiceLine>,
    ) -> Invoice {
        let mut invoice = Invoice {
            invoice_id: InvoiceId::now_v7(),
            business_id: party.business_id,
            party_id: party.party_id,
            kind,
            number: format!("{}-{}", kind.as_str().to_uppercase(), invoice_date),
            invoice_date,
            due_date: None,
            lines,
            subtotal: 0.0,
            tax_total: 0.0,
            net_total: 0.0,
            amount_paid: 0.0,
            status: InvoiceStatus::Unpaid,
            created_at: Utc::now(),
        };
        billbook_core::apply_totals(&mut invoice).expect("valid fixture");
        invoice
    }

    pub fn payment(
        party: &Party,
        direction: PaymentDirection,
        amount: f64,
        payment_date: NaiveDate,
    ) -> Payment {
        Payment {
            payment_id: PaymentId::now_v7(),
            business_id: party.business_id,
            party_id: party.party_id,
            direction,
            amount,
            payment_date,
            mode: PaymentMode::Bank,
            invoice_id: None,
            created_at: Utc::now(),
        }
    }

    /// Customer with 15000 to collect, a 4725 sales invoice, then a 2000
    /// payment received. Running balances: 15000, 19725, 17725.
    pub fn ledger_scenario() -> (Business, Party, Vec<Invoice>, Vec<Payment>) {
        let business = business();
        let party = customer(business.business_id, 15000.0);
        let invoices = vec![invoice(
            &party,
            InvoiceKind::Sales,
            date(2024, 5, 10),
            vec![line(1.0, 4500.0, 5.0)],
        )];
        let payments = vec![payment(
            &party,
            PaymentDirection::Received,
            2000.0,
            date(2024, 5, 20),
        )];
        (business, party, invoices, payments)
    }

    /// Remote holding the ledger scenario, plus a supplier and two items.
    pub fn seeded_remote() -> (InMemoryRemote, Business, Party) {
        let (business, party, invoices, payments) = ledger_scenario();
        let seed = SeedData {
            businesses: vec![business.clone()],
            parties: vec![party.clone(), supplier(business.business_id, 8000.0)],
            items: vec![
                item(business.business_id, "OPC Cement 53", 120.0),
                item(business.business_id, "White Cement", 4.0),
            ],
            invoices,
            payments,
        };
        let remote = InMemoryRemote::from_seed(seed).expect("valid fixture");
        (remote, business, party)
    }

    /// Cache with short timeouts suitable for tests.
    pub fn test_cache_config() -> CacheConfig {
        CacheConfig::default().with_loader_timeout(Duration::from_millis(500))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for Billbook-specific validation.

    use super::*;

    /// Assert that a BillbookResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &BillbookResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a BillbookResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &BillbookResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &BillbookResult<T>) {
        match result {
            Err(BillbookError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a BillbookResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &BillbookResult<T>, entity_type: EntityType) {
        match result {
            Err(BillbookError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    #[track_caller]
    pub fn assert_cache_error<T: std::fmt::Debug>(result: &BillbookResult<T>) {
        match result {
            Err(BillbookError::Cache(_)) => {}
            other => panic!("Expected Cache error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &BillbookResult<T>) {
        match result {
            Err(BillbookError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &BillbookResult<T>) {
        match result {
            Err(BillbookError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert two amounts agree to the paisa.
    #[track_caller]
    pub fn assert_amount_eq(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.005,
            "Expected amount {:.2}, got {:.2}",
            expected,
            actual
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counting_remote_counts_per_operation() {
        let remote = CountingRemote::new(InMemoryRemote::new());
        let business = BusinessId::now_v7();
        remote.parties(business).await.unwrap();
        remote.parties(business).await.unwrap();
        remote.items(business).await.unwrap();

        assert_eq!(remote.calls("parties"), 2);
        assert_eq!(remote.calls("items"), 1);
        assert_eq!(remote.calls("business"), 0);
        assert_eq!(remote.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_remote_recovers_after_budget() {
        let remote = FailingRemote::new(InMemoryRemote::new(), 2);
        let business = BusinessId::now_v7();
        assert!(remote.parties(business).await.is_err());
        assert!(remote.items(business).await.is_err());
        assert!(remote.parties(business).await.is_ok());
    }

    #[test]
    fn test_ledger_scenario_invoice_total() {
        let (_, _, invoices, _) = fixtures::ledger_scenario();
        assertions::assert_amount_eq(invoices[0].net_total, 4725.0);
    }

    #[test]
    fn test_seeded_remote_has_low_stock_item() {
        let (remote, _, _) = fixtures::seeded_remote();
        let snapshot = remote.snapshot().unwrap();
        assert_eq!(snapshot.items.iter().filter(|i| i.is_low_stock()).count(), 1);
        assert_eq!(snapshot.parties.len(), 2);
    }
}
