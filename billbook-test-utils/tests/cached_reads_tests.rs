//! End-to-end behaviour of cached reads over instrumented remotes.

use std::sync::Arc;
use std::time::Duration;

use billbook_core::{running_balances, LedgerTransaction};
use billbook_test_utils::assertions::{
    assert_amount_eq, assert_cache_error, assert_not_found, assert_storage_error,
};
use billbook_test_utils::fixtures::{self, date, seeded_remote, test_cache_config};
use billbook_test_utils::{
    CacheKey, CacheStore, CachedReads, CountingRemote, DelayedRemote, EntityIdType, EntityType,
    FailingRemote, InMemoryRemote, InvoiceKind, ManualClock, PartyId, PaymentDirection,
    RemoteSource,
};

fn counting_reads() -> (
    CachedReads<CountingRemote<InMemoryRemote>>,
    Arc<CountingRemote<InMemoryRemote>>,
    billbook_test_utils::Business,
    billbook_test_utils::Party,
) {
    let (remote, business, party) = seeded_remote();
    let remote = Arc::new(CountingRemote::new(remote));
    let reads = CachedReads::new(Arc::clone(&remote), CacheStore::new(test_cache_config()));
    (reads, remote, business, party)
}

#[tokio::test]
async fn second_read_is_served_from_memory() {
    let (reads, remote, business, _) = counting_reads();

    let first = reads.parties(business.business_id).await;
    let second = reads.parties(business.business_id).await;

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(remote.calls("parties"), 1);
}

#[tokio::test]
async fn concurrent_dashboards_share_remote_reads() {
    let (reads, remote, business, _) = counting_reads();

    let (a, b) = tokio::join!(
        reads.dashboard(business.business_id),
        reads.dashboard(business.business_id)
    );

    assert_eq!(a, b);
    assert_eq!(a.customer_count, 1);
    assert_eq!(a.supplier_count, 1);
    assert_eq!(a.item_count, 2);
    assert_eq!(a.low_stock_count, 1);
    assert_amount_eq(a.recent_sales, 4725.0);
    assert_eq!(remote.calls("parties"), 1);
    assert_eq!(remote.calls("items"), 1);
    // One read per invoice kind.
    assert_eq!(remote.calls("recent_invoices"), 2);
}

#[tokio::test]
async fn failed_read_is_empty_and_retried() {
    let (remote, business, _) = seeded_remote();
    let reads = CachedReads::new(
        Arc::new(FailingRemote::new(remote, 1)),
        CacheStore::new(test_cache_config()),
    );

    assert!(reads.items(business.business_id).await.is_empty());
    assert_eq!(reads.items(business.business_id).await.len(), 2);
}

#[tokio::test]
async fn slow_remote_times_out_to_empty() {
    let (remote, business, _) = seeded_remote();
    let config = test_cache_config().with_loader_timeout(Duration::from_millis(20));
    let reads = CachedReads::new(
        Arc::new(DelayedRemote::new(remote, Duration::from_millis(200))),
        CacheStore::new(config),
    );

    assert!(reads.business(business.business_id).await.is_none());
    assert_eq!(reads.store().stats().load_failures, 1);
}

#[tokio::test]
async fn invoice_change_reloads_listings_but_not_profile() {
    let (reads, remote, business, party) = counting_reads();
    let business_id = business.business_id;

    reads.business(business_id).await;
    let before = reads
        .recent_invoices(business_id, InvoiceKind::Sales, 5)
        .await;
    assert_eq!(before.len(), 1);

    remote
        .inner()
        .insert_invoice(fixtures::invoice(
            &party,
            InvoiceKind::Sales,
            date(2024, 6, 1),
            vec![fixtures::line(2.0, 100.0, 18.0)],
        ))
        .unwrap();

    // Still the cached listing until the change is reported.
    assert_eq!(
        reads
            .recent_invoices(business_id, InvoiceKind::Sales, 5)
            .await
            .len(),
        1
    );

    reads.invoice_changed(business_id);
    let after = reads
        .recent_invoices(business_id, InvoiceKind::Sales, 5)
        .await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].invoice_date, date(2024, 6, 1));

    reads.business(business_id).await;
    assert_eq!(remote.calls("business"), 1);
    assert_eq!(remote.calls("recent_invoices"), 2);
}

#[tokio::test]
async fn ttl_classes_expire_independently() {
    let (remote, business, _) = seeded_remote();
    let remote = Arc::new(CountingRemote::new(remote));
    let clock = Arc::new(ManualClock::starting_now());
    let store = CacheStore::with_clock(test_cache_config(), clock.clone());
    let reads = CachedReads::new(Arc::clone(&remote), store);
    let business_id = business.business_id;

    reads.parties(business_id).await;
    reads.business(business_id).await;

    // Past the entity TTL, inside the profile TTL.
    clock.advance(reads.store().config().entity_ttl + Duration::from_secs(1));
    reads.parties(business_id).await;
    reads.business(business_id).await;

    assert_eq!(remote.calls("parties"), 2);
    assert_eq!(remote.calls("business"), 1);
}

#[tokio::test]
async fn party_ledger_running_balances() {
    let (reads, remote, business, party) = counting_reads();

    let ledger = reads
        .party_ledger(business.business_id, party.party_id)
        .await
        .unwrap();

    let balances: Vec<f64> = ledger.rows.iter().map(|row| row.balance).collect();
    assert_eq!(balances, vec![15000.0, 19725.0, 17725.0]);
    assert_amount_eq(ledger.closing_balance, 17725.0);
    assert_amount_eq(ledger.total_debit, 4725.0);
    assert_amount_eq(ledger.total_credit, 2000.0);

    // Ledger entries are read fresh every time.
    reads
        .party_ledger(business.business_id, party.party_id)
        .await
        .unwrap();
    assert_eq!(remote.calls("party_invoices"), 2);
    assert_eq!(remote.calls("parties"), 1);
}

#[tokio::test]
async fn ledger_reflects_new_payment_without_invalidation() {
    let (reads, remote, business, party) = counting_reads();
    remote
        .inner()
        .insert_payment(fixtures::payment(
            &party,
            PaymentDirection::Received,
            725.0,
            date(2024, 5, 25),
        ))
        .unwrap();

    let ledger = reads
        .party_ledger(business.business_id, party.party_id)
        .await
        .unwrap();
    assert_amount_eq(ledger.closing_balance, 17000.0);
}

#[tokio::test]
async fn unknown_party_ledger_is_not_found() {
    let (reads, _, business, _) = counting_reads();
    let result = reads
        .party_ledger(business.business_id, PartyId::now_v7())
        .await;
    assert_not_found(&result, EntityType::Party);
}

#[tokio::test]
async fn ledger_matches_direct_fold() {
    let (remote, business, party) = seeded_remote();
    let invoices = remote
        .party_invoices(business.business_id, party.party_id)
        .await
        .unwrap();
    let payments = remote
        .party_payments(business.business_id, party.party_id)
        .await
        .unwrap();

    let mut transactions: Vec<LedgerTransaction> = invoices
        .iter()
        .map(LedgerTransaction::from_invoice)
        .chain(payments.iter().map(LedgerTransaction::from_payment))
        .collect();
    billbook_core::sort_transactions(&mut transactions);
    let direct = running_balances(party.signed_opening_balance(), &transactions);

    let reads = CachedReads::new(Arc::new(remote), CacheStore::new(test_cache_config()));
    let ledger = reads
        .party_ledger(business.business_id, party.party_id)
        .await
        .unwrap();
    let cached: Vec<f64> = ledger.rows.iter().map(|row| row.balance).collect();
    assert_eq!(cached, direct);
}

#[tokio::test]
async fn ledger_surfaces_remote_failure() {
    let (remote, business, party) = seeded_remote();
    let reads = CachedReads::new(
        Arc::new(FailingRemote::always(remote)),
        CacheStore::new(test_cache_config()),
    );

    let result = reads
        .party_ledger(business.business_id, party.party_id)
        .await;
    assert_storage_error(&result);
}

#[tokio::test]
async fn try_fetch_reports_slow_remote_as_cache_error() {
    let (remote, business, _) = seeded_remote();
    let remote = Arc::new(DelayedRemote::new(remote, Duration::from_millis(200)));
    let config = test_cache_config().with_loader_timeout(Duration::from_millis(20));
    let store = CacheStore::new(config);
    let key = CacheKey::items(business.business_id).to_string();

    let loader_remote = Arc::clone(&remote);
    let business_id = business.business_id;
    let result = store
        .try_fetch_or_load(
            &key,
            move || async move { loader_remote.items(business_id).await },
            Duration::from_secs(60),
        )
        .await;
    assert_cache_error(&result);
    assert!(!store.is_loading(&key));
}
