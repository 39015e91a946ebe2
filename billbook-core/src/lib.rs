//! Billbook Core - Entity Types and Pure Computation
//!
//! Data structures shared by every Billbook crate, plus the pure
//! arithmetic built on them: invoice totals and the party ledger fold.
//! Nothing in this crate performs I/O.

pub mod dashboard;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod totals;

pub use dashboard::{summarize, DashboardSummary};
pub use entities::{Business, Invoice, InvoiceLine, Item, Party, Payment};
pub use enums::{
    BalanceSide, BalanceType, EntityType, InvoiceKind, InvoiceStatus, PartyType,
    PaymentDirection, PaymentMode,
};
pub use error::{
    BillbookError, BillbookResult, CacheError, ConfigError, StorageError, ValidationError,
};
pub use identity::{
    new_entity_id, BusinessId, EntityId, EntityIdType, InvoiceId, ItemId, PartyId, PaymentId,
    Timestamp,
};
pub use ledger::{
    balance_side, build_ledger, running_balances, sort_transactions, Ledger, LedgerEffect,
    LedgerRow, LedgerSource, LedgerTransaction,
};
pub use totals::{
    apply_totals, balance_due, compute_invoice, compute_line, derive_status, round2, split_gst,
    GstSplit, InvoiceTotals, LineTotals, GST_SLABS,
};

// =============================================================================
// PROPERTY TESTS
// =============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn arb_effect() -> impl Strategy<Value = LedgerEffect> {
        prop_oneof![
            (0u32..1_000_000).prop_map(|paise| LedgerEffect::Debit(paise as f64 / 100.0)),
            (0u32..1_000_000).prop_map(|paise| LedgerEffect::Credit(paise as f64 / 100.0)),
        ]
    }

    fn arb_transaction() -> impl Strategy<Value = LedgerTransaction> {
        (0i64..365, arb_effect()).prop_map(|(offset, effect)| {
            let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap_or_default();
            LedgerTransaction {
                date: start + chrono::Duration::days(offset),
                source: LedgerSource::PaymentReceived(PaymentId::nil()),
                reference: "tx".to_string(),
                effect,
            }
        })
    }

    proptest! {
        /// One balance per transaction plus the opening balance.
        #[test]
        fn prop_running_balances_length(
            opening in -100_000i64..100_000,
            txs in prop::collection::vec(arb_transaction(), 0..40),
        ) {
            let balances = running_balances(opening as f64, &txs);
            prop_assert_eq!(balances.len(), txs.len() + 1);
            prop_assert_eq!(balances[0], opening as f64);
        }

        /// The closing balance equals opening + debits - credits.
        #[test]
        fn prop_closing_balance_matches_totals(
            opening in -100_000i64..100_000,
            mut txs in prop::collection::vec(arb_transaction(), 0..40),
        ) {
            sort_transactions(&mut txs);
            let balances = running_balances(opening as f64, &txs);
            let debits: f64 = txs.iter().map(|tx| tx.effect.debit()).sum();
            let credits: f64 = txs.iter().map(|tx| tx.effect.credit()).sum();
            let expected = round2(opening as f64 + debits - credits);
            let closing = balances.last().copied().unwrap_or_default();
            prop_assert!((closing - expected).abs() < 0.011);
        }

        /// Sorting yields non-decreasing dates.
        #[test]
        fn prop_sort_is_chronological(mut txs in prop::collection::vec(arb_transaction(), 0..40)) {
            sort_transactions(&mut txs);
            for pair in txs.windows(2) {
                prop_assert!(pair[0].date <= pair[1].date);
            }
        }

        /// Net total is always subtotal plus tax.
        #[test]
        fn prop_invoice_net_is_subtotal_plus_tax(
            quantity in 0u32..1000,
            rate_paise in 0u32..10_000_000,
            slab in 0usize..GST_SLABS.len(),
        ) {
            let line = InvoiceLine {
                item_id: None,
                description: "line".to_string(),
                quantity: quantity as f64,
                rate: rate_paise as f64 / 100.0,
                discount_percent: 0.0,
                gst_rate: GST_SLABS[slab],
            };
            let totals = compute_invoice(&[line]).unwrap();
            prop_assert_eq!(totals.net_total, round2(totals.subtotal + totals.tax_total));
        }
    }
}
