//! Party ledger and running-balance computation.
//!
//! A ledger is a pure fold: `(opening_balance, transactions) -> balances`.
//! Transactions are ordered by date ascending, ties keep insertion order.
//! Debits increase the balance and credits decrease it, so a positive
//! balance is receivable (Dr) and a negative one payable (Cr).

use crate::totals::round2;
use crate::{
    BalanceSide, Invoice, InvoiceId, InvoiceKind, Party, Payment, PaymentDirection, PaymentId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a ledger transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerSource {
    SalesInvoice(InvoiceId),
    PurchaseInvoice(InvoiceId),
    PaymentReceived(PaymentId),
    PaymentMade(PaymentId),
}

/// The signed effect of one transaction on a party balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LedgerEffect {
    Debit(f64),
    Credit(f64),
}

impl LedgerEffect {
    /// Apply this effect to a balance.
    pub fn apply(self, balance: f64) -> f64 {
        match self {
            Self::Debit(amount) => balance + amount,
            Self::Credit(amount) => balance - amount,
        }
    }

    pub fn debit(self) -> f64 {
        match self {
            Self::Debit(amount) => amount,
            Self::Credit(_) => 0.0,
        }
    }

    pub fn credit(self) -> f64 {
        match self {
            Self::Debit(_) => 0.0,
            Self::Credit(amount) => amount,
        }
    }
}

/// A dated, ledger-affecting transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub date: NaiveDate,
    pub source: LedgerSource,
    pub reference: String,
    pub effect: LedgerEffect,
}

impl LedgerTransaction {
    /// Sales invoices debit the party, purchase invoices credit it.
    pub fn from_invoice(invoice: &Invoice) -> Self {
        let (source, effect) = match invoice.kind {
            InvoiceKind::Sales => (
                LedgerSource::SalesInvoice(invoice.invoice_id),
                LedgerEffect::Debit(invoice.net_total),
            ),
            InvoiceKind::Purchase => (
                LedgerSource::PurchaseInvoice(invoice.invoice_id),
                LedgerEffect::Credit(invoice.net_total),
            ),
        };
        Self {
            date: invoice.invoice_date,
            source,
            reference: invoice.number.clone(),
            effect,
        }
    }

    /// Payments received credit the party, payments made debit it.
    pub fn from_payment(payment: &Payment) -> Self {
        let (source, effect, reference) = match payment.direction {
            PaymentDirection::Received => (
                LedgerSource::PaymentReceived(payment.payment_id),
                LedgerEffect::Credit(payment.amount),
                "Payment In",
            ),
            PaymentDirection::Made => (
                LedgerSource::PaymentMade(payment.payment_id),
                LedgerEffect::Debit(payment.amount),
                "Payment Out",
            ),
        };
        Self {
            date: payment.payment_date,
            source,
            reference: reference.to_string(),
            effect,
        }
    }
}

/// One row of a rendered ledger. The first row carries the opening balance
/// and has no transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub transaction: Option<LedgerTransaction>,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

/// A party ledger with its totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub rows: Vec<LedgerRow>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub closing_balance: f64,
}

/// Sort transactions by date, keeping insertion order for equal dates.
pub fn sort_transactions(transactions: &mut [LedgerTransaction]) {
    // sort_by_key is stable
    transactions.sort_by_key(|tx| tx.date);
}

/// Fold sorted transactions onto an opening balance.
///
/// Returns the opening balance followed by the balance after every
/// transaction, in order. The input order is taken as-is.
pub fn running_balances(opening_balance: f64, transactions: &[LedgerTransaction]) -> Vec<f64> {
    let mut balances = Vec::with_capacity(transactions.len() + 1);
    balances.push(round2(opening_balance));
    transactions.iter().fold(opening_balance, |balance, tx| {
        let next = tx.effect.apply(balance);
        balances.push(round2(next));
        next
    });
    balances
}

/// Build the ledger for a party from its invoices and payments.
///
/// Records belonging to other parties are ignored.
pub fn build_ledger(party: &Party, invoices: &[Invoice], payments: &[Payment]) -> Ledger {
    let mut transactions: Vec<LedgerTransaction> = invoices
        .iter()
        .filter(|invoice| invoice.party_id == party.party_id)
        .map(LedgerTransaction::from_invoice)
        .chain(
            payments
                .iter()
                .filter(|payment| payment.party_id == party.party_id)
                .map(LedgerTransaction::from_payment),
        )
        .collect();
    sort_transactions(&mut transactions);

    let opening = party.signed_opening_balance();
    let balances = running_balances(opening, &transactions);

    let mut rows = Vec::with_capacity(balances.len());
    rows.push(LedgerRow {
        date: party.as_of_date,
        transaction: None,
        debit: 0.0,
        credit: 0.0,
        balance: balances[0],
    });

    let mut total_debit = 0.0;
    let mut total_credit = 0.0;
    for (tx, balance) in transactions.into_iter().zip(balances.iter().skip(1)) {
        total_debit += tx.effect.debit();
        total_credit += tx.effect.credit();
        rows.push(LedgerRow {
            date: tx.date,
            debit: tx.effect.debit(),
            credit: tx.effect.credit(),
            balance: *balance,
            transaction: Some(tx),
        });
    }

    let closing_balance = balances.last().copied().unwrap_or(opening);
    Ledger {
        rows,
        total_debit: round2(total_debit),
        total_credit: round2(total_credit),
        closing_balance,
    }
}

/// Display form of a signed balance: magnitude plus Dr/Cr side.
///
/// Zero is shown as Dr.
pub fn balance_side(balance: f64) -> (f64, BalanceSide) {
    if balance < 0.0 {
        (round2(-balance), BalanceSide::Cr)
    } else {
        (round2(balance), BalanceSide::Dr)
    }
}
