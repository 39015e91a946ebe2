//! Enum types shared across Billbook crates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity type discriminator, used in errors and invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Business,
    Party,
    Item,
    Invoice,
    Payment,
}

/// Whether a party buys from or sells to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Customer,
    Supplier,
}

/// Direction of a party's opening balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    /// The party owes the business (receivable, Dr).
    #[default]
    ToCollect,
    /// The business owes the party (payable, Cr).
    ToPay,
}

impl BalanceType {
    /// Signed multiplier applied to an opening balance amount.
    pub fn sign(self) -> f64 {
        match self {
            Self::ToCollect => 1.0,
            Self::ToPay => -1.0,
        }
    }
}

/// Sales or purchase invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Sales,
    Purchase,
}

impl InvoiceKind {
    /// Stable name used in cache keys and wire formats.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Purchase => "purchase",
        }
    }

    pub const ALL: [InvoiceKind; 2] = [InvoiceKind::Sales, InvoiceKind::Purchase];
}

impl fmt::Display for InvoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
}

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    Received,
    Made,
}

/// How a payment was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    Cash,
    Bank,
    Upi,
    Cheque,
}

/// Display side of a ledger balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceSide {
    /// Debit: the party owes the business.
    Dr,
    /// Credit: the business owes the party.
    Cr,
}

impl fmt::Display for BalanceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dr => f.write_str("Dr"),
            Self::Cr => f.write_str("Cr"),
        }
    }
}
