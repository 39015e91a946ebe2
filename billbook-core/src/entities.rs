//! Core entity structures

use crate::{
    BalanceType, BusinessId, InvoiceId, InvoiceKind, InvoiceStatus, ItemId, PartyId, PartyType,
    PaymentDirection, PaymentId, PaymentMode, Timestamp,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Business - the owning scope for every other record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub business_id: BusinessId,
    pub name: String,
    pub gstin: Option<String>,
    /// State name or code, used to decide between CGST/SGST and IGST.
    pub state: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: Timestamp,
}

/// Party - a customer or supplier of a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub party_id: PartyId,
    pub business_id: BusinessId,
    pub name: String,
    pub party_type: PartyType,
    pub phone: Option<String>,
    pub gstin: Option<String>,
    pub state: Option<String>,
    pub opening_balance: f64,
    pub balance_type: BalanceType,
    pub as_of_date: NaiveDate,
    pub created_at: Timestamp,
}

impl Party {
    /// Opening balance with the Dr-positive / Cr-negative convention applied.
    pub fn signed_opening_balance(&self) -> f64 {
        self.opening_balance * self.balance_type.sign()
    }
}

/// Item - a product or service that can appear on an invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub business_id: BusinessId,
    pub name: String,
    pub hsn_code: Option<String>,
    pub unit: String,
    pub sale_price: f64,
    pub purchase_price: f64,
    /// GST rate in percent.
    pub gst_rate: f64,
    pub stock_quantity: f64,
    pub low_stock_alert: Option<f64>,
}

impl Item {
    /// True when a low-stock threshold is set and stock is at or below it.
    pub fn is_low_stock(&self) -> bool {
        self.low_stock_alert
            .map(|threshold| self.stock_quantity <= threshold)
            .unwrap_or(false)
    }
}

/// One line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub item_id: Option<ItemId>,
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    #[serde(default)]
    pub discount_percent: f64,
    pub gst_rate: f64,
}

/// Invoice - a sales or purchase document with computed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: InvoiceId,
    pub business_id: BusinessId,
    pub party_id: PartyId,
    pub kind: InvoiceKind,
    pub number: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: f64,
    pub tax_total: f64,
    pub net_total: f64,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub created_at: Timestamp,
}

/// Payment - money received from or paid to a party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub business_id: BusinessId,
    pub party_id: PartyId,
    pub direction: PaymentDirection,
    pub amount: f64,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub mode: PaymentMode,
    pub invoice_id: Option<InvoiceId>,
    pub created_at: Timestamp,
}
