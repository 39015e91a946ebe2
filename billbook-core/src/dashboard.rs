//! Dashboard summary figures derived from listings.

use crate::totals::{balance_due, round2};
use crate::{Invoice, InvoiceKind, Item, Party, PartyType};
use serde::{Deserialize, Serialize};

/// Headline numbers shown on the business dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub customer_count: usize,
    pub supplier_count: usize,
    pub item_count: usize,
    pub low_stock_count: usize,
    /// Net total of the recent sales invoices.
    pub recent_sales: f64,
    /// Net total of the recent purchase invoices.
    pub recent_purchases: f64,
    /// Unpaid amount on recent sales invoices.
    pub receivable_due: f64,
    /// Unpaid amount on recent purchase invoices.
    pub payable_due: f64,
}

/// Summarize parties, items and recent invoices into dashboard figures.
pub fn summarize(parties: &[Party], items: &[Item], invoices: &[Invoice]) -> DashboardSummary {
    let mut summary = DashboardSummary {
        customer_count: parties
            .iter()
            .filter(|p| p.party_type == PartyType::Customer)
            .count(),
        supplier_count: parties
            .iter()
            .filter(|p| p.party_type == PartyType::Supplier)
            .count(),
        item_count: items.len(),
        low_stock_count: items.iter().filter(|i| i.is_low_stock()).count(),
        ..DashboardSummary::default()
    };

    for invoice in invoices {
        let due = balance_due(invoice);
        match invoice.kind {
            InvoiceKind::Sales => {
                summary.recent_sales += invoice.net_total;
                summary.receivable_due += due;
            }
            InvoiceKind::Purchase => {
                summary.recent_purchases += invoice.net_total;
                summary.payable_due += due;
            }
        }
    }

    summary.recent_sales = round2(summary.recent_sales);
    summary.recent_purchases = round2(summary.recent_purchases);
    summary.receivable_due = round2(summary.receivable_due);
    summary.payable_due = round2(summary.payable_due);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BusinessId, EntityIdType, InvoiceId, InvoiceStatus, ItemId, PartyId};
    use chrono::{NaiveDate, Utc};

    fn item(stock: f64, alert: Option<f64>) -> Item {
        Item {
            item_id: ItemId::now_v7(),
            business_id: BusinessId::nil(),
            name: "Rice 25kg".to_string(),
            hsn_code: Some("1006".to_string()),
            unit: "bag".to_string(),
            sale_price: 1450.0,
            purchase_price: 1300.0,
            gst_rate: 5.0,
            stock_quantity: stock,
            low_stock_alert: alert,
        }
    }

    fn invoice(kind: InvoiceKind, net_total: f64, amount_paid: f64) -> Invoice {
        Invoice {
            invoice_id: InvoiceId::now_v7(),
            business_id: BusinessId::nil(),
            party_id: PartyId::nil(),
            kind,
            number: "INV".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            due_date: None,
            lines: vec![],
            subtotal: net_total,
            tax_total: 0.0,
            net_total,
            amount_paid,
            status: InvoiceStatus::Unpaid,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_counts_and_totals() {
        let items = vec![item(2.0, Some(5.0)), item(50.0, Some(5.0)), item(0.0, None)];
        let invoices = vec![
            invoice(InvoiceKind::Sales, 4725.0, 2000.0),
            invoice(InvoiceKind::Sales, 1000.0, 1000.0),
            invoice(InvoiceKind::Purchase, 590.0, 0.0),
        ];

        let summary = summarize(&[], &items, &invoices);
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.recent_sales, 5725.0);
        assert_eq!(summary.receivable_due, 2725.0);
        assert_eq!(summary.recent_purchases, 590.0);
        assert_eq!(summary.payable_due, 590.0);
    }
}
