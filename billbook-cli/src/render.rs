//! Plain-text rendering of command output.

use billbook_core::{balance_side, Business, DashboardSummary, Ledger, LedgerSource};
use std::fmt::Write;

pub fn dashboard(business: Option<&Business>, summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let name = business.map(|b| b.name.as_str()).unwrap_or("(unknown business)");
    let _ = writeln!(out, "{}", name);
    let _ = writeln!(out, "{}", "=".repeat(name.len().max(8)));
    let _ = writeln!(out, "Customers          {:>12}", summary.customer_count);
    let _ = writeln!(out, "Suppliers          {:>12}", summary.supplier_count);
    let _ = writeln!(
        out,
        "Items              {:>12}  ({} low on stock)",
        summary.item_count, summary.low_stock_count
    );
    let _ = writeln!(out, "Recent sales       {:>12.2}", summary.recent_sales);
    let _ = writeln!(out, "Recent purchases   {:>12.2}", summary.recent_purchases);
    let _ = writeln!(out, "To collect         {:>12.2}", summary.receivable_due);
    let _ = writeln!(out, "To pay             {:>12.2}", summary.payable_due);
    out
}

fn particulars(source: &LedgerSource) -> &'static str {
    match source {
        LedgerSource::SalesInvoice(_) => "Sales",
        LedgerSource::PurchaseInvoice(_) => "Purchase",
        LedgerSource::PaymentReceived(_) => "Payment in",
        LedgerSource::PaymentMade(_) => "Payment out",
    }
}

pub fn ledger(party_name: &str, ledger: &Ledger) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ledger: {}", party_name);
    let _ = writeln!(
        out,
        "{:<10}  {:<12}  {:<14}  {:>12}  {:>12}  {:>15}",
        "Date", "Particulars", "Reference", "Debit", "Credit", "Balance"
    );
    for row in &ledger.rows {
        let (particulars, reference) = match &row.transaction {
            Some(tx) => (particulars(&tx.source), tx.reference.as_str()),
            None => ("Opening", ""),
        };
        let (amount, side) = balance_side(row.balance);
        let _ = writeln!(
            out,
            "{:<10}  {:<12}  {:<14}  {:>12.2}  {:>12.2}  {:>12.2} {}",
            row.date, particulars, reference, row.debit, row.credit, amount, side
        );
    }
    let (closing, side) = balance_side(ledger.closing_balance);
    let _ = writeln!(
        out,
        "Totals{:<34}  {:>12.2}  {:>12.2}  {:>12.2} {}",
        "", ledger.total_debit, ledger.total_credit, closing, side
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger_shows_opening_row() {
        let party = billbook_core::Party {
            party_id: billbook_core::EntityIdType::nil(),
            business_id: billbook_core::EntityIdType::nil(),
            name: "Walk-in".to_string(),
            party_type: billbook_core::PartyType::Customer,
            phone: None,
            gstin: None,
            state: None,
            opening_balance: 250.0,
            balance_type: billbook_core::BalanceType::ToPay,
            as_of_date: Default::default(),
            created_at: Default::default(),
        };
        let ledger = billbook_core::build_ledger(&party, &[], &[]);
        let text = super::ledger(&party.name, &ledger);
        assert!(text.contains("Opening"));
        assert!(text.contains("250.00 Cr"));
    }
}
