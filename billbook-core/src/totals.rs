//! Invoice arithmetic: line totals, GST, and payment status.
//!
//! Amounts are rupees in `f64`, rounded to two decimals at each line and
//! again on the invoice sums.

use crate::{BillbookResult, Invoice, InvoiceLine, InvoiceStatus, ValidationError};

/// Standard GST slabs in percent.
pub const GST_SLABS: [f64; 7] = [0.0, 0.25, 3.0, 5.0, 12.0, 18.0, 28.0];

const EPSILON: f64 = 1e-9;

/// Round to two decimals, half away from zero.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Totals for one invoice line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTotals {
    pub gross: f64,
    pub discount: f64,
    pub taxable: f64,
    pub tax: f64,
    pub total: f64,
}

/// Totals for a whole invoice.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_total: f64,
    pub net_total: f64,
}

/// How the tax on an invoice is split between the GST components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GstSplit {
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
}

/// Returns true if `rate` is one of the standard GST slabs.
pub fn is_standard_gst_rate(rate: f64) -> bool {
    GST_SLABS.iter().any(|slab| (slab - rate).abs() < EPSILON)
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate a line's inputs without computing anything.
pub fn validate_line(line: &InvoiceLine) -> BillbookResult<()> {
    if !line.quantity.is_finite() || line.quantity < 0.0 {
        return Err(invalid("quantity", "must be a non-negative number").into());
    }
    if !line.rate.is_finite() || line.rate < 0.0 {
        return Err(invalid("rate", "must be a non-negative number").into());
    }
    if !(0.0..=100.0).contains(&line.discount_percent) {
        return Err(invalid("discount_percent", "must be between 0 and 100").into());
    }
    if !is_standard_gst_rate(line.gst_rate) {
        return Err(ValidationError::UnsupportedGstRate {
            rate: line.gst_rate,
        }
        .into());
    }
    Ok(())
}

/// Compute gross, discount, taxable value, tax and total for a line.
pub fn compute_line(line: &InvoiceLine) -> BillbookResult<LineTotals> {
    validate_line(line)?;

    let gross = round2(line.quantity * line.rate);
    let discount = round2(gross * line.discount_percent / 100.0);
    let taxable = round2(gross - discount);
    let tax = round2(taxable * line.gst_rate / 100.0);

    Ok(LineTotals {
        gross,
        discount,
        taxable,
        tax,
        total: round2(taxable + tax),
    })
}

/// Compute subtotal, tax and net total for a set of lines.
///
/// An invoice with no lines is rejected.
pub fn compute_invoice(lines: &[InvoiceLine]) -> BillbookResult<InvoiceTotals> {
    if lines.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "lines".to_string(),
        }
        .into());
    }

    let mut subtotal = 0.0;
    let mut tax_total = 0.0;
    for line in lines {
        let totals = compute_line(line)?;
        subtotal += totals.taxable;
        tax_total += totals.tax;
    }

    let subtotal = round2(subtotal);
    let tax_total = round2(tax_total);
    Ok(InvoiceTotals {
        subtotal,
        tax_total,
        net_total: round2(subtotal + tax_total),
    })
}

/// Split a tax amount into CGST/SGST halves (same state) or IGST.
///
/// A party with no recorded state is treated as intra-state.
pub fn split_gst(tax_total: f64, business_state: &str, party_state: Option<&str>) -> GstSplit {
    let same_state = party_state
        .map(|state| state.trim().eq_ignore_ascii_case(business_state.trim()))
        .unwrap_or(true);

    if same_state {
        let cgst = round2(tax_total / 2.0);
        GstSplit {
            cgst,
            sgst: round2(tax_total - cgst),
            igst: 0.0,
        }
    } else {
        GstSplit {
            igst: round2(tax_total),
            ..GstSplit::default()
        }
    }
}

/// Status implied by a net total and the amount paid against it.
pub fn derive_status(net_total: f64, amount_paid: f64) -> InvoiceStatus {
    if round2(net_total - amount_paid) <= 0.0 {
        InvoiceStatus::Paid
    } else if amount_paid > 0.0 {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Unpaid
    }
}

/// Outstanding amount on an invoice, never negative.
pub fn balance_due(invoice: &Invoice) -> f64 {
    round2(invoice.net_total - invoice.amount_paid).max(0.0)
}

/// Recompute totals and status on an invoice in place.
pub fn apply_totals(invoice: &mut Invoice) -> BillbookResult<InvoiceTotals> {
    let totals = compute_invoice(&invoice.lines)?;
    invoice.subtotal = totals.subtotal;
    invoice.tax_total = totals.tax_total;
    invoice.net_total = totals.net_total;
    invoice.status = derive_status(totals.net_total, invoice.amount_paid);
    Ok(totals)
}
