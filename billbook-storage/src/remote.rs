//! In-memory remote source for tests and the offline CLI.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use billbook_core::{
    apply_totals, round2, BillbookResult, Business, BusinessId, Invoice, InvoiceId, InvoiceKind,
    Item, Party, PartyId, Payment, StorageError,
};
use serde::{Deserialize, Serialize};

use crate::cache::RemoteSource;

/// Records loaded into an [`InMemoryRemote`], usually from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub businesses: Vec<Business>,
    pub parties: Vec<Party>,
    pub items: Vec<Item>,
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
}

impl SeedData {
    /// Read seed data from a JSON file.
    pub fn load(path: &Path) -> BillbookResult<Self> {
        let persistence = |reason: String| StorageError::Persistence {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| persistence(e.to_string()))?;
        let seed = serde_json::from_str(&contents).map_err(|e| persistence(e.to_string()))?;
        Ok(seed)
    }
}

/// Remote source backed by in-process maps.
///
/// Records keep insertion order. Inserting a record with an id that already
/// exists replaces it in place.
///
/// An invoice's `amount_paid` is derived: it is always the sum of the
/// payments linked to it through `invoice_id`, whatever the inserted record
/// carried. A snapshot can therefore be fed back in as seed data.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    data: RwLock<SeedData>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a remote from seed data. Invoice totals are recomputed from
    /// their lines and seeded payments are applied to their invoices.
    pub fn from_seed(seed: SeedData) -> BillbookResult<Self> {
        let remote = Self::new();
        {
            let mut data = remote.write()?;
            data.businesses = seed.businesses;
            data.parties = seed.parties;
            data.items = seed.items;
        }
        for invoice in seed.invoices {
            remote.insert_invoice(invoice)?;
        }
        for payment in seed.payments {
            remote.insert_payment(payment)?;
        }
        Ok(remote)
    }

    fn read(&self) -> BillbookResult<RwLockReadGuard<'_, SeedData>> {
        self.data
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> BillbookResult<RwLockWriteGuard<'_, SeedData>> {
        self.data
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    pub fn insert_business(&self, business: Business) -> BillbookResult<()> {
        let mut data = self.write()?;
        upsert(&mut data.businesses, business, |b| b.business_id);
        Ok(())
    }

    pub fn insert_party(&self, party: Party) -> BillbookResult<()> {
        let mut data = self.write()?;
        upsert(&mut data.parties, party, |p| p.party_id);
        Ok(())
    }

    pub fn insert_item(&self, item: Item) -> BillbookResult<()> {
        let mut data = self.write()?;
        upsert(&mut data.items, item, |i| i.item_id);
        Ok(())
    }

    /// Insert an invoice after validating its lines and recomputing totals.
    pub fn insert_invoice(&self, mut invoice: Invoice) -> BillbookResult<()> {
        let mut data = self.write()?;
        invoice.amount_paid = linked_total(&data.payments, invoice.invoice_id);
        apply_totals(&mut invoice)?;
        upsert(&mut data.invoices, invoice, |i| i.invoice_id);
        Ok(())
    }

    /// Insert a payment and refresh the paid amount and status of the
    /// invoice it is linked to. Replacing a payment also refreshes the
    /// invoice the old record pointed at.
    pub fn insert_payment(&self, payment: Payment) -> BillbookResult<()> {
        let mut data = self.write()?;
        let previous = data
            .payments
            .iter()
            .find(|existing| existing.payment_id == payment.payment_id)
            .and_then(|existing| existing.invoice_id);
        let current = payment.invoice_id;
        upsert(&mut data.payments, payment, |p| p.payment_id);

        let SeedData {
            invoices, payments, ..
        } = &mut *data;
        for invoice_id in previous.into_iter().chain(current) {
            refresh_paid(invoices, payments, invoice_id)?;
        }
        Ok(())
    }

    /// Snapshot of everything stored.
    pub fn snapshot(&self) -> BillbookResult<SeedData> {
        Ok(self.read()?.clone())
    }
}

fn linked_total(payments: &[Payment], invoice_id: InvoiceId) -> f64 {
    round2(
        payments
            .iter()
            .filter(|payment| payment.invoice_id == Some(invoice_id))
            .map(|payment| payment.amount)
            .sum(),
    )
}

fn refresh_paid(
    invoices: &mut [Invoice],
    payments: &[Payment],
    invoice_id: InvoiceId,
) -> BillbookResult<()> {
    if let Some(invoice) = invoices
        .iter_mut()
        .find(|invoice| invoice.invoice_id == invoice_id)
    {
        invoice.amount_paid = linked_total(payments, invoice_id);
        apply_totals(invoice)?;
    }
    Ok(())
}

fn upsert<T, K: PartialEq>(records: &mut Vec<T>, record: T, id: impl Fn(&T) -> K) {
    let key = id(&record);
    match records.iter_mut().find(|existing| id(existing) == key) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

#[async_trait]
impl RemoteSource for InMemoryRemote {
    async fn parties(&self, business_id: BusinessId) -> BillbookResult<Vec<Party>> {
        let data = self.read()?;
        Ok(data
            .parties
            .iter()
            .filter(|party| party.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn items(&self, business_id: BusinessId) -> BillbookResult<Vec<Item>> {
        let data = self.read()?;
        Ok(data
            .items
            .iter()
            .filter(|item| item.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn business(&self, business_id: BusinessId) -> BillbookResult<Option<Business>> {
        let data = self.read()?;
        Ok(data
            .businesses
            .iter()
            .find(|business| business.business_id == business_id)
            .cloned())
    }

    async fn recent_invoices(
        &self,
        business_id: BusinessId,
        kind: InvoiceKind,
        limit: usize,
    ) -> BillbookResult<Vec<Invoice>> {
        let data = self.read()?;
        let mut invoices: Vec<Invoice> = data
            .invoices
            .iter()
            .filter(|invoice| invoice.business_id == business_id && invoice.kind == kind)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.invoice_date
                .cmp(&a.invoice_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        invoices.truncate(limit);
        Ok(invoices)
    }

    async fn party_invoices(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Invoice>> {
        let data = self.read()?;
        Ok(data
            .invoices
            .iter()
            .filter(|invoice| invoice.business_id == business_id && invoice.party_id == party_id)
            .cloned()
            .collect())
    }

    async fn party_payments(
        &self,
        business_id: BusinessId,
        party_id: PartyId,
    ) -> BillbookResult<Vec<Payment>> {
        let data = self.read()?;
        Ok(data
            .payments
            .iter()
            .filter(|payment| payment.business_id == business_id && payment.party_id == party_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::{
        BalanceType, EntityIdType, InvoiceId, InvoiceLine, InvoiceStatus, ItemId, PartyType,
        PaymentDirection, PaymentId, PaymentMode,
    };
    use chrono::{NaiveDate, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn party(business_id: BusinessId) -> Party {
        Party {
            party_id: PartyId::now_v7(),
            business_id,
            name: "Sharma Traders".to_string(),
            party_type: PartyType::Customer,
            phone: None,
            gstin: None,
            state: Some("Maharashtra".to_string()),
            opening_balance: 0.0,
            balance_type: BalanceType::ToCollect,
            as_of_date: date(1),
            created_at: Utc::now(),
        }
    }

    fn invoice(business_id: BusinessId, party_id: PartyId, kind: InvoiceKind, day: u32) -> Invoice {
        Invoice {
            invoice_id: InvoiceId::now_v7(),
            business_id,
            party_id,
            kind,
            number: format!("INV-{}", day),
            invoice_date: date(day),
            due_date: None,
            lines: vec![InvoiceLine {
                item_id: Some(ItemId::now_v7()),
                description: "Cement bag".to_string(),
                quantity: 10.0,
                rate: 400.0,
                discount_percent: 0.0,
                gst_rate: 18.0,
            }],
            subtotal: 0.0,
            tax_total: 0.0,
            net_total: 0.0,
            amount_paid: 0.0,
            status: InvoiceStatus::Unpaid,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_listings_are_scoped_to_business() {
        let remote = InMemoryRemote::new();
        let mine = BusinessId::now_v7();
        let theirs = BusinessId::now_v7();
        remote.insert_party(party(mine)).unwrap();
        remote.insert_party(party(theirs)).unwrap();

        let parties = remote.parties(mine).await.unwrap();
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].business_id, mine);
        assert!(remote.business(mine).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_record() {
        let remote = InMemoryRemote::new();
        let business = BusinessId::now_v7();
        let mut p = party(business);
        remote.insert_party(p.clone()).unwrap();
        p.name = "Sharma & Sons".to_string();
        remote.insert_party(p.clone()).unwrap();

        let parties = remote.parties(business).await.unwrap();
        assert_eq!(parties, vec![p]);
    }

    #[tokio::test]
    async fn test_recent_invoices_newest_first_and_limited() {
        let remote = InMemoryRemote::new();
        let business = BusinessId::now_v7();
        let p = party(business);
        for day in [3, 9, 1, 7] {
            remote
                .insert_invoice(invoice(business, p.party_id, InvoiceKind::Sales, day))
                .unwrap();
        }
        remote
            .insert_invoice(invoice(business, p.party_id, InvoiceKind::Purchase, 10))
            .unwrap();

        let recent = remote
            .recent_invoices(business, InvoiceKind::Sales, 2)
            .await
            .unwrap();
        let days: Vec<_> = recent.iter().map(|i| i.invoice_date).collect();
        assert_eq!(days, vec![date(9), date(7)]);
        assert_eq!(recent[0].net_total, 4720.0);
    }

    #[tokio::test]
    async fn test_payment_against_invoice_updates_status() {
        let remote = InMemoryRemote::new();
        let business = BusinessId::now_v7();
        let p = party(business);
        let inv = invoice(business, p.party_id, InvoiceKind::Sales, 2);
        let invoice_id = inv.invoice_id;
        remote.insert_invoice(inv).unwrap();

        remote
            .insert_payment(Payment {
                payment_id: PaymentId::now_v7(),
                business_id: business,
                party_id: p.party_id,
                direction: PaymentDirection::Received,
                amount: 1000.0,
                payment_date: date(3),
                mode: PaymentMode::Upi,
                invoice_id: Some(invoice_id),
                created_at: Utc::now(),
            })
            .unwrap();

        let invoices = remote.party_invoices(business, p.party_id).await.unwrap();
        assert_eq!(invoices[0].amount_paid, 1000.0);
        assert_eq!(invoices[0].status, InvoiceStatus::Partial);
        assert_eq!(remote.party_payments(business, p.party_id).await.unwrap().len(), 1);
    }

    fn linked_payment(
        business_id: BusinessId,
        party_id: PartyId,
        invoice_id: InvoiceId,
        amount: f64,
    ) -> Payment {
        Payment {
            payment_id: PaymentId::now_v7(),
            business_id,
            party_id,
            direction: PaymentDirection::Received,
            amount,
            payment_date: date(4),
            mode: PaymentMode::Cash,
            invoice_id: Some(invoice_id),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_seeded_payment_applies_to_invoice() {
        let business = BusinessId::now_v7();
        let p = party(business);
        let inv = invoice(business, p.party_id, InvoiceKind::Sales, 2);
        let payment = linked_payment(business, p.party_id, inv.invoice_id, 600.0);
        let seed = SeedData {
            parties: vec![p.clone()],
            invoices: vec![inv],
            payments: vec![payment],
            ..SeedData::default()
        };

        let remote = InMemoryRemote::from_seed(seed).unwrap();
        let invoices = remote.party_invoices(business, p.party_id).await.unwrap();
        assert_eq!(invoices[0].amount_paid, 600.0);
        assert_eq!(invoices[0].status, InvoiceStatus::Partial);
        assert_eq!(remote.party_payments(business, p.party_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reinserted_payment_is_not_counted_twice() {
        let remote = InMemoryRemote::new();
        let business = BusinessId::now_v7();
        let p = party(business);
        let inv = invoice(business, p.party_id, InvoiceKind::Sales, 2);
        let invoice_id = inv.invoice_id;
        remote.insert_invoice(inv).unwrap();
        let mut payment = linked_payment(business, p.party_id, invoice_id, 600.0);

        remote.insert_payment(payment.clone()).unwrap();
        remote.insert_payment(payment.clone()).unwrap();
        let invoices = remote.party_invoices(business, p.party_id).await.unwrap();
        assert_eq!(invoices[0].amount_paid, 600.0);
        assert_eq!(invoices[0].status, InvoiceStatus::Partial);
        assert_eq!(remote.party_payments(business, p.party_id).await.unwrap().len(), 1);

        payment.amount = 4720.0;
        remote.insert_payment(payment).unwrap();
        let invoices = remote.party_invoices(business, p.party_id).await.unwrap();
        assert_eq!(invoices[0].amount_paid, 4720.0);
        assert_eq!(invoices[0].status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_replaced_invoice_keeps_linked_payments() {
        let remote = InMemoryRemote::new();
        let business = BusinessId::now_v7();
        let p = party(business);
        let mut inv = invoice(business, p.party_id, InvoiceKind::Sales, 2);
        remote.insert_invoice(inv.clone()).unwrap();
        remote
            .insert_payment(linked_payment(business, p.party_id, inv.invoice_id, 1000.0))
            .unwrap();

        inv.number = "INV-2A".to_string();
        remote.insert_invoice(inv).unwrap();
        let invoices = remote.party_invoices(business, p.party_id).await.unwrap();
        assert_eq!(invoices[0].number, "INV-2A");
        assert_eq!(invoices[0].amount_paid, 1000.0);
    }

    #[tokio::test]
    async fn test_snapshot_reseeds_without_double_counting() {
        let business = BusinessId::now_v7();
        let p = party(business);
        let inv = invoice(business, p.party_id, InvoiceKind::Sales, 2);
        let payment = linked_payment(business, p.party_id, inv.invoice_id, 600.0);
        let remote = InMemoryRemote::from_seed(SeedData {
            invoices: vec![inv],
            payments: vec![payment],
            ..SeedData::default()
        })
        .unwrap();

        let reseeded = InMemoryRemote::from_seed(remote.snapshot().unwrap()).unwrap();
        let invoices = reseeded.party_invoices(business, p.party_id).await.unwrap();
        assert_eq!(invoices[0].amount_paid, 600.0);
    }

    #[tokio::test]
    async fn test_relinked_payment_moves_between_invoices() {
        let remote = InMemoryRemote::new();
        let business = BusinessId::now_v7();
        let p = party(business);
        let first = invoice(business, p.party_id, InvoiceKind::Sales, 2);
        let second = invoice(business, p.party_id, InvoiceKind::Sales, 3);
        let (first_id, second_id) = (first.invoice_id, second.invoice_id);
        remote.insert_invoice(first).unwrap();
        remote.insert_invoice(second).unwrap();

        let mut payment = linked_payment(business, p.party_id, first_id, 500.0);
        remote.insert_payment(payment.clone()).unwrap();
        payment.invoice_id = Some(second_id);
        remote.insert_payment(payment).unwrap();

        let invoices = remote.party_invoices(business, p.party_id).await.unwrap();
        let paid = |id: InvoiceId| {
            invoices
                .iter()
                .find(|i| i.invoice_id == id)
                .map(|i| (i.amount_paid, i.status))
        };
        assert_eq!(paid(first_id), Some((0.0, InvoiceStatus::Unpaid)));
        assert_eq!(paid(second_id), Some((500.0, InvoiceStatus::Partial)));
    }

    #[test]
    fn test_seed_data_deserializes_with_missing_sections() {
        let seed: SeedData = serde_json::from_str(r#"{ "parties": [] }"#).unwrap();
        assert!(seed.businesses.is_empty());
        assert!(InMemoryRemote::from_seed(seed).is_ok());
    }

    #[test]
    fn test_seed_load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SeedData::load(&path).unwrap_err();
        assert!(err.to_string().contains("seed.json"));
    }
}
