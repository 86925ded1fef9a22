//! In-memory record source for tests and the demo host.

use super::{RateQuote, RateSource, RecordError, RecordSource, VendorBillRequest};
use crate::domain::{
    CompanyId, Currency, DocumentId, Invoice, LineId, OrderId, OrderLineId, PaymentId,
    ReconcileId, ReconciliationRecord, SalesOrder,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Record source holding predefined business records.
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    invoices: HashMap<DocumentId, Invoice>,
    reconciliations: Vec<ReconciliationRecord>,
    orders: HashMap<OrderId, SalesOrder>,
    payments_by_document: HashMap<DocumentId, PaymentId>,
    rates: HashMap<(String, String, i64), Vec<RateQuote>>,
    vendor_bills: Mutex<Vec<(DocumentId, VendorBillRequest)>>,
    next_document_id: AtomicI64,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self {
            next_document_id: AtomicI64::new(900_000),
            ..Default::default()
        }
    }

    pub fn with_invoice(mut self, invoice: Invoice) -> Self {
        self.invoices.insert(invoice.id, invoice);
        self
    }

    pub fn with_reconciliation(mut self, record: ReconciliationRecord) -> Self {
        self.reconciliations.push(record);
        self
    }

    pub fn with_order(mut self, order: SalesOrder) -> Self {
        self.orders.insert(order.id, order);
        self
    }

    pub fn with_payment(mut self, document: DocumentId, payment: PaymentId) -> Self {
        self.payments_by_document.insert(document, payment);
        self
    }

    pub fn with_rate(
        mut self,
        from: &Currency,
        to: &Currency,
        company: CompanyId,
        valid_from: chrono::NaiveDate,
        rate: crate::domain::Amount,
    ) -> Self {
        let quotes = self
            .rates
            .entry((from.0.clone(), to.0.clone(), company.get()))
            .or_default();
        quotes.push(RateQuote { valid_from, rate });
        quotes.sort_by_key(|q| q.valid_from);
        self
    }

    /// Vendor bills created through this source, for assertions.
    pub fn created_vendor_bills(&self) -> Vec<(DocumentId, VendorBillRequest)> {
        self.vendor_bills
            .lock()
            .map(|bills| bills.clone())
            .unwrap_or_default()
    }

    fn order_matches_lines(order: &SalesOrder, lines: &[OrderLineId]) -> bool {
        order.lines.iter().any(|l| lines.contains(&l.id))
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn invoice(&self, id: DocumentId) -> Result<Option<Invoice>, RecordError> {
        Ok(self.invoices.get(&id).cloned())
    }

    async fn reconciliation(
        &self,
        id: ReconcileId,
    ) -> Result<Option<ReconciliationRecord>, RecordError> {
        Ok(self.reconciliations.iter().find(|r| r.id == id).cloned())
    }

    async fn reconciliations_for_lines(
        &self,
        lines: &[LineId],
    ) -> Result<Vec<ReconciliationRecord>, RecordError> {
        Ok(self
            .reconciliations
            .iter()
            .filter(|r| lines.contains(&r.debit_line) || lines.contains(&r.credit_line))
            .cloned()
            .collect())
    }

    async fn sales_order(&self, id: OrderId) -> Result<Option<SalesOrder>, RecordError> {
        Ok(self.orders.get(&id).cloned())
    }

    async fn orders_for_order_lines(
        &self,
        lines: &[OrderLineId],
    ) -> Result<Vec<SalesOrder>, RecordError> {
        let mut found: Vec<SalesOrder> = self
            .orders
            .values()
            .filter(|o| Self::order_matches_lines(o, lines))
            .cloned()
            .collect();
        found.sort_by_key(|o| o.id);
        Ok(found)
    }

    async fn orders_referencing_invoice(
        &self,
        invoice: DocumentId,
    ) -> Result<Vec<SalesOrder>, RecordError> {
        let mut found: Vec<SalesOrder> = self
            .orders
            .values()
            .filter(|o| o.invoice_ids.contains(&invoice))
            .cloned()
            .collect();
        found.sort_by_key(|o| o.id);
        Ok(found)
    }

    async fn orders_with_lines_invoiced_by(
        &self,
        lines: &[LineId],
    ) -> Result<Vec<SalesOrder>, RecordError> {
        let mut found: Vec<SalesOrder> = self
            .orders
            .values()
            .filter(|o| {
                o.lines
                    .iter()
                    .any(|ol| ol.invoice_line_ids.iter().any(|il| lines.contains(il)))
            })
            .cloned()
            .collect();
        found.sort_by_key(|o| o.id);
        Ok(found)
    }

    async fn payment_for_document(
        &self,
        document: DocumentId,
    ) -> Result<Option<PaymentId>, RecordError> {
        Ok(self.payments_by_document.get(&document).copied())
    }

    async fn create_vendor_bill(
        &self,
        request: VendorBillRequest,
    ) -> Result<DocumentId, RecordError> {
        let id = DocumentId::new(self.next_document_id.fetch_add(1, Ordering::SeqCst));
        self.vendor_bills
            .lock()
            .map_err(|_| RecordError::Backend("vendor bill store poisoned".to_string()))?
            .push((id, request));
        Ok(id)
    }
}

impl RateSource for MemoryRecordSource {
    fn rates(&self, from: &Currency, to: &Currency, company: CompanyId) -> Vec<RateQuote> {
        self.rates
            .get(&(from.0.clone(), to.0.clone(), company.get()))
            .cloned()
            .unwrap_or_default()
    }
}
