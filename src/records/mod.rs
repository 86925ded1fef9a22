//! Record source abstraction over the host ERP's business records.
//!
//! Persistence and querying of invoices, reconciliations, sales orders and
//! payments belong to the host; this core consumes them through the
//! `RecordSource` trait and historical currency rates through `RateSource`.
//! `MemoryRecordSource` implements both for tests and the demo host.

use crate::domain::{
    Amount, CompanyId, Currency, DocumentId, Invoice, LineId, OrderId, OrderLineId, PaymentId,
    ReconcileId, ReconciliationRecord, SalesOrder,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryRecordSource;

/// Error type for record source operations.
#[derive(Debug, Clone, Error)]
pub enum RecordError {
    #[error("record backend error: {0}")]
    Backend(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Request for a vendor-payable document, issued when a settlement is
/// billed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorBillRequest {
    pub partner: crate::domain::PartnerId,
    pub company: CompanyId,
    pub currency: Currency,
    pub date: NaiveDate,
    pub product_id: i64,
    pub journal_id: i64,
    pub description: String,
    pub amount: Amount,
}

/// Read access to the host ERP's business records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one posted customer document by id.
    async fn invoice(&self, id: DocumentId) -> Result<Option<Invoice>, RecordError>;

    /// Fetch one reconciliation record by id.
    async fn reconciliation(
        &self,
        id: ReconcileId,
    ) -> Result<Option<ReconciliationRecord>, RecordError>;

    /// Reconciliation records matching either side against any of the given
    /// ledger lines.
    async fn reconciliations_for_lines(
        &self,
        lines: &[LineId],
    ) -> Result<Vec<ReconciliationRecord>, RecordError>;

    /// Fetch one sales order by id.
    async fn sales_order(&self, id: OrderId) -> Result<Option<SalesOrder>, RecordError>;

    /// Orders owning any of the given sales-order lines.
    async fn orders_for_order_lines(
        &self,
        lines: &[OrderLineId],
    ) -> Result<Vec<SalesOrder>, RecordError>;

    /// Orders whose invoice cross-reference lists the given document.
    async fn orders_referencing_invoice(
        &self,
        invoice: DocumentId,
    ) -> Result<Vec<SalesOrder>, RecordError>;

    /// Orders with at least one order line whose invoice-line
    /// back-reference intersects the given invoice lines.
    async fn orders_with_lines_invoiced_by(
        &self,
        lines: &[LineId],
    ) -> Result<Vec<SalesOrder>, RecordError>;

    /// Payment document recorded against the given ledger document, if any.
    async fn payment_for_document(
        &self,
        document: DocumentId,
    ) -> Result<Option<PaymentId>, RecordError>;

    /// Create a vendor-payable document for a billed settlement. Returns
    /// the new document's id.
    async fn create_vendor_bill(
        &self,
        request: VendorBillRequest,
    ) -> Result<DocumentId, RecordError>;
}

/// One dated exchange rate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuote {
    pub valid_from: NaiveDate,
    pub rate: Amount,
}

/// Historical currency rates, as maintained by the host.
pub trait RateSource: Send + Sync {
    /// All known rates for a (from, to, company) pair, sorted ascending by
    /// `valid_from`. Empty when the pair was never quoted.
    fn rates(&self, from: &Currency, to: &Currency, company: CompanyId) -> Vec<RateQuote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_display() {
        let err = RecordError::Backend("connection reset".to_string());
        assert_eq!(err.to_string(), "record backend error: connection reset");

        let err = RecordError::NotFound("invoice 9".to_string());
        assert_eq!(err.to_string(), "record not found: invoice 9");
    }
}
