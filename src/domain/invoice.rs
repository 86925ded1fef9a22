//! Invoice-side records as read from the host ledger.
//!
//! These are snapshots handed over by the record source; nothing here is
//! persisted by this crate. Totals come in two flavours: customer-currency
//! amounts (`amount_total`, `amount_untaxed`, `residual`) and the signed
//! ledger-booked totals in the reporting currency (`total_signed`,
//! `untaxed_signed`). Proration always uses the ledger-booked figures for
//! reporting-currency math so it cannot drift from the posted entries.

use crate::domain::money::Amount;
use crate::domain::primitives::{
    CompanyId, Currency, DocumentId, LineId, OrderLineId, PaymentId,
};
use serde::{Deserialize, Serialize};

/// Ledger document classification. Only the customer-facing types
/// participate in commission generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    CustomerInvoice,
    CustomerCreditNote,
    VendorBill,
    Other,
}

impl DocumentType {
    /// True for the two commissionable document types.
    pub fn is_customer_document(&self) -> bool {
        matches!(
            self,
            DocumentType::CustomerInvoice | DocumentType::CustomerCreditNote
        )
    }
}

/// Payment state as reported by the host ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    NotPaid,
    Partial,
    Paid,
    Reversed,
}

impl PaymentStatus {
    /// True when the ledger claims money has been applied to the document.
    pub fn indicates_payment(&self) -> bool {
        matches!(self, PaymentStatus::Partial | PaymentStatus::Paid)
    }
}

/// Account classification of a ledger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountClass {
    Receivable,
    Payable,
    Other,
}

/// One ledger line of a posted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub id: LineId,
    pub document: DocumentId,
    pub account_class: AccountClass,
    /// Signed balance in the reporting currency.
    pub balance: Amount,
}

/// One product line of an invoice, with its back-references into the
/// originating sales order lines (empty when the invoice was keyed in
/// manually).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: LineId,
    pub order_line_ids: Vec<OrderLineId>,
    /// Signed ledger balance of this line in the reporting currency.
    pub balance: Amount,
}

/// One entry of the invoice's precomputed payment summary (the data behind
/// the payment widget in the host UI). Second-choice discovery source when
/// reconciliation records cannot be resolved through normal relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummaryEntry {
    /// Amount applied, in the invoice's currency.
    pub amount: Amount,
    pub payment: Option<PaymentId>,
}

/// A posted customer document, read-only to this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: DocumentId,
    pub name: String,
    pub company: CompanyId,
    pub doc_type: DocumentType,
    pub currency: Currency,
    /// Gross total in the invoice currency.
    pub amount_total: Amount,
    /// Net-of-tax total in the invoice currency.
    pub amount_untaxed: Amount,
    /// Ledger-booked gross total, signed, reporting currency.
    pub total_signed: Amount,
    /// Ledger-booked net-of-tax total, signed, reporting currency.
    pub untaxed_signed: Amount,
    /// Outstanding residual in the invoice currency.
    pub residual: Amount,
    pub payment_status: PaymentStatus,
    /// For credit notes: the invoice this document reverses, when linked.
    pub reversed_entry: Option<DocumentId>,
    pub lines: Vec<InvoiceLine>,
    pub ledger_lines: Vec<LedgerLine>,
    pub payment_summary: Vec<PaymentSummaryEntry>,
}

impl Invoice {
    /// Ids of this document's receivable-class ledger lines. Only matches
    /// against these lines count as commissionable settlement events.
    pub fn receivable_line_ids(&self) -> Vec<LineId> {
        self.ledger_lines
            .iter()
            .filter(|l| l.account_class == AccountClass::Receivable)
            .map(|l| l.id)
            .collect()
    }

    /// Amount already applied according to totals: `total - residual`.
    pub fn paid_delta(&self) -> Amount {
        self.amount_total - self.residual
    }
}

/// A ledger reconciliation record: one debit line matched against one
/// credit line, settling part or all of an outstanding balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub id: crate::domain::primitives::ReconcileId,
    /// Matched amount in the settled document's currency.
    pub amount: Amount,
    pub debit_line: LineId,
    pub credit_line: LineId,
    /// Parent document of the debit line.
    pub debit_document: DocumentId,
    /// Parent document of the credit line.
    pub credit_document: DocumentId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_document_types() {
        assert!(DocumentType::CustomerInvoice.is_customer_document());
        assert!(DocumentType::CustomerCreditNote.is_customer_document());
        assert!(!DocumentType::VendorBill.is_customer_document());
        assert!(!DocumentType::Other.is_customer_document());
    }

    #[test]
    fn payment_status_indicates_payment() {
        assert!(PaymentStatus::Paid.indicates_payment());
        assert!(PaymentStatus::Partial.indicates_payment());
        assert!(!PaymentStatus::NotPaid.indicates_payment());
        assert!(!PaymentStatus::Reversed.indicates_payment());
    }

    #[test]
    fn receivable_lines_filtered_by_class() {
        let invoice = Invoice {
            id: DocumentId::new(1),
            name: "INV/001".into(),
            company: CompanyId::new(1),
            doc_type: DocumentType::CustomerInvoice,
            currency: Currency::new("USD"),
            amount_total: Amount::parse("1000").unwrap(),
            amount_untaxed: Amount::parse("862.07").unwrap(),
            total_signed: Amount::parse("1000").unwrap(),
            untaxed_signed: Amount::parse("862.07").unwrap(),
            residual: Amount::parse("500").unwrap(),
            payment_status: PaymentStatus::Partial,
            reversed_entry: None,
            lines: vec![],
            ledger_lines: vec![
                LedgerLine {
                    id: LineId::new(10),
                    document: DocumentId::new(1),
                    account_class: AccountClass::Receivable,
                    balance: Amount::parse("1000").unwrap(),
                },
                LedgerLine {
                    id: LineId::new(11),
                    document: DocumentId::new(1),
                    account_class: AccountClass::Other,
                    balance: Amount::parse("-1000").unwrap(),
                },
            ],
            payment_summary: vec![],
        };

        assert_eq!(invoice.receivable_line_ids(), vec![LineId::new(10)]);
        assert_eq!(invoice.paid_delta(), Amount::parse("500").unwrap());
    }
}
