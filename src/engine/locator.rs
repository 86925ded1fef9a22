//! Settlement locator: discovers the payment events that reduced an
//! invoice's outstanding balance.
//!
//! Discovery is an ordered chain of strategies over the same invoice,
//! halting at the first stage that yields events:
//! 1. ledger reconciliation records on receivable-class lines,
//! 2. the invoice's payment-widget summary,
//! 3. the residual delta (`total - residual`),
//! 4. forced by payment status (degraded last resort).

use crate::domain::{
    DocumentId, DocumentType, Invoice, LineId, PaymentEvent, PaymentOrigin, PaymentStatus,
    ReconciliationRecord,
};
use crate::records::{RecordError, RecordSource};

/// Minimum residual delta treated as a real payment.
const RESIDUAL_EPSILON: &str = "0.01";

/// Oriented view of a reconciliation record: which side is the settled
/// invoice and which is the settling counter-document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedMatch {
    pub invoice_line: LineId,
    pub invoice_document: DocumentId,
    pub payment_document: DocumentId,
}

/// Resolve the invoice/payment roles of a reconciliation record for the
/// given document type. A credit note's receivable line sits on the credit
/// side, so the roles swap relative to a normal invoice.
pub fn orient(record: &ReconciliationRecord, doc_type: DocumentType) -> OrientedMatch {
    match doc_type {
        DocumentType::CustomerCreditNote => OrientedMatch {
            invoice_line: record.credit_line,
            invoice_document: record.credit_document,
            payment_document: record.debit_document,
        },
        _ => OrientedMatch {
            invoice_line: record.debit_line,
            invoice_document: record.debit_document,
            payment_document: record.credit_document,
        },
    }
}

/// Produce the payment events for one posted invoice, in discovery order.
///
/// Returns an empty list for invoices the ledger reports as unpaid. Each
/// event records the strategy that produced it; a payment-document linkage
/// is optional and its absence never blocks commission generation.
pub async fn locate_payments(
    records: &dyn RecordSource,
    invoice: &Invoice,
) -> Result<Vec<PaymentEvent>, RecordError> {
    if invoice.payment_status == PaymentStatus::NotPaid {
        tracing::debug!(invoice = %invoice.name, "Invoice not paid, no payment events");
        return Ok(Vec::new());
    }

    let events = from_reconciliations(records, invoice).await?;
    if !events.is_empty() {
        return Ok(events);
    }

    let events = from_payment_summary(invoice);
    if !events.is_empty() {
        tracing::info!(
            invoice = %invoice.name,
            count = events.len(),
            "Payment events resolved from payment-widget summary"
        );
        return Ok(events);
    }

    let events = from_residual_delta(invoice);
    if !events.is_empty() {
        tracing::warn!(
            invoice = %invoice.name,
            paid = %invoice.paid_delta(),
            "No structured payment records, synthesized event from residual delta"
        );
        return Ok(events);
    }

    let events = from_payment_status(invoice);
    if !events.is_empty() {
        tracing::warn!(
            invoice = %invoice.name,
            status = ?invoice.payment_status,
            "Payment status claims settlement but no payment data resolvable, \
             forcing event from invoice total; check ledger relations"
        );
    }
    Ok(events)
}

/// Stage 1: reconciliation records tied to the invoice's receivable-class
/// ledger lines, matched through either side.
async fn from_reconciliations(
    records: &dyn RecordSource,
    invoice: &Invoice,
) -> Result<Vec<PaymentEvent>, RecordError> {
    let receivable_lines = invoice.receivable_line_ids();
    if receivable_lines.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = records.reconciliations_for_lines(&receivable_lines).await?;
    let mut events = Vec::with_capacity(candidates.len());

    for record in &candidates {
        let oriented = orient(record, invoice.doc_type);

        // Records whose matched side is not this invoice's receivable line
        // were picked up through the counter side. They settle some other
        // document and must not be attributed here.
        if oriented.invoice_document != invoice.id
            || !receivable_lines.contains(&oriented.invoice_line)
        {
            tracing::debug!(
                invoice = %invoice.name,
                reconcile_id = %record.id,
                "Discarding reconciliation matched against a different document"
            );
            continue;
        }

        if record.amount.is_zero() {
            continue;
        }

        let payment = records
            .payment_for_document(oriented.payment_document)
            .await?;

        events.push(PaymentEvent {
            invoice: invoice.id,
            payment,
            reconciliation: Some(record.id),
            amount: record.amount,
            origin: PaymentOrigin::Reconciliation,
        });
    }

    Ok(events)
}

/// Stage 2: the invoice's precomputed payment summary.
fn from_payment_summary(invoice: &Invoice) -> Vec<PaymentEvent> {
    invoice
        .payment_summary
        .iter()
        .filter(|entry| !entry.amount.is_zero())
        .map(|entry| PaymentEvent {
            invoice: invoice.id,
            payment: entry.payment,
            reconciliation: None,
            amount: entry.amount,
            origin: PaymentOrigin::PaymentWidget,
        })
        .collect()
}

/// Stage 3: one synthesized event from `total - residual`, with no payment
/// document linkage.
fn from_residual_delta(invoice: &Invoice) -> Vec<PaymentEvent> {
    let paid = invoice.paid_delta();
    let epsilon = crate::domain::Amount::parse(RESIDUAL_EPSILON).unwrap_or_default();
    if paid <= epsilon {
        return Vec::new();
    }
    vec![PaymentEvent {
        invoice: invoice.id,
        payment: None,
        reconciliation: None,
        amount: paid,
        origin: PaymentOrigin::ResidualDelta,
    }]
}

/// Stage 4: forced event from the payment status alone.
fn from_payment_status(invoice: &Invoice) -> Vec<PaymentEvent> {
    if !invoice.payment_status.indicates_payment() || invoice.amount_total.is_zero() {
        return Vec::new();
    }
    vec![PaymentEvent {
        invoice: invoice.id,
        payment: None,
        reconciliation: None,
        amount: invoice.amount_total,
        origin: PaymentOrigin::ForcedByStatus,
    }]
}
