//! Entry point wiring the engine stages together: reconciliation hook,
//! payment location, order attribution, proration and persistence.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{
    CommissionMove, ComputedCommission, Currency, DocumentType, Invoice, PaymentEvent,
    PaymentOrigin, ReconcileId,
};
use crate::engine::{attribute_orders, locate_payments, orient, prorate, CurrencyConverter};
use crate::records::{RecordError, RecordSource};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct Processor {
    records: Arc<dyn RecordSource>,
    repo: Arc<Repository>,
    converter: CurrencyConverter,
    config: Config,
}

impl Processor {
    pub fn new(
        records: Arc<dyn RecordSource>,
        repo: Arc<Repository>,
        converter: CurrencyConverter,
        config: Config,
    ) -> Self {
        Self {
            records,
            repo,
            converter,
            config,
        }
    }

    pub(crate) fn records(&self) -> &dyn RecordSource {
        self.records.as_ref()
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn reporting(&self) -> Currency {
        Currency::new(&self.config.reporting_currency)
    }

    fn today() -> NaiveDate {
        chrono::Utc::now().date_naive()
    }

    /// React to one reconciliation record: resolve its invoice side, build
    /// the payment event and book the resulting commission moves.
    ///
    /// Returns the moves created; an empty list means every outcome was a
    /// skip (non-customer documents, no related orders, amounts under the
    /// floor) or a duplicate.
    pub async fn process_reconciliation(
        &self,
        id: ReconcileId,
    ) -> Result<Vec<CommissionMove>, ProcessError> {
        let record = self
            .records
            .reconciliation(id)
            .await?
            .ok_or(ProcessError::ReconciliationNotFound(id))?;

        let debit = self.records.invoice(record.debit_document).await?;
        let credit = self.records.invoice(record.credit_document).await?;

        // The invoice side is the customer document; when both sides are
        // customer documents the orientation rule picks the conventional
        // side for the type.
        let invoice = match (debit, credit) {
            (Some(d), _) if d.doc_type == DocumentType::CustomerInvoice => d,
            (_, Some(c)) if c.doc_type == DocumentType::CustomerCreditNote => c,
            (Some(d), _) if d.doc_type.is_customer_document() => d,
            (_, Some(c)) if c.doc_type.is_customer_document() => c,
            _ => {
                tracing::info!(reconcile = %id, "No customer document on either side, skipping");
                return Ok(Vec::new());
            }
        };

        let oriented = orient(&record, invoice.doc_type);
        if oriented.invoice_document != invoice.id
            || !invoice.receivable_line_ids().contains(&oriented.invoice_line)
        {
            tracing::info!(
                reconcile = %id,
                invoice = %invoice.name,
                "Reconciliation does not touch the invoice's receivable lines, skipping"
            );
            return Ok(Vec::new());
        }

        let payment = self
            .records
            .payment_for_document(oriented.payment_document)
            .await?;
        let event = PaymentEvent {
            invoice: invoice.id,
            payment,
            reconciliation: Some(record.id),
            amount: record.amount,
            origin: PaymentOrigin::Reconciliation,
        };

        let computed = self.compute_for_event(&invoice, &event).await?;
        Ok(self.repo.persist_computed(&computed, Self::today()).await?)
    }

    /// Batch variant of the hook. A failure on one record is logged and
    /// reported without aborting the rest.
    pub async fn process_reconciliations(&self, ids: &[ReconcileId]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for &id in ids {
            match self.process_reconciliation(id).await {
                Ok(moves) => outcome.created.extend(moves),
                Err(e) => {
                    tracing::error!(reconcile = %id, error = %e, "Reconciliation processing failed");
                    outcome.failures.push(BatchFailure {
                        reconciliation: id,
                        error: e.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// All commission moves one invoice's located payment events would
    /// produce, not persisted. Order attribution happens once per invoice.
    pub(crate) async fn compute_for_invoice(
        &self,
        invoice: &Invoice,
    ) -> Result<Vec<ComputedCommission>, RecordError> {
        let events = locate_payments(self.records.as_ref(), invoice).await?;
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let reporting = self.reporting();
        let orders =
            attribute_orders(self.records.as_ref(), &self.converter, &reporting, invoice).await?;
        let mut computed = Vec::new();
        for event in &events {
            computed.extend(
                prorate(
                    self.records.as_ref(),
                    &self.converter,
                    &reporting,
                    invoice,
                    event,
                    &orders,
                )
                .await?,
            );
        }
        Ok(computed)
    }

    async fn compute_for_event(
        &self,
        invoice: &Invoice,
        event: &PaymentEvent,
    ) -> Result<Vec<ComputedCommission>, RecordError> {
        let reporting = self.reporting();
        let orders =
            attribute_orders(self.records.as_ref(), &self.converter, &reporting, invoice).await?;
        prorate(
            self.records.as_ref(),
            &self.converter,
            &reporting,
            invoice,
            event,
            &orders,
        )
        .await
    }

    pub(crate) fn ledger_date() -> NaiveDate {
        Self::today()
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub created: Vec<CommissionMove>,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub reconciliation: ReconcileId,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("reconciliation {0} not found")]
    ReconciliationNotFound(ReconcileId),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
