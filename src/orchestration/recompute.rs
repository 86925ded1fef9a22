//! Full recomputation of one order's draft commission history.

use crate::domain::{Amount, CommissionMove, OrderId};
use crate::orchestration::processor::Processor;
use crate::records::RecordError;
use thiserror::Error;

#[derive(Debug, Default)]
pub struct RecomputeSummary {
    pub created: Vec<CommissionMove>,
    /// Human-readable notes about skipped inputs, for the caller's audit
    /// trail.
    pub messages: Vec<String>,
}

#[derive(Debug, Error)]
pub enum RecomputeError {
    #[error("sales order {0} not found")]
    OrderNotFound(OrderId),
    #[error(
        "internal commission {percent}% exceeds the {ceiling}% ceiling and no approved authorization exists"
    )]
    AuthorizationRequired { percent: Amount, ceiling: Amount },
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Processor {
    /// Drop the order's draft moves and regenerate them from every posted
    /// invoice the order references, atomically. Settled and invoiced moves
    /// survive untouched; the dedup guard prevents them from reappearing as
    /// drafts.
    ///
    /// Orders whose internal-seller percentages exceed the configured
    /// ceiling are blocked until an approved authorization exists.
    pub async fn recompute_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<RecomputeSummary, RecomputeError> {
        let order = self
            .records()
            .sales_order(order_id)
            .await?
            .ok_or(RecomputeError::OrderNotFound(order_id))?;

        let percent = order.internal_percent_total();
        let ceiling = self.config().seller_percent_ceiling;
        if percent > ceiling && !self.repo().has_approved_authorization(order_id).await? {
            tracing::warn!(
                order = %order.name,
                percent = %percent,
                ceiling = %ceiling,
                "Recomputation blocked pending authorization"
            );
            return Err(RecomputeError::AuthorizationRequired { percent, ceiling });
        }

        let mut summary = RecomputeSummary::default();
        let mut computed = Vec::new();

        // Failures are isolated per invoice: one unreadable invoice must
        // not abort the recompute of the rest.
        for &invoice_id in &order.invoice_ids {
            match self.records().invoice(invoice_id).await {
                Ok(Some(invoice)) => match self.compute_for_invoice(&invoice).await {
                    // compute_for_invoice covers every order the invoice
                    // touches; only this order's drafts are being replaced.
                    Ok(batch) => {
                        computed.extend(batch.into_iter().filter(|c| c.order == order_id));
                    }
                    Err(e) => {
                        tracing::error!(
                            order = %order.name,
                            invoice = %invoice.name,
                            error = %e,
                            "Skipping invoice during recompute"
                        );
                        summary
                            .messages
                            .push(format!("invoice {invoice_id} skipped: {e}"));
                    }
                },
                Ok(None) => {
                    tracing::info!(order = %order.name, invoice = %invoice_id, "Referenced invoice not found, skipped");
                    summary
                        .messages
                        .push(format!("invoice {invoice_id} not found, skipped"));
                }
                Err(e) => {
                    tracing::error!(
                        order = %order.name,
                        invoice = %invoice_id,
                        error = %e,
                        "Skipping unreadable invoice during recompute"
                    );
                    summary
                        .messages
                        .push(format!("invoice {invoice_id} skipped: {e}"));
                }
            }
        }

        summary.created = self
            .repo()
            .replace_draft_moves_for_order(order_id, &computed, Self::ledger_date())
            .await?;

        tracing::info!(
            order = %order.name,
            created = summary.created.len(),
            "Recomputed commission moves"
        );
        Ok(summary)
    }
}
