//! Proration engine: turns one payment event against one invoice into
//! commission amounts per rule.
//!
//! Ratios are computed against the *origin* invoice (a credit note's
//! reversal target when linked) and denominated in the sales order's own
//! total. That construction makes the sum of commission moves across any
//! sequence of partial payments and invoice groupings converge to each
//! rule's full-payment value when the order is fully paid.

use crate::domain::{
    Amount, CalculationBasis, ComputedCommission, Currency, DocumentType, Invoice, LineId,
    PaymentEvent,
};
use crate::engine::attributor::AttributedOrder;
use crate::engine::currency::CurrencyConverter;
use crate::records::{RecordError, RecordSource};
use std::collections::HashSet;

/// Amounts below this are rounding noise and are never persisted.
pub const ROUNDING_FLOOR: &str = "0.01";

/// Compute the commission moves produced by one payment event.
///
/// Returns an empty list for all skip conditions (non-customer origin
/// document, zero totals, zero payment, everything under the floor); those
/// are logged, not errors.
pub async fn prorate(
    records: &dyn RecordSource,
    converter: &CurrencyConverter,
    reporting: &Currency,
    invoice: &Invoice,
    event: &PaymentEvent,
    orders: &[AttributedOrder],
) -> Result<Vec<ComputedCommission>, RecordError> {
    if event.amount.is_zero() {
        tracing::debug!(invoice = %invoice.name, "Zero-amount payment event ignored");
        return Ok(Vec::new());
    }

    let is_refund = invoice.doc_type == DocumentType::CustomerCreditNote;
    let origin = resolve_origin(records, invoice, is_refund).await?;

    if !origin.doc_type.is_customer_document() {
        tracing::info!(
            invoice = %invoice.name,
            origin = %origin.name,
            "Origin document is not a customer document, skipping"
        );
        return Ok(Vec::new());
    }
    if origin.amount_total.is_zero() {
        tracing::info!(origin = %origin.name, "Origin invoice total is zero, skipping");
        return Ok(Vec::new());
    }

    // Coverage is capped at 1 to absorb overpayment and rounding noise.
    let coverage = (event.amount.abs() / origin.amount_total.abs()).min(Amount::one());
    // Reporting-currency bases come from the ledger-booked signed totals,
    // never from re-converting the customer-currency figures.
    let paid_base = origin.untaxed_signed.abs() * coverage;
    let paid_total = origin.total_signed.abs() * coverage;
    let sign = if is_refund { -Amount::one() } else { Amount::one() };

    let floor = Amount::parse(ROUNDING_FLOOR).unwrap_or_default();
    let mut computed = Vec::new();

    for attributed in orders {
        let order = &attributed.order;
        let share = attributed.share_ratio;

        let so_total_reporting = match converter.convert(
            order.amount_total,
            &order.currency,
            reporting,
            order.company,
            order.date,
        ) {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(order = %order.name, error = %e, "Skipping order: {}", e);
                continue;
            }
        };
        if so_total_reporting.is_zero() {
            tracing::info!(order = %order.name, "Order total is zero, skipping");
            continue;
        }

        let so_paid_base = paid_base * share;
        let final_ratio = paid_total * share / so_total_reporting;
        let invoice_line = first_linked_line(invoice, attributed);

        for rule in &order.rules {
            let rule_amount = match rule.basis {
                CalculationBasis::Manual => converter.convert(
                    rule.fixed_amount,
                    &rule.currency,
                    reporting,
                    order.company,
                    order.date,
                ),
                _ => converter.convert(
                    rule.estimated_amount(order),
                    &order.currency,
                    reporting,
                    order.company,
                    order.date,
                ),
            };
            let rule_amount = match rule_amount {
                Ok(amount) => amount,
                Err(e) => {
                    tracing::warn!(
                        order = %order.name,
                        partner = %rule.partner,
                        error = %e,
                        "Skipping rule: {}",
                        e
                    );
                    continue;
                }
            };

            let amount = rule_amount * final_ratio * sign;
            if amount.abs() < floor {
                tracing::debug!(
                    order = %order.name,
                    partner = %rule.partner,
                    amount = %amount,
                    "Commission below rounding floor, discarded"
                );
                continue;
            }

            computed.push(ComputedCommission {
                name: move_name(invoice, order, final_ratio),
                partner: rule.partner,
                order: order.id,
                invoice_line,
                payment: event.payment,
                reconciliation: event.reconciliation,
                company: order.company,
                amount,
                base_amount_paid: so_paid_base * sign,
                currency: reporting.clone(),
                is_refund,
                origin: event.origin,
                coverage_ratio: coverage,
                share_ratio: share,
                final_ratio,
            });
        }
    }

    Ok(computed)
}

/// For a credit note, ratios are computed against the reversal target when
/// one is linked; the credit note itself otherwise.
async fn resolve_origin(
    records: &dyn RecordSource,
    invoice: &Invoice,
    is_refund: bool,
) -> Result<Invoice, RecordError> {
    if is_refund {
        if let Some(reversed_id) = invoice.reversed_entry {
            if let Some(origin) = records.invoice(reversed_id).await? {
                return Ok(origin);
            }
            tracing::warn!(
                invoice = %invoice.name,
                reversed = %reversed_id,
                "Reversal target not resolvable, using credit note totals"
            );
        }
    }
    Ok(invoice.clone())
}

/// First invoice line linked to the attributed order, recorded on the move
/// for audit.
fn first_linked_line(invoice: &Invoice, attributed: &AttributedOrder) -> Option<LineId> {
    let order_lines: HashSet<_> = attributed.order.lines.iter().map(|l| l.id).collect();
    invoice
        .lines
        .iter()
        .find(|l| l.order_line_ids.iter().any(|id| order_lines.contains(id)))
        .map(|l| l.id)
}

/// Deterministic audit label: invoice, order, and the percentage actually
/// applied.
fn move_name(
    invoice: &Invoice,
    order: &crate::domain::SalesOrder,
    final_ratio: Amount,
) -> String {
    format!(
        "CMSN {} / {} ({}%)",
        invoice.name,
        order.name,
        (final_ratio * Amount::hundred()).round_dp(1)
    )
}
