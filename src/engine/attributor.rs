//! Sales-order attributor: resolves which orders an invoice bills and what
//! fraction of the invoice belongs to each.

use crate::domain::{Amount, Currency, Invoice, OrderLineId, SalesOrder};
use crate::engine::currency::CurrencyConverter;
use crate::records::{RecordError, RecordSource};
use std::collections::HashSet;

/// One candidate order with its attribution inside the invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributedOrder {
    pub order: SalesOrder,
    /// Absolute ledger weight of this order's invoice lines, or the order's
    /// converted total when its contribution cannot be isolated.
    pub weight: Amount,
    /// `weight / sum of all candidate weights`. Shares over one invoice sum
    /// to 1.
    pub share_ratio: Amount,
}

/// Resolve candidate sales orders for an invoice and compute their share
/// ratios.
///
/// Candidates come from an ordered chain, stopping at the first non-empty
/// stage: invoice-line back-references, the orders' invoice
/// cross-references, then a reverse search over order lines. Orders without
/// commission rules are dropped; an invoice with no remaining candidates
/// contributes no commissions (logged, not an error).
pub async fn attribute_orders(
    records: &dyn RecordSource,
    converter: &CurrencyConverter,
    reporting: &Currency,
    invoice: &Invoice,
) -> Result<Vec<AttributedOrder>, RecordError> {
    let candidates = resolve_candidates(records, invoice).await?;
    if candidates.is_empty() {
        tracing::info!(invoice = %invoice.name, "No related sales orders found");
        return Ok(Vec::new());
    }

    let with_rules: Vec<SalesOrder> = candidates
        .into_iter()
        .filter(|o| o.has_commission_rules())
        .collect();
    if with_rules.is_empty() {
        tracing::info!(
            invoice = %invoice.name,
            "Related sales orders carry no commission rules, nothing to attribute"
        );
        return Ok(Vec::new());
    }

    let mut weighted: Vec<(SalesOrder, Amount)> = Vec::with_capacity(with_rules.len());
    for order in with_rules {
        match order_weight(converter, reporting, invoice, &order) {
            Some(weight) => weighted.push((order, weight)),
            None => {
                tracing::warn!(
                    invoice = %invoice.name,
                    order = %order.name,
                    "Cannot weight order (no ledger lines and no usable rate), skipping"
                );
            }
        }
    }

    let total: Amount = weighted
        .iter()
        .fold(Amount::zero(), |acc, (_, w)| acc + *w);
    if total.is_zero() {
        tracing::warn!(
            invoice = %invoice.name,
            "Total attribution weight is zero, cannot attribute invoice"
        );
        return Ok(Vec::new());
    }

    Ok(weighted
        .into_iter()
        .map(|(order, weight)| AttributedOrder {
            share_ratio: weight / total,
            order,
            weight,
        })
        .collect())
}

/// Ordered candidate discovery, first non-empty stage wins.
async fn resolve_candidates(
    records: &dyn RecordSource,
    invoice: &Invoice,
) -> Result<Vec<SalesOrder>, RecordError> {
    let order_line_ids: Vec<OrderLineId> = invoice
        .lines
        .iter()
        .flat_map(|l| l.order_line_ids.iter().copied())
        .collect();

    if !order_line_ids.is_empty() {
        let orders = records.orders_for_order_lines(&order_line_ids).await?;
        if !orders.is_empty() {
            return Ok(dedup_orders(orders));
        }
    }

    let orders = records.orders_referencing_invoice(invoice.id).await?;
    if !orders.is_empty() {
        return Ok(dedup_orders(orders));
    }

    let invoice_line_ids: Vec<_> = invoice.lines.iter().map(|l| l.id).collect();
    let orders = records
        .orders_with_lines_invoiced_by(&invoice_line_ids)
        .await?;
    Ok(dedup_orders(orders))
}

fn dedup_orders(orders: Vec<SalesOrder>) -> Vec<SalesOrder> {
    let mut seen = HashSet::new();
    orders
        .into_iter()
        .filter(|o| seen.insert(o.id))
        .collect()
}

/// Weight of one order inside the invoice: sum of absolute ledger balances
/// of the invoice lines linked to it, or the order's converted total when
/// no linked lines exist. `None` when neither is computable.
fn order_weight(
    converter: &CurrencyConverter,
    reporting: &Currency,
    invoice: &Invoice,
    order: &SalesOrder,
) -> Option<Amount> {
    let order_lines: HashSet<OrderLineId> = order.lines.iter().map(|l| l.id).collect();

    let linked = invoice
        .lines
        .iter()
        .filter(|l| l.order_line_ids.iter().any(|id| order_lines.contains(id)))
        .fold(Amount::zero(), |acc, l| acc + l.balance.abs());

    if !linked.is_zero() {
        return Some(linked);
    }

    converter
        .convert(
            order.amount_total,
            &order.currency,
            reporting,
            order.company,
            order.date,
        )
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountClass, CalculationBasis, CommissionRule, CompanyId, DocumentId, DocumentType,
        InvoiceLine, LedgerLine, LineId, OrderId, PartnerId, PaymentStatus, RoleType,
        SalesOrderLine,
    };
    use crate::records::MemoryRecordSource;
    use std::sync::Arc;

    fn rule() -> CommissionRule {
        CommissionRule {
            partner: PartnerId::new(7),
            role: RoleType::Internal,
            basis: CalculationBasis::Untaxed,
            percent: Amount::parse("5").unwrap(),
            fixed_amount: Amount::zero(),
            currency: Currency::new("USD"),
        }
    }

    fn order(id: i64, line_id: i64, total: &str, with_rule: bool) -> SalesOrder {
        SalesOrder {
            id: OrderId::new(id),
            name: format!("SO{:03}", id),
            company: CompanyId::new(1),
            currency: Currency::new("USD"),
            date: None,
            amount_total: Amount::parse(total).unwrap(),
            lines: vec![SalesOrderLine {
                id: OrderLineId::new(line_id),
                subtotal: Amount::parse(total).unwrap(),
                total: Amount::parse(total).unwrap(),
                margin: Amount::zero(),
                no_commission: false,
                invoice_line_ids: vec![],
            }],
            rules: if with_rule { vec![rule()] } else { vec![] },
            invoice_ids: vec![],
        }
    }

    fn invoice_with_lines(lines: Vec<InvoiceLine>) -> Invoice {
        Invoice {
            id: DocumentId::new(1),
            name: "INV/2026/001".into(),
            company: CompanyId::new(1),
            doc_type: DocumentType::CustomerInvoice,
            currency: Currency::new("USD"),
            amount_total: Amount::parse("1000").unwrap(),
            amount_untaxed: Amount::parse("1000").unwrap(),
            total_signed: Amount::parse("1000").unwrap(),
            untaxed_signed: Amount::parse("1000").unwrap(),
            residual: Amount::zero(),
            payment_status: PaymentStatus::Paid,
            reversed_entry: None,
            lines,
            ledger_lines: vec![LedgerLine {
                id: LineId::new(10),
                document: DocumentId::new(1),
                account_class: AccountClass::Receivable,
                balance: Amount::parse("1000").unwrap(),
            }],
            payment_summary: vec![],
        }
    }

    fn converter() -> CurrencyConverter {
        CurrencyConverter::new(Arc::new(MemoryRecordSource::new()))
    }

    #[tokio::test]
    async fn two_orders_split_by_ledger_weight() {
        let invoice = invoice_with_lines(vec![
            InvoiceLine {
                id: LineId::new(100),
                order_line_ids: vec![OrderLineId::new(11)],
                balance: Amount::parse("700").unwrap(),
            },
            InvoiceLine {
                id: LineId::new(101),
                order_line_ids: vec![OrderLineId::new(21)],
                balance: Amount::parse("300").unwrap(),
            },
        ]);
        let records = MemoryRecordSource::new()
            .with_order(order(1, 11, "700", true))
            .with_order(order(2, 21, "300", true));

        let attributed = attribute_orders(&records, &converter(), &Currency::new("USD"), &invoice)
            .await
            .unwrap();
        assert_eq!(attributed.len(), 2);

        let a = attributed.iter().find(|a| a.order.id == OrderId::new(1)).unwrap();
        let b = attributed.iter().find(|a| a.order.id == OrderId::new(2)).unwrap();
        assert_eq!(a.share_ratio.to_canonical_string(), "0.7");
        assert_eq!(b.share_ratio.to_canonical_string(), "0.3");

        let sum = a.share_ratio + b.share_ratio;
        assert_eq!(sum, Amount::one());
    }

    #[tokio::test]
    async fn orders_without_rules_are_dropped() {
        let invoice = invoice_with_lines(vec![InvoiceLine {
            id: LineId::new(100),
            order_line_ids: vec![OrderLineId::new(11)],
            balance: Amount::parse("1000").unwrap(),
        }]);
        let records = MemoryRecordSource::new().with_order(order(1, 11, "1000", false));

        let attributed = attribute_orders(&records, &converter(), &Currency::new("USD"), &invoice)
            .await
            .unwrap();
        assert!(attributed.is_empty());
    }

    #[tokio::test]
    async fn cross_reference_stage_used_when_lines_unlinked() {
        let invoice = invoice_with_lines(vec![InvoiceLine {
            id: LineId::new(100),
            order_line_ids: vec![],
            balance: Amount::parse("1000").unwrap(),
        }]);
        let mut so = order(3, 31, "1000", true);
        so.invoice_ids = vec![DocumentId::new(1)];
        let records = MemoryRecordSource::new().with_order(so);

        let attributed = attribute_orders(&records, &converter(), &Currency::new("USD"), &invoice)
            .await
            .unwrap();
        assert_eq!(attributed.len(), 1);
        // No linked invoice lines: weight falls back to the order total.
        assert_eq!(attributed[0].weight.to_canonical_string(), "1000");
        assert_eq!(attributed[0].share_ratio, Amount::one());
    }

    #[tokio::test]
    async fn reverse_line_search_is_last_resort() {
        let invoice = invoice_with_lines(vec![InvoiceLine {
            id: LineId::new(100),
            order_line_ids: vec![],
            balance: Amount::parse("1000").unwrap(),
        }]);
        let mut so = order(4, 41, "1000", true);
        so.lines[0].invoice_line_ids = vec![LineId::new(100)];
        let records = MemoryRecordSource::new().with_order(so);

        let attributed = attribute_orders(&records, &converter(), &Currency::new("USD"), &invoice)
            .await
            .unwrap();
        assert_eq!(attributed.len(), 1);
        assert_eq!(attributed[0].order.id, OrderId::new(4));
    }

    #[tokio::test]
    async fn unrated_foreign_order_is_skipped_not_fatal() {
        let invoice = invoice_with_lines(vec![
            InvoiceLine {
                id: LineId::new(100),
                order_line_ids: vec![OrderLineId::new(11)],
                balance: Amount::parse("700").unwrap(),
            },
            // Second order has no linked lines and a currency with no rate.
            InvoiceLine {
                id: LineId::new(101),
                order_line_ids: vec![],
                balance: Amount::parse("300").unwrap(),
            },
        ]);
        let mut foreign = order(2, 21, "5000", true);
        foreign.currency = Currency::new("MXN");
        foreign.invoice_ids = vec![DocumentId::new(1)];
        let records = MemoryRecordSource::new()
            .with_order(order(1, 11, "700", true))
            .with_order(foreign);

        let attributed = attribute_orders(&records, &converter(), &Currency::new("USD"), &invoice)
            .await
            .unwrap();
        assert_eq!(attributed.len(), 1);
        assert_eq!(attributed[0].order.id, OrderId::new(1));
        assert_eq!(attributed[0].share_ratio, Amount::one());
    }
}
