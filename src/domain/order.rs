//! Sales orders and their commission rules.

use crate::domain::money::Amount;
use crate::domain::primitives::{
    CompanyId, Currency, DocumentId, LineId, OrderId, OrderLineId, PartnerId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Role classification of a commission beneficiary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    /// Internal seller; subject to the percent-ceiling authorization gate.
    Internal,
    Architect,
    Construction,
    Referrer,
}

/// Calculation basis of a commission rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationBasis {
    /// Fixed manual amount, prorated by payment coverage.
    Manual,
    /// Percent of the untaxed subtotal.
    Untaxed,
    /// Percent of the tax-inclusive total.
    Total,
    /// Percent of the margin.
    Margin,
}

/// One line of a sales order. Lines flagged `no_commission` are excluded
/// from every basis computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub id: OrderLineId,
    /// Untaxed subtotal in the order currency.
    pub subtotal: Amount,
    /// Tax-inclusive total in the order currency.
    pub total: Amount,
    /// Margin in the order currency.
    pub margin: Amount,
    pub no_commission: bool,
    /// Back-references to the invoice lines billing this order line.
    pub invoice_line_ids: Vec<LineId>,
}

/// A commission rule attached to exactly one sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub partner: PartnerId,
    pub role: RoleType,
    pub basis: CalculationBasis,
    /// Percent applied to the basis (e.g. 5 for 5%).
    pub percent: Amount,
    /// Fixed amount for the manual basis, in `currency`.
    pub fixed_amount: Amount,
    pub currency: Currency,
}

impl CommissionRule {
    /// Full-payment commission value derived from the order's current
    /// lines. Must be re-derived whenever lines or rule parameters change;
    /// it is a pure function of current order state, never stored.
    pub fn estimated_amount(&self, order: &SalesOrder) -> Amount {
        let lines = order.lines.iter().filter(|l| !l.no_commission);
        let pct = self.percent / Amount::hundred();
        match self.basis {
            CalculationBasis::Manual => self.fixed_amount,
            CalculationBasis::Untaxed => {
                lines.fold(Amount::zero(), |acc, l| acc + l.subtotal) * pct
            }
            CalculationBasis::Total => lines.fold(Amount::zero(), |acc, l| acc + l.total) * pct,
            CalculationBasis::Margin => lines.fold(Amount::zero(), |acc, l| acc + l.margin) * pct,
        }
    }
}

/// A confirmed sales order as read from the host ERP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: OrderId,
    pub name: String,
    pub company: CompanyId,
    pub currency: Currency,
    /// Order date, used for historical rate lookups. `None` falls back to
    /// today at conversion time.
    pub date: Option<NaiveDate>,
    /// Tax-inclusive total in the order currency.
    pub amount_total: Amount,
    pub lines: Vec<SalesOrderLine>,
    pub rules: Vec<CommissionRule>,
    /// Cross-reference: invoices billing this order.
    pub invoice_ids: Vec<DocumentId>,
}

impl SalesOrder {
    pub fn has_commission_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Sum of internal-seller rule percentages, checked against the
    /// authorization ceiling before recomputation.
    pub fn internal_percent_total(&self) -> Amount {
        self.rules
            .iter()
            .filter(|r| r.role == RoleType::Internal)
            .fold(Amount::zero(), |acc, r| acc + r.percent)
    }

    pub fn line_ids(&self) -> Vec<OrderLineId> {
        self.lines.iter().map(|l| l.id).collect()
    }
}
