//! Persisted commission records: moves, settlements, authorizations.

use crate::domain::money::Amount;
use crate::domain::payment::PaymentOrigin;
use crate::domain::primitives::{
    CompanyId, Currency, DocumentId, LineId, OrderId, PartnerId, PaymentId, ReconcileId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle of a commission move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    Draft,
    Settled,
    Invoiced,
    Cancel,
}

impl MoveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveState::Draft => "draft",
            MoveState::Settled => "settled",
            MoveState::Invoiced => "invoiced",
            MoveState::Cancel => "cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(MoveState::Draft),
            "settled" => Some(MoveState::Settled),
            "invoiced" => Some(MoveState::Invoiced),
            "cancel" => Some(MoveState::Cancel),
            _ => None,
        }
    }
}

/// Output of the proration engine for one (payment event, order, rule)
/// combination, not yet persisted. Carries its own audit trace: the origin
/// tag and the three ratios that produced the amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedCommission {
    pub name: String,
    pub partner: PartnerId,
    pub order: OrderId,
    pub invoice_line: Option<LineId>,
    pub payment: Option<PaymentId>,
    pub reconciliation: Option<ReconcileId>,
    pub company: CompanyId,
    /// Commission amount, signed, reporting currency.
    pub amount: Amount,
    /// Prorated, sign-adjusted net-of-tax payment base, reporting currency.
    pub base_amount_paid: Amount,
    /// Reporting currency.
    pub currency: Currency,
    pub is_refund: bool,
    pub origin: PaymentOrigin,
    pub coverage_ratio: Amount,
    pub share_ratio: Amount,
    pub final_ratio: Amount,
}

/// A persisted commission move. Immutable once created apart from its
/// lifecycle state and settlement membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionMove {
    pub id: i64,
    pub name: String,
    pub partner: PartnerId,
    pub order: OrderId,
    pub invoice_line: Option<LineId>,
    pub payment: Option<PaymentId>,
    pub reconciliation: Option<ReconcileId>,
    pub settlement: Option<i64>,
    pub company: CompanyId,
    pub amount: Amount,
    pub base_amount_paid: Amount,
    pub currency: Currency,
    pub date: NaiveDate,
    pub is_refund: bool,
    pub origin: PaymentOrigin,
    pub coverage_ratio: Amount,
    pub share_ratio: Amount,
    pub final_ratio: Amount,
    pub state: MoveState,
}

/// Lifecycle of a settlement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    Draft,
    Approved,
    Invoiced,
    Cancel,
}

impl SettlementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::Draft => "draft",
            SettlementState::Approved => "approved",
            SettlementState::Invoiced => "invoiced",
            SettlementState::Cancel => "cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SettlementState::Draft),
            "approved" => Some(SettlementState::Approved),
            "invoiced" => Some(SettlementState::Invoiced),
            "cancel" => Some(SettlementState::Cancel),
            _ => None,
        }
    }
}

/// A payable batch of commission moves for one beneficiary, one currency,
/// one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: i64,
    pub name: String,
    pub partner: PartnerId,
    pub currency: Currency,
    pub company: CompanyId,
    pub date: NaiveDate,
    pub total_amount: Amount,
    pub vendor_bill: Option<DocumentId>,
    pub state: SettlementState,
}

/// Lifecycle of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl AuthorizationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationState::Draft => "draft",
            AuthorizationState::Pending => "pending",
            AuthorizationState::Approved => "approved",
            AuthorizationState::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(AuthorizationState::Draft),
            "pending" => Some(AuthorizationState::Pending),
            "approved" => Some(AuthorizationState::Approved),
            "rejected" => Some(AuthorizationState::Rejected),
            _ => None,
        }
    }
}

/// Approval gate for sales orders whose internal-seller percentages exceed
/// the configured ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub id: i64,
    pub name: String,
    pub order: OrderId,
    pub requested_percent: Amount,
    pub ceiling_percent: Amount,
    pub justification: Option<String>,
    pub reject_reason: Option<String>,
    pub company: CompanyId,
    pub state: AuthorizationState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_state_roundtrip() {
        for state in [
            MoveState::Draft,
            MoveState::Settled,
            MoveState::Invoiced,
            MoveState::Cancel,
        ] {
            assert_eq!(MoveState::parse(state.as_str()), Some(state));
        }
        assert_eq!(MoveState::parse("unknown"), None);
    }

    #[test]
    fn settlement_state_roundtrip() {
        for state in [
            SettlementState::Draft,
            SettlementState::Approved,
            SettlementState::Invoiced,
            SettlementState::Cancel,
        ] {
            assert_eq!(SettlementState::parse(state.as_str()), Some(state));
        }
    }

    #[test]
    fn authorization_state_roundtrip() {
        for state in [
            AuthorizationState::Draft,
            AuthorizationState::Pending,
            AuthorizationState::Approved,
            AuthorizationState::Rejected,
        ] {
            assert_eq!(AuthorizationState::parse(state.as_str()), Some(state));
        }
    }
}
