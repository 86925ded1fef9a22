//! Payment events: the unit the proration engine consumes.
//!
//! Events are ephemeral, constructed per discovery pass and never persisted
//! directly; only the commission moves they produce are stored.

use crate::domain::money::Amount;
use crate::domain::primitives::{DocumentId, PaymentId, ReconcileId};
use serde::{Deserialize, Serialize};

/// How a payment event was discovered. Ordered by trustworthiness; the tag
/// travels onto the resulting commission move for audit, and picks the
/// dedup tolerance when no reconciliation key exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOrigin {
    /// Ledger reconciliation record — the authoritative source.
    Reconciliation,
    /// Invoice's precomputed payment summary.
    PaymentWidget,
    /// Synthesized from `total - residual`.
    ResidualDelta,
    /// Synthesized from payment status alone; indicates a bookkeeping
    /// inconsistency upstream and is logged loudly.
    ForcedByStatus,
}

impl PaymentOrigin {
    /// Absolute tolerance on `base_amount_paid` used by the fallback dedup
    /// key, in reporting-currency units. Wider for less reliable origins so
    /// multi-currency rounding does not defeat the guard.
    pub fn dedup_tolerance(&self) -> Amount {
        match self {
            PaymentOrigin::Reconciliation | PaymentOrigin::PaymentWidget => {
                Amount::parse("0.01").unwrap_or_default()
            }
            PaymentOrigin::ResidualDelta => Amount::parse("0.5").unwrap_or_default(),
            PaymentOrigin::ForcedByStatus => Amount::one(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOrigin::Reconciliation => "reconciliation",
            PaymentOrigin::PaymentWidget => "payment_widget",
            PaymentOrigin::ResidualDelta => "residual_delta",
            PaymentOrigin::ForcedByStatus => "forced_by_status",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reconciliation" => Some(PaymentOrigin::Reconciliation),
            "payment_widget" => Some(PaymentOrigin::PaymentWidget),
            "residual_delta" => Some(PaymentOrigin::ResidualDelta),
            "forced_by_status" => Some(PaymentOrigin::ForcedByStatus),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One real-world settlement of (part of) an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub invoice: DocumentId,
    /// Counter-party payment document; absent for manual ledger entries and
    /// synthesized events. Absence is meaningful and participates in the
    /// dedup key.
    pub payment: Option<PaymentId>,
    /// Present only for events discovered through reconciliation records.
    pub reconciliation: Option<ReconcileId>,
    /// Amount applied, in the invoice's currency.
    pub amount: Amount,
    pub origin: PaymentOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_roundtrip() {
        for origin in [
            PaymentOrigin::Reconciliation,
            PaymentOrigin::PaymentWidget,
            PaymentOrigin::ResidualDelta,
            PaymentOrigin::ForcedByStatus,
        ] {
            assert_eq!(PaymentOrigin::parse(origin.as_str()), Some(origin));
        }
        assert_eq!(PaymentOrigin::parse("bogus"), None);
    }

    #[test]
    fn tolerance_widens_with_unreliability() {
        assert!(
            PaymentOrigin::Reconciliation.dedup_tolerance()
                < PaymentOrigin::ResidualDelta.dedup_tolerance()
        );
        assert!(
            PaymentOrigin::ResidualDelta.dedup_tolerance()
                < PaymentOrigin::ForcedByStatus.dedup_tolerance()
        );
    }
}
