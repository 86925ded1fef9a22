//! Repository layer for the commission ledger.
//!
//! Methods are organized across submodules by domain:
//! - `moves.rs` - commission move persistence, dedup-guarded inserts, queries
//! - `settlements.rs` - settlement batches and their member moves
//! - `authorizations.rs` - authorization workflow records

mod authorizations;
mod moves;
mod settlements;

use crate::domain::{
    Amount, AuthorizationState, CommissionMove, CompanyId, Currency, LineId, MoveState, OrderId,
    PartnerId, PaymentId, PaymentOrigin, ReconcileId, Settlement, SettlementState,
};
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

pub use authorizations::{AuthorizationAction, TransitionError};
pub use moves::MoveFilter;
pub use settlements::SettlementGroup;

/// Repository for commission ledger operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse a stored decimal string, warning and defaulting to zero on
/// corruption rather than failing the whole query.
pub(crate) fn parse_amount(label: &str, raw: &str) -> Amount {
    Amount::parse(raw).unwrap_or_else(|e| {
        warn!(field = label, value = raw, error = %e, "Failed to parse stored decimal, using zero");
        Amount::default()
    })
}

pub(crate) fn parse_date(label: &str, raw: &str) -> NaiveDate {
    raw.parse().unwrap_or_else(|e| {
        warn!(field = label, value = raw, error = %e, "Failed to parse stored date, using epoch");
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
    })
}

pub(crate) fn row_to_move(row: &SqliteRow) -> CommissionMove {
    let amount: String = row.get("amount");
    let base: String = row.get("base_amount_paid");
    let coverage: String = row.get("coverage_ratio");
    let share: String = row.get("share_ratio");
    let final_ratio: String = row.get("final_ratio");
    let date: String = row.get("date");
    let origin: String = row.get("origin");
    let state: String = row.get("state");

    CommissionMove {
        id: row.get("id"),
        name: row.get("name"),
        partner: PartnerId::new(row.get("partner_id")),
        order: OrderId::new(row.get("sale_order_id")),
        invoice_line: row.get::<Option<i64>, _>("invoice_line_id").map(LineId::new),
        payment: row.get::<Option<i64>, _>("payment_id").map(PaymentId::new),
        reconciliation: row.get::<Option<i64>, _>("reconcile_id").map(ReconcileId::new),
        settlement: row.get("settlement_id"),
        company: CompanyId::new(row.get("company_id")),
        amount: parse_amount("amount", &amount),
        base_amount_paid: parse_amount("base_amount_paid", &base),
        currency: Currency::new(row.get::<String, _>("currency")),
        date: parse_date("date", &date),
        is_refund: row.get::<i64, _>("is_refund") != 0,
        origin: PaymentOrigin::parse(&origin).unwrap_or_else(|| {
            warn!(value = origin, "Unknown payment origin in ledger, treating as forced");
            PaymentOrigin::ForcedByStatus
        }),
        coverage_ratio: parse_amount("coverage_ratio", &coverage),
        share_ratio: parse_amount("share_ratio", &share),
        final_ratio: parse_amount("final_ratio", &final_ratio),
        state: MoveState::parse(&state).unwrap_or(MoveState::Draft),
    }
}

pub(crate) fn row_to_settlement(row: &SqliteRow) -> Settlement {
    let total: String = row.get("total_amount");
    let date: String = row.get("date");
    let state: String = row.get("state");

    Settlement {
        id: row.get("id"),
        name: row.get("name"),
        partner: PartnerId::new(row.get("partner_id")),
        currency: Currency::new(row.get::<String, _>("currency")),
        company: CompanyId::new(row.get("company_id")),
        date: parse_date("date", &date),
        total_amount: parse_amount("total_amount", &total),
        vendor_bill: row
            .get::<Option<i64>, _>("vendor_bill_id")
            .map(crate::domain::DocumentId::new),
        state: SettlementState::parse(&state).unwrap_or(SettlementState::Draft),
    }
}

pub(crate) fn row_to_authorization(row: &SqliteRow) -> crate::domain::Authorization {
    let requested: String = row.get("requested_percent");
    let ceiling: String = row.get("ceiling_percent");
    let state: String = row.get("state");

    crate::domain::Authorization {
        id: row.get("id"),
        name: row.get("name"),
        order: OrderId::new(row.get("sale_order_id")),
        requested_percent: parse_amount("requested_percent", &requested),
        ceiling_percent: parse_amount("ceiling_percent", &ceiling),
        justification: row.get("justification"),
        reject_reason: row.get("reject_reason"),
        company: CompanyId::new(row.get("company_id")),
        state: AuthorizationState::parse(&state).unwrap_or(AuthorizationState::Draft),
    }
}
