use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::moves::{parse_date, parse_partner_ids, MoveDto};
use crate::api::AppState;
use crate::db::MoveFilter;
use crate::domain::Amount;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub partner_ids: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub groups: Vec<PartnerGroup>,
}

/// One beneficiary's slice of the ledger, moves in (date, id) order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerGroup {
    pub partner_id: i64,
    pub total_amount: String,
    pub total_base_amount_paid: String,
    pub moves: Vec<MoveDto>,
}

/// Commission report grouped per beneficiary. Cancelled moves are
/// excluded; totals are the signed sums of the booked amounts, so refunds
/// subtract.
pub async fn get_report(
    Query(params): Query<ReportQuery>,
    State(state): State<AppState>,
) -> Result<Json<ReportResponse>, AppError> {
    let filter = MoveFilter {
        exclude_cancelled: true,
        partners: parse_partner_ids(params.partner_ids.as_deref())?,
        date_from: parse_date(params.date_from.as_deref(), "dateFrom")?,
        date_to: parse_date(params.date_to.as_deref(), "dateTo")?,
        ..Default::default()
    };

    let moves = state.repo.query_moves(&filter).await?;

    // query_moves returns (partner, date, id) order, so one linear pass
    // builds the groups.
    let mut groups: Vec<PartnerGroup> = Vec::new();
    for m in &moves {
        let partner_id = m.partner.get();
        if groups.last().map(|g| g.partner_id) != Some(partner_id) {
            groups.push(PartnerGroup {
                partner_id,
                total_amount: String::new(),
                total_base_amount_paid: String::new(),
                moves: Vec::new(),
            });
        }
        let group = groups
            .last_mut()
            .ok_or_else(|| AppError::Internal("report grouping invariant broken".into()))?;
        group.moves.push(MoveDto::from_move(m));
    }

    for group in &mut groups {
        let mut amount = Amount::zero();
        let mut base = Amount::zero();
        for dto in &group.moves {
            amount = amount + Amount::parse(&dto.amount).unwrap_or_default();
            base = base + Amount::parse(&dto.base_amount_paid).unwrap_or_default();
        }
        group.total_amount = amount.to_canonical_string();
        group.total_base_amount_paid = base.to_canonical_string();
    }

    Ok(Json(ReportResponse { groups }))
}
