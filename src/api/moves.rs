use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::db::MoveFilter;
use crate::domain::{CommissionMove, CompanyId, MoveState, PartnerId, PaymentOrigin};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovesQuery {
    pub state: Option<String>,
    /// Comma-separated beneficiary ids.
    pub partner_ids: Option<String>,
    pub company_id: Option<i64>,
    pub origin: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovesResponse {
    pub count: usize,
    pub moves: Vec<MoveDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDto {
    pub id: i64,
    pub name: String,
    pub partner_id: i64,
    pub sale_order_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_line_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<i64>,
    pub company_id: i64,
    pub amount: String,
    pub base_amount_paid: String,
    pub currency: String,
    pub date: String,
    pub is_refund: bool,
    pub origin: String,
    pub coverage_ratio: String,
    pub share_ratio: String,
    pub final_ratio: String,
    pub state: String,
}

impl MoveDto {
    pub fn from_move(m: &CommissionMove) -> Self {
        MoveDto {
            id: m.id,
            name: m.name.clone(),
            partner_id: m.partner.get(),
            sale_order_id: m.order.get(),
            invoice_line_id: m.invoice_line.map(|l| l.get()),
            payment_id: m.payment.map(|p| p.get()),
            reconcile_id: m.reconciliation.map(|r| r.get()),
            settlement_id: m.settlement,
            company_id: m.company.get(),
            amount: m.amount.to_canonical_string(),
            base_amount_paid: m.base_amount_paid.to_canonical_string(),
            currency: m.currency.as_str().to_string(),
            date: m.date.to_string(),
            is_refund: m.is_refund,
            origin: m.origin.as_str().to_string(),
            coverage_ratio: m.coverage_ratio.to_canonical_string(),
            share_ratio: m.share_ratio.to_canonical_string(),
            final_ratio: m.final_ratio.to_canonical_string(),
            state: m.state.as_str().to_string(),
        }
    }
}

pub async fn get_moves(
    Query(params): Query<MovesQuery>,
    State(state): State<AppState>,
) -> Result<Json<MovesResponse>, AppError> {
    let filter = filter_from_query(&params)?;
    let moves = state.repo.query_moves(&filter).await?;
    Ok(Json(MovesResponse {
        count: moves.len(),
        moves: moves.iter().map(MoveDto::from_move).collect(),
    }))
}

pub(crate) fn filter_from_query(params: &MovesQuery) -> Result<MoveFilter, AppError> {
    let state = params
        .state
        .as_deref()
        .map(|s| {
            MoveState::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown state: {s}")))
        })
        .transpose()?;

    let origin = params
        .origin
        .as_deref()
        .map(|s| {
            PaymentOrigin::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown origin: {s}")))
        })
        .transpose()?;

    Ok(MoveFilter {
        state,
        exclude_cancelled: false,
        partners: parse_partner_ids(params.partner_ids.as_deref())?,
        company: params.company_id.map(CompanyId::new),
        origin,
        date_from: parse_date(params.date_from.as_deref(), "dateFrom")?,
        date_to: parse_date(params.date_to.as_deref(), "dateTo")?,
    })
}

pub(crate) fn parse_partner_ids(raw: Option<&str>) -> Result<Vec<PartnerId>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(PartnerId::new)
                .map_err(|_| AppError::BadRequest(format!("Invalid partner id: {s}")))
        })
        .collect()
}

pub(crate) fn parse_date(
    raw: Option<&str>,
    field: &str,
) -> Result<Option<chrono::NaiveDate>, AppError> {
    raw.map(|s| {
        s.parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid {field}: {s}")))
    })
    .transpose()
}
