use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::moves::{parse_date, parse_partner_ids, MoveDto};
use crate::api::AppState;
use crate::domain::{Settlement, SettlementState};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDto {
    pub id: i64,
    pub name: String,
    pub partner_id: i64,
    pub currency: String,
    pub company_id: i64,
    pub date: String,
    pub total_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_bill_id: Option<i64>,
    pub state: String,
}

impl SettlementDto {
    fn from_settlement(s: &Settlement) -> Self {
        SettlementDto {
            id: s.id,
            name: s.name.clone(),
            partner_id: s.partner.get(),
            currency: s.currency.as_str().to_string(),
            company_id: s.company.get(),
            date: s.date.to_string(),
            total_amount: s.total_amount.to_canonical_string(),
            vendor_bill_id: s.vendor_bill.map(|d| d.get()),
            state: s.state.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Settle draft moves dated on or before this date; defaults to today.
    pub cutoff: Option<String>,
    pub partner_ids: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub settlements: Vec<SettlementDto>,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let cutoff = parse_date(request.cutoff.as_deref(), "cutoff")?;
    let partners = parse_partner_ids(request.partner_ids.as_deref())?;
    let settlements = state.processor.generate_settlements(cutoff, &partners).await?;
    Ok(Json(GenerateResponse {
        settlements: settlements.iter().map(SettlementDto::from_settlement).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub settlements: Vec<SettlementDto>,
}

pub async fn list(
    Query(params): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, AppError> {
    let filter = params
        .state
        .as_deref()
        .map(|s| {
            SettlementState::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown state: {s}")))
        })
        .transpose()?;
    let settlements = state.repo.list_settlements(filter).await?;
    Ok(Json(ListResponse {
        settlements: settlements.iter().map(SettlementDto::from_settlement).collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDetail {
    #[serde(flatten)]
    pub settlement: SettlementDto,
    pub moves: Vec<MoveDto>,
}

pub async fn get_one(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SettlementDetail>, AppError> {
    let settlement = state
        .repo
        .get_settlement(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("settlement {id}")))?;
    let moves = state.repo.moves_for_settlement(id).await?;
    Ok(Json(SettlementDetail {
        settlement: SettlementDto::from_settlement(&settlement),
        moves: moves.iter().map(MoveDto::from_move).collect(),
    }))
}

pub async fn approve(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SettlementDto>, AppError> {
    let settlement = state.processor.approve_settlement(id).await?;
    Ok(Json(SettlementDto::from_settlement(&settlement)))
}

pub async fn bill(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<SettlementDto>, AppError> {
    let settlement = state.processor.bill_settlement(id).await?;
    Ok(Json(SettlementDto::from_settlement(&settlement)))
}
