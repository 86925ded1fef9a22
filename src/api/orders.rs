use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::moves::MoveDto;
use crate::api::AppState;
use crate::domain::OrderId;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeResponse {
    pub created: Vec<MoveDto>,
    pub messages: Vec<String>,
}

/// Drop and regenerate the order's draft commission moves from all its
/// posted invoices.
pub async fn recompute(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<RecomputeResponse>, AppError> {
    let summary = state
        .processor
        .recompute_for_order(OrderId::new(id))
        .await?;
    Ok(Json(RecomputeResponse {
        created: summary.created.iter().map(MoveDto::from_move).collect(),
        messages: summary.messages,
    }))
}
