use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::moves::MoveDto;
use crate::api::AppState;
use crate::domain::ReconcileId;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub created: Vec<MoveDto>,
}

/// The reconciliation hook: book commission moves for one matched payment.
pub async fn process_one(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProcessResponse>, AppError> {
    let created = state
        .processor
        .process_reconciliation(ReconcileId::new(id))
        .await?;
    Ok(Json(ProcessResponse {
        created: created.iter().map(MoveDto::from_move).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub created: Vec<MoveDto>,
    pub failures: Vec<BatchFailureDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailureDto {
    pub reconcile_id: i64,
    pub error: String,
}

/// Batch hook. Failures are isolated per record and reported alongside the
/// successes.
pub async fn process_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let ids: Vec<ReconcileId> = request.ids.iter().map(|&id| ReconcileId::new(id)).collect();
    let outcome = state.processor.process_reconciliations(&ids).await;
    Ok(Json(BatchResponse {
        created: outcome.created.iter().map(MoveDto::from_move).collect(),
        failures: outcome
            .failures
            .iter()
            .map(|f| BatchFailureDto {
                reconcile_id: f.reconciliation.get(),
                error: f.error.clone(),
            })
            .collect(),
    }))
}
