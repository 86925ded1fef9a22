use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::db::AuthorizationAction;
use crate::domain::{Authorization, OrderId};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDto {
    pub id: i64,
    pub name: String,
    pub sale_order_id: i64,
    pub requested_percent: String,
    pub ceiling_percent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    pub company_id: i64,
    pub state: String,
}

impl AuthorizationDto {
    fn from_authorization(a: &Authorization) -> Self {
        AuthorizationDto {
            id: a.id,
            name: a.name.clone(),
            sale_order_id: a.order.get(),
            requested_percent: a.requested_percent.to_canonical_string(),
            ceiling_percent: a.ceiling_percent.to_canonical_string(),
            justification: a.justification.clone(),
            reject_reason: a.reject_reason.clone(),
            company_id: a.company.get(),
            state: a.state.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub order_id: i64,
    pub justification: Option<String>,
}

/// Open an authorization request for an order. The requested percentage is
/// the order's current internal-seller total; the ceiling is frozen from
/// configuration at creation time.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<AuthorizationDto>, AppError> {
    let order_id = OrderId::new(request.order_id);
    let order = state
        .processor
        .records()
        .sales_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sales order {order_id}")))?;

    let authorization = state
        .repo
        .create_authorization(
            order_id,
            &order.name,
            order.internal_percent_total(),
            state.config.seller_percent_ceiling,
            request.justification.as_deref(),
            order.company,
        )
        .await?;
    Ok(Json(AuthorizationDto::from_authorization(&authorization)))
}

pub async fn get_one(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<AuthorizationDto>, AppError> {
    let authorization = state
        .repo
        .get_authorization(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("authorization {id}")))?;
    Ok(Json(AuthorizationDto::from_authorization(&authorization)))
}

pub async fn submit(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<AuthorizationDto>, AppError> {
    transition(&state, id, AuthorizationAction::Submit).await
}

pub async fn approve(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<AuthorizationDto>, AppError> {
    transition(&state, id, AuthorizationAction::Approve).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub reason: String,
}

pub async fn reject(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<AuthorizationDto>, AppError> {
    transition(
        &state,
        id,
        AuthorizationAction::Reject {
            reason: request.reason,
        },
    )
    .await
}

pub async fn reset(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<AuthorizationDto>, AppError> {
    transition(&state, id, AuthorizationAction::Reset).await
}

async fn transition(
    state: &AppState,
    id: i64,
    action: AuthorizationAction,
) -> Result<Json<AuthorizationDto>, AppError> {
    match state.repo.transition_authorization(id, action).await? {
        None => Err(AppError::NotFound(format!("authorization {id}"))),
        Some(Err(e)) => Err(AppError::Conflict(e.to_string())),
        Some(Ok(authorization)) => Ok(Json(AuthorizationDto::from_authorization(&authorization))),
    }
}
