use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Policy violation: {0}")]
    Policy(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::records::RecordError> for AppError {
    fn from(err: crate::records::RecordError) -> Self {
        match err {
            crate::records::RecordError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<crate::orchestration::ProcessError> for AppError {
    fn from(err: crate::orchestration::ProcessError) -> Self {
        use crate::orchestration::ProcessError;
        match err {
            ProcessError::ReconciliationNotFound(_) => AppError::NotFound(err.to_string()),
            ProcessError::Record(e) => e.into(),
            ProcessError::Db(e) => e.into(),
        }
    }
}

impl From<crate::orchestration::RecomputeError> for AppError {
    fn from(err: crate::orchestration::RecomputeError) -> Self {
        use crate::orchestration::RecomputeError;
        match err {
            RecomputeError::OrderNotFound(_) => AppError::NotFound(err.to_string()),
            RecomputeError::AuthorizationRequired { .. } => AppError::Policy(err.to_string()),
            RecomputeError::Record(e) => e.into(),
            RecomputeError::Db(e) => e.into(),
        }
    }
}

impl From<crate::orchestration::SettleError> for AppError {
    fn from(err: crate::orchestration::SettleError) -> Self {
        use crate::orchestration::SettleError;
        match err {
            SettleError::NotFound(_) => AppError::NotFound(err.to_string()),
            SettleError::MissingBillingConfig => AppError::Policy(err.to_string()),
            SettleError::NotApproved(_) | SettleError::AlreadyBilled(_) | SettleError::NotDraft(_) => {
                AppError::Conflict(err.to_string())
            }
            SettleError::Record(e) => e.into(),
            SettleError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Policy(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
