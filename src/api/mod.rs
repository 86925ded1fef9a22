pub mod authorizations;
pub mod health;
pub mod moves;
pub mod orders;
pub mod reconciliations;
pub mod report;
pub mod settlements;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::Processor;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub processor: Arc<Processor>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, processor: Arc<Processor>, config: Config) -> Self {
        Self {
            repo,
            processor,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/reconciliations/:id/process",
            post(reconciliations::process_one),
        )
        .route(
            "/v1/reconciliations/process",
            post(reconciliations::process_batch),
        )
        .route("/v1/orders/:id/recompute", post(orders::recompute))
        .route("/v1/moves", get(moves::get_moves))
        .route("/v1/report", get(report::get_report))
        .route("/v1/settlements", get(settlements::list))
        .route("/v1/settlements/generate", post(settlements::generate))
        .route("/v1/settlements/:id", get(settlements::get_one))
        .route("/v1/settlements/:id/approve", post(settlements::approve))
        .route("/v1/settlements/:id/bill", post(settlements::bill))
        .route("/v1/authorizations", post(authorizations::create))
        .route("/v1/authorizations/:id", get(authorizations::get_one))
        .route(
            "/v1/authorizations/:id/submit",
            post(authorizations::submit),
        )
        .route(
            "/v1/authorizations/:id/approve",
            post(authorizations::approve),
        )
        .route(
            "/v1/authorizations/:id/reject",
            post(authorizations::reject),
        )
        .route("/v1/authorizations/:id/reset", post(authorizations::reset))
        .layer(cors)
        .with_state(state)
}
