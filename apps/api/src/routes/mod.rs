pub mod health;

use axum::{routing::get, routing::post, Router};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .route("/api/v1/analyze/batch", post(handlers::handle_batch))
        .route("/api/v1/analyze/rank", post(handlers::handle_rank))
        .route(
            "/api/v1/candidates/reanalyze",
            post(handlers::handle_reanalyze),
        )
        .with_state(state)
}
