pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::results::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/results", get(handlers::handle_list_results))
        .route("/results/:result_id/view", get(handlers::handle_view_result))
        .route(
            "/results/:result_id/download",
            get(handlers::handle_download_result),
        )
        .route(
            "/results/:result_id/reopt",
            post(handlers::handle_reopt_result),
        )
        .with_state(state)
}
