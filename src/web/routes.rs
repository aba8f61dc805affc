use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // API endpoints
        .route("/query", post(super::handlers::query::handle_query))
        // Health check
        .route("/health", get(super::handlers::health::health_check))
        .with_state(state)
}
