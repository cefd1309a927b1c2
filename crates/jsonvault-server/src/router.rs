use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with every jsonvault endpoint.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/json",
            get(handler::list_entries).post(handler::create_entry),
        )
        .route(
            "/api/json/:id",
            get(handler::get_entry)
                .put(handler::update_entry)
                .delete(handler::delete_entry),
        )
        .route("/api/json/:id/history", get(handler::entry_history))
        .route("/api/history", get(handler::list_history))
        .route("/api/history/:id", get(handler::get_history))
        .route("/api/health", get(handler::health))
        .fallback(handler::route_not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
