use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Queries
        .route("/status", get(handlers::get_status))
        .route("/recordings", get(handlers::list_recordings))
        .route(
            "/recordings/:id",
            get(handlers::get_recording).delete(handlers::delete_recording),
        )
        // Fulltime recording
        .route("/fulltime/start", post(handlers::start_fulltime))
        .route("/fulltime/stop", post(handlers::stop_fulltime))
        // Replay buffer
        .route("/buffer/start", post(handlers::start_buffer))
        .route("/buffer/save", post(handlers::save_buffer))
        .route("/buffer/cancel", post(handlers::cancel_buffer))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
