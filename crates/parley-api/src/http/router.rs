//! Axum router configuration with middleware.
//!
//! REST routes are under `/api/v1/`; the WebSocket gateway is at `/ws`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat resolution
        .route("/chats/individual", post(handlers::chat::start_individual))
        .route("/chats/group", post(handlers::chat::start_group))
        // Messages
        .route(
            "/chats/{chat_id}/messages",
            post(handlers::message::send_message).get(handlers::message::get_history),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        // Realtime gateway
        .route("/ws", get(handlers::ws::ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
