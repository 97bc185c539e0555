//! Axum router configuration with middleware.
//!
//! REST routes live under `/api/v1/`; the WebSocket endpoint is `/ws`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Message boundary
        .route("/messages", post(handlers::messages::send_message))
        .route(
            "/messages/unread/count",
            get(handlers::messages::unread_count),
        )
        .route(
            "/messages/{user_id}",
            get(handlers::messages::get_conversation),
        )
        .route(
            "/messages/{message_id}/read",
            put(handlers::messages::mark_message_read),
        )
        .route(
            "/messages/conversation/{user_id}/read",
            put(handlers::messages::mark_conversation_read),
        )
        .route(
            "/messages/conversation/{user_id}",
            delete(handlers::messages::clear_conversation),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        // Live connections
        .route("/ws", get(handlers::ws::ws_handler))
        // Health check
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness check (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
