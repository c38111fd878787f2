//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Fallback handler returning a JSON 404
async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(r#"{"error":"Not Found"}"#),
    )
        .into_response()
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket for real-time events
        .route("/ws", get(ws_handler))
        // Wallets
        .route(
            "/api/wallets",
            get(handlers::list_wallets).post(handlers::deploy_wallet),
        )
        .route("/api/wallets/{address}", get(handlers::get_wallet))
        .route("/api/wallets/{address}/deposit", post(handlers::deposit))
        .route("/api/wallets/{address}/events", get(handlers::get_events))
        // Transactions
        .route(
            "/api/wallets/{address}/transactions",
            get(handlers::list_transactions).post(handlers::submit_transaction),
        )
        .route(
            "/api/wallets/{address}/transactions/{index}",
            get(handlers::get_transaction),
        )
        .route(
            "/api/wallets/{address}/transactions/{index}/confirm",
            post(handlers::confirm_transaction),
        )
        .route(
            "/api/wallets/{address}/transactions/{index}/revoke",
            post(handlers::revoke_confirmation),
        )
        .route(
            "/api/wallets/{address}/transactions/{index}/execute",
            post(handlers::execute_transaction),
        )
        // External accounts
        .route("/api/accounts/{address}", get(handlers::get_account))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
