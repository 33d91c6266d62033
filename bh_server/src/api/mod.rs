//! HTTP/WebSocket API for the bingo server.
//!
//! Built with axum. Identity is not established here: an upstream auth
//! gateway terminates authentication and forwards the caller's id in the
//! `X-User-Id` header (and `X-User-Role: admin` for administrators). The
//! [`middleware`] module turns those headers into an [`middleware::Identity`]
//! extension; requests without them are rejected with `401`.
//!
//! # Endpoints
//!
//! ```text
//! GET  /health                            - health check (public)
//! GET  /api/v1/rounds                     - list active rounds (public)
//! GET  /api/v1/rounds/{id}                - round status snapshot (public)
//! POST /api/v1/admin/rounds               - create round (admin)
//! POST /api/v1/rounds/{id}/register       - buy a ticket, create empty card
//! GET  /api/v1/rounds/{id}/card           - caller's card
//! POST /api/v1/rounds/{id}/card           - finalize card cells
//! POST /api/v1/rounds/{id}/claim          - submit a win claim
//! GET  /ws/{round_id}                     - join the round's live channel
//! ```
//!
//! The WebSocket channel carries only public round state (snapshot, then
//! `number_drawn` / `round_ended` events) and needs no identity.

pub mod middleware;
pub mod rounds;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bingo_hall::round::RoundManager;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub round_manager: Arc<RoundManager>,
    pub pool: Arc<PgPool>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{round_id}", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/rounds", get(rounds::list_rounds))
        .route("/rounds/{round_id}", get(rounds::round_status));

    let protected_routes = Router::new()
        .route("/admin/rounds", post(rounds::create_round))
        .route("/rounds/{round_id}/register", post(rounds::register))
        .route(
            "/rounds/{round_id}/card",
            get(rounds::my_card).post(rounds::finalize_card),
        )
        .route("/rounds/{round_id}/claim", post(rounds::submit_claim))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers and round actors are
/// serving, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let live_rounds = state.round_manager.live_round_count().await;

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "live_rounds": live_rounds,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
