use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::chat_page))
        .route("/health", get(handlers::health))
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/:session_id/messages",
            get(handlers::get_messages).post(handlers::send_message),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
