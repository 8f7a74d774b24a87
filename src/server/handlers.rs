//! HTTP handlers for the chat surface.
//!
//! Retrieval failures do not fail the request: the error is surfaced to
//! the user as an assistant turn so the conversation stays usable.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;
use crate::state::AppState;

const CHAT_PAGE: &str = include_str!("chat_page.html");

pub async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub messages: Vec<ChatMessage>,
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let session_id = state.new_session().await;
    let messages = state
        .sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .unwrap_or_default();

    tracing::info!("created chat session {}", session_id);
    Json(SessionResponse {
        session_id,
        messages,
    })
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let sessions = state.sessions.read().await;
    let messages = sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown session {}", session_id)))?;
    Ok(Json(messages.clone()))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: ChatMessage,
    pub messages: Vec<ChatMessage>,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let question = request.content.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("message content is empty".to_string()));
    }

    let history = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("unknown session {}", session_id)))?
    };

    let reply = match state.retriever.answer(&history, &question).await {
        Ok(answer) => ChatMessage::assistant(answer),
        Err(e) => {
            tracing::error!("retrieval failed for session {}: {}", session_id, e);
            ChatMessage::assistant(format!("Error: {}", e))
        }
    };

    let messages = {
        let mut sessions = state.sessions.write().await;
        let messages = sessions
            .get_mut(&session_id)
            .ok_or_else(|| ApiError::NotFound(format!("unknown session {}", session_id)))?;
        messages.push(ChatMessage::user(question));
        messages.push(reply.clone());
        messages.clone()
    };

    Ok(Json(SendMessageResponse { reply, messages }))
}
