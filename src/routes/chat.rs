use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use crate::assistant::GENERAL_SUGGESTIONS;
use crate::conversation::{ChatMessage, ChatReply};
use crate::AppState;

use super::extract::ActiveSession;

async fn chat(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
    Json(message): Json<ChatMessage>,
) -> Json<ChatReply> {
    tracing::debug!(session_id = %session.session_id, "Chat message received");
    Json(state.assistant.reply(&message.message, &session))
}

async fn suggestions(ActiveSession(session): ActiveSession) -> Json<Value> {
    Json(json!({
        "suggestions": GENERAL_SUGGESTIONS,
        "context": format!("Connected to {}", session.moodle_url),
        "user": session.display_name(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/", post(chat))
        .route("/api/chat/suggestions", get(suggestions))
}
