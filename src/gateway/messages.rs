//! Chat message handlers.

use super::{run_blocking, AppState};
use crate::error::ApiError;
use crate::store::Message;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub(crate) struct PostMessageBody {
    sender: String,
    content: String,
}

/// GET /api/messages: every stored message, oldest first.
pub(crate) async fn handle_list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let store = state.messages.clone();
    let messages = run_blocking(move || store.list_messages())
        .await?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch messages");
            ApiError::internal("Failed to fetch messages")
        })?;
    Ok(Json(messages))
}

/// POST /api/messages
pub(crate) async fn handle_post_message(
    State(state): State<AppState>,
    body: Result<Json<PostMessageBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = body.map_err(|e| {
        tracing::debug!(error = %e.body_text(), "Rejected message body");
        ApiError::bad_request("Invalid request")
    })?;

    let store = state.messages.clone();
    let message = run_blocking(move || store.post_message(&body.sender, &body.content))
        .await?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to store message");
            ApiError::internal("Failed to store message")
        })?;

    tracing::debug!(id = message.id, sender = %message.sender, "Message stored");
    Ok(StatusCode::CREATED)
}
