//! REST handlers for the synchronous message boundary.
//!
//! History, read-state updates, unread counts and conversation clearing.
//! Sending via POST goes through the same dispatcher pipeline as the
//! WebSocket path, so room delivery and notifications behave identically.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::json;

use confab_core::conversation::DEFAULT_PAGE_SIZE;
use confab_types::message::{ConversationPage, MessageId, MessageView};
use confab_types::user::UserId;

use crate::http::error::AppError;
use crate::http::extractors::CurrentUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid user id: '{raw}'")))
}

fn parse_message_id(raw: &str) -> Result<MessageId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid message id: '{raw}'")))
}

/// Query parameters for conversation history.
#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, clamped to [1, 100].
    pub limit: Option<u32>,
}

/// GET /api/v1/messages/{user_id} - conversation with a specific user.
pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<ApiResponse<ConversationPage>, AppError> {
    let other = parse_user_id(&user_id)?;
    let page = state
        .conversations
        .history(
            &me.summary(),
            other,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(ApiResponse::success(page))
}

/// Body for POST /api/v1/messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub content: String,
}

/// POST /api/v1/messages - send a message through the dispatch pipeline.
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<ApiResponse<MessageView>, AppError> {
    let receiver = parse_user_id(&request.receiver_id)?;
    let view = state
        .dispatcher
        .send(&me.summary(), receiver, &request.content)
        .await?;
    Ok(ApiResponse::success(view))
}

/// PUT /api/v1/messages/{message_id}/read - mark one message read.
///
/// Only the receiver may do this; anyone else gets a 403.
pub async fn mark_message_read(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(message_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let id = parse_message_id(&message_id)?;
    state.conversations.mark_message_read(me.id, id).await?;
    Ok(ApiResponse::success(json!({ "read": true })))
}

/// PUT /api/v1/messages/conversation/{user_id}/read - mark every unread
/// message from that user as read.
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let other = parse_user_id(&user_id)?;
    let modified = state
        .conversations
        .mark_conversation_read(me.id, other)
        .await?;
    Ok(ApiResponse::success(json!({ "modifiedCount": modified })))
}

/// GET /api/v1/messages/unread/count - unread messages addressed to me.
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let count = state.conversations.unread_count(me.id).await?;
    Ok(ApiResponse::success(json!({ "unreadCount": count })))
}

/// DELETE /api/v1/messages/conversation/{user_id} - clear the full history
/// with a specific user.
pub async fn clear_conversation(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let other = parse_user_id(&user_id)?;
    let deleted = state.conversations.clear_history(me.id, other).await?;
    Ok(ApiResponse::success(json!({ "deletedCount": deleted })))
}
