//! Message history and posting

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::api::guard::authorize_member;
use crate::api::{ApiError, AppState};
use crate::types::{ChatId, Message, MessageCreate, MessageId};

/// Query parameters for history. Both default to 0.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryParams {
    /// Lowest message id to return
    pub offset: MessageId,
    /// Maximum number of messages; 0 means no limit
    pub limit: usize,
}

/// GET /v1/chats/:chat_id/history - Stored messages, oldest first
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<ChatId>,
    Query(params): Query<HistoryParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Message>>, ApiError> {
    let (_, chat) = authorize_member(&state, chat_id, &headers, None).await?;
    if params.offset < 0 {
        return Err(ApiError::bad_request("offset must be >= 0"));
    }
    Ok(Json(state.store.chat_history(
        chat.id,
        params.offset,
        params.limit,
    )?))
}

/// POST /v1/chats/:chat_id/message - Persist a message, then fan it out.
///
/// Publishing happens inside the store commit so listeners receive messages
/// in the same order as history.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<ChatId>,
    headers: HeaderMap,
    Json(body): Json<MessageCreate>,
) -> Result<Json<Message>, ApiError> {
    let (user, chat) = authorize_member(&state, chat_id, &headers, None).await?;

    let broker = &state.broker;
    let (message, delivered) = state
        .store
        .persist_message_with(chat.id, user.id, &body.text, |message| {
            let message = Arc::new(message);
            broker
                .publish(chat.id, message.clone())
                .map(|delivered| (message, delivered))
        })??;
    tracing::debug!(chat_id = chat.id, message_id = message.id, delivered, "Message fanned out");

    Ok(Json(Message::clone(&message)))
}
