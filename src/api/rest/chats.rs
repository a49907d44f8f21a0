//! Chat endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::api::guard::{current_chat, current_user};
use crate::api::{ApiError, AppState};
use crate::types::{ChatCreate, ChatId, ChatInfo};

/// GET /v1/chats - List every chat with its members
pub async fn list_chats(State(state): State<Arc<AppState>>) -> Json<Vec<ChatInfo>> {
    Json(state.store.list_chats())
}

/// POST /v1/chats - Create a chat owned by the caller, returns its id
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(chat): Json<ChatCreate>,
) -> Result<Json<ChatId>, ApiError> {
    let user = current_user(&state, &headers, None).await?;
    let title = chat.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }

    let broker = &state.broker;
    let chat_id = state
        .store
        .create_chat_with(title, user.id, |chat_id| broker.declare_room(chat_id))?;
    Ok(Json(chat_id))
}

/// GET /v1/chats/:chat_id - Chat details
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<ChatInfo>, ApiError> {
    state
        .store
        .chat_info(chat_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("chat does not exist"))
}

/// POST /v1/chats/:chat_id/join - Add the caller to the chat
pub async fn join_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<ChatId>,
    headers: HeaderMap,
) -> Result<Json<ChatInfo>, ApiError> {
    let user = current_user(&state, &headers, None).await?;
    let chat = current_chat(&state, chat_id)?;
    Ok(Json(state.store.join_chat(chat.id, user.id)?))
}
