//! Caller resolution and chat membership checks

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use super::{ApiError, AppState};
use crate::auth::{AuthError, Credentials};
use crate::types::{Chat, ChatId, User};

/// Resolve the calling user from the `Authorization` header, or from a bearer
/// token passed out of band (listeners use `?token=`).
///
/// bcrypt verification runs on the blocking pool.
pub async fn current_user(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<User, ApiError> {
    let credentials = match headers.get(header::AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
            Credentials::from_header(value)?
        }
        None => match query_token {
            Some(token) if !token.is_empty() => Credentials::Bearer(token.to_string()),
            _ => return Err(AuthError::MissingCredentials.into()),
        },
    };

    let state = state.clone();
    tokio::task::spawn_blocking(move || state.auth.resolve(&state.store, &credentials))
        .await
        .map_err(|e| ApiError::internal(format!("authentication task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Look up a chat or fail with 404
pub fn current_chat(state: &AppState, chat_id: ChatId) -> Result<Chat, ApiError> {
    state
        .store
        .chat(chat_id)
        .ok_or_else(|| ApiError::not_found("chat does not exist"))
}

/// 403 unless `user` belongs to `chat`
pub fn require_member(chat: &Chat, user: &User) -> Result<(), ApiError> {
    if chat.has_member(user.id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("you are not a member of this chat"))
    }
}

/// Authenticate the caller and check they may read and write `chat_id`
pub async fn authorize_member(
    state: &Arc<AppState>,
    chat_id: ChatId,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<(User, Chat), ApiError> {
    let user = current_user(state, headers, query_token).await?;
    let chat = current_chat(state, chat_id)?;
    require_member(&chat, &user)?;
    Ok((user, chat))
}
