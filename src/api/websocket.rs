//! WebSocket listen endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use super::guard::authorize_member;
use super::{ApiError, AppState};
use crate::session::{ListenSession, WsTransport};
use crate::types::ChatId;

/// Query parameters for listen connections
#[derive(Debug, Default, Deserialize)]
pub struct ListenParams {
    /// Access token, for clients that cannot set headers
    pub token: Option<String>,
}

/// GET /v1/chats/:chat_id/listen - Stream new messages over a WebSocket.
///
/// The subscription is taken before the upgrade completes, so nothing posted
/// in between is missed.
pub async fn listen(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<ChatId>,
    Query(params): Query<ListenParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (user, chat) = authorize_member(&state, chat_id, &headers, params.token.as_deref()).await?;
    let session = ListenSession::connect(&state.broker, chat.id)?;
    let cancel = state.shutdown.child_token();

    tracing::info!(chat_id = chat.id, user_id = user.id, token = ?session.token(), "Listener connected");

    Ok(ws.on_upgrade(move |socket| async move {
        let mut transport = WsTransport::new(socket);
        let outcome = session.run(&mut transport, cancel).await;
        tracing::info!(
            chat_id = chat.id,
            user_id = user.id,
            delivered = outcome.delivered,
            state = ?outcome.state,
            "Listener disconnected"
        );
    }))
}
