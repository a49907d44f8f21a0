//! Server-Sent Events listen endpoint
//!
//! Same messages as the WebSocket listener, for clients that only need a
//! one-way stream. When the client goes away axum drops the stream, which
//! drops the subscription and removes it from the room.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::StreamExt;

use super::guard::authorize_member;
use super::websocket::ListenParams;
use super::{ApiError, AppState};
use crate::session::encode_message;
use crate::types::ChatId;

/// GET /v1/chats/:chat_id/events - SSE stream of new messages
pub async fn events(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<ChatId>,
    Query(params): Query<ListenParams>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let (user, chat) = authorize_member(&state, chat_id, &headers, params.token.as_deref()).await?;
    let subscription = state.broker.subscribe(chat.id)?;
    let cancel = state.shutdown.child_token();

    tracing::info!(chat_id = chat.id, user_id = user.id, token = %subscription.token(), "SSE listener connected");

    let stream = async_stream::stream! {
        let messages = subscription.take_until(cancel.cancelled_owned());
        futures::pin_mut!(messages);

        while let Some(message) = messages.next().await {
            match encode_message(&message) {
                Ok(data) => {
                    yield Ok::<_, Infallible>(Event::default()
                        .event("message")
                        .id(message.id.to_string())
                        .data(data));
                }
                Err(e) => {
                    tracing::warn!(chat_id, message_id = message.id, error = %e, "Skipping message");
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(30))))
}
