//! Message persistence and history

use chrono::Utc;

use super::{ChatStore, Record, StoreError, StoreResult};
use crate::types::{ChatId, Message, MessageId, UserId};

/// Commit a new message and return it.
///
/// The returned value is what gets published to live listeners, so it is
/// only produced after the record is durable.
pub fn persist_message(
    store: &ChatStore,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
) -> StoreResult<Message> {
    persist_message_with(store, chat_id, user_id, text, |message| message)
}

/// Commit a new message and hand it to `on_commit` while the store lock is
/// still held.
///
/// Callbacks therefore run in commit order, which is what keeps live
/// delivery in the same order as history.
pub fn persist_message_with<F, T>(
    store: &ChatStore,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
    on_commit: F,
) -> StoreResult<T>
where
    F: FnOnce(Message) -> T,
{
    let mut inner = store.inner.lock();
    if !inner.state.users.contains_key(&user_id) {
        return Err(StoreError::UserNotFound(user_id));
    }
    if !inner.state.chats.contains_key(&chat_id) {
        return Err(StoreError::ChatNotFound(chat_id));
    }

    let id = inner.state.next_message_id();
    inner.commit(Record::MessagePosted {
        id,
        chat_id,
        user_id,
        text: text.to_string(),
        timestamp: Utc::now(),
    })?;

    let message = inner
        .state
        .messages
        .get(&chat_id)
        .and_then(|messages| messages.last())
        .cloned()
        .ok_or(StoreError::ChatNotFound(chat_id))?;

    tracing::info!(chat_id, user_id, text, "Message posted");
    Ok(on_commit(message))
}

/// Messages of a chat with id `>= offset`, oldest first.
///
/// `limit == 0` returns everything from `offset` on.
pub fn chat_history(
    store: &ChatStore,
    chat_id: ChatId,
    offset: MessageId,
    limit: usize,
) -> StoreResult<Vec<Message>> {
    let inner = store.inner.lock();
    if !inner.state.chats.contains_key(&chat_id) {
        return Err(StoreError::ChatNotFound(chat_id));
    }

    let messages = match inner.state.messages.get(&chat_id) {
        Some(messages) => messages,
        None => return Ok(Vec::new()),
    };

    let take = if limit == 0 { usize::MAX } else { limit };
    Ok(messages
        .iter()
        .filter(|m| m.id >= offset)
        .take(take)
        .cloned()
        .collect())
}
