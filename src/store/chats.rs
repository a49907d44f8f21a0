//! Chat and membership operations

use super::{ChatStore, Record, StoreError, StoreResult};
use crate::types::{Chat, ChatId, ChatInfo, UserId};

/// Create a chat; its owner becomes the first member
pub fn create_chat(store: &ChatStore, title: &str, owner: UserId) -> StoreResult<ChatId> {
    create_chat_with(store, title, owner, |_| {})
}

/// Create a chat and run `on_commit` with its id before the store lock is
/// released. No other caller can observe the chat before `on_commit` ran.
pub fn create_chat_with<F>(
    store: &ChatStore,
    title: &str,
    owner: UserId,
    on_commit: F,
) -> StoreResult<ChatId>
where
    F: FnOnce(ChatId),
{
    let mut inner = store.inner.lock();
    if !inner.state.users.contains_key(&owner) {
        return Err(StoreError::UserNotFound(owner));
    }

    let id = inner.state.next_chat_id();
    inner.commit(Record::ChatCreated {
        id,
        title: title.to_string(),
        owner,
    })?;

    on_commit(id);

    tracing::info!(chat_id = id, owner, title, "Chat created");
    Ok(id)
}

pub fn chat(store: &ChatStore, id: ChatId) -> Option<Chat> {
    store.inner.lock().state.chats.get(&id).cloned()
}

pub fn chat_info(store: &ChatStore, id: ChatId) -> Option<ChatInfo> {
    let inner = store.inner.lock();
    inner
        .state
        .chats
        .get(&id)
        .map(|chat| inner.state.chat_info(chat))
}

/// All chats in id order
pub fn list_chats(store: &ChatStore) -> Vec<ChatInfo> {
    let inner = store.inner.lock();
    inner
        .state
        .chats
        .values()
        .map(|chat| inner.state.chat_info(chat))
        .collect()
}

pub fn chat_ids(store: &ChatStore) -> Vec<ChatId> {
    store.inner.lock().state.chats.keys().copied().collect()
}

/// Add `user_id` to the chat. Joining twice is a no-op.
pub fn join_chat(store: &ChatStore, chat_id: ChatId, user_id: UserId) -> StoreResult<ChatInfo> {
    let mut inner = store.inner.lock();
    if !inner.state.users.contains_key(&user_id) {
        return Err(StoreError::UserNotFound(user_id));
    }
    let already_member = inner
        .state
        .chats
        .get(&chat_id)
        .ok_or(StoreError::ChatNotFound(chat_id))?
        .has_member(user_id);

    if !already_member {
        inner.commit(Record::MemberJoined { chat_id, user_id })?;
        tracing::info!(chat_id, user_id, "User joined chat");
    }

    let chat = inner
        .state
        .chats
        .get(&chat_id)
        .ok_or(StoreError::ChatNotFound(chat_id))?;
    Ok(inner.state.chat_info(chat))
}

pub fn is_member(store: &ChatStore, chat_id: ChatId, user_id: UserId) -> bool {
    store
        .inner
        .lock()
        .state
        .chats
        .get(&chat_id)
        .map(|chat| chat.has_member(user_id))
        .unwrap_or(false)
}
