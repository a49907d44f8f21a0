//! Chat store - users, chats, memberships and message history
//!
//! State lives in memory behind one mutex. When opened with a journal path,
//! every change is appended to the journal and synced before it is applied,
//! so a call that returns `Ok` is durable.

mod chats;
mod journal;
mod messages;
mod users;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use parking_lot::Mutex;

pub use journal::{Journal, Record};

use crate::types::{Chat, ChatId, ChatInfo, Message, MessageId, User, UserId};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("username is already taken: {0}")]
    UsernameTaken(String),
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("chat not found: {0}")]
    ChatNotFound(ChatId),
    #[error("journal corrupted at line {line}: {reason}")]
    Corrupted { line: usize, reason: String },
}

/// In-memory tables
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) user_ids_by_name: HashMap<String, UserId>,
    pub(crate) chats: BTreeMap<ChatId, Chat>,
    pub(crate) messages: HashMap<ChatId, Vec<Message>>,
    next_user_id: UserId,
    next_chat_id: ChatId,
    next_message_id: MessageId,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            user_ids_by_name: HashMap::new(),
            chats: BTreeMap::new(),
            messages: HashMap::new(),
            next_user_id: 1,
            next_chat_id: 1,
            next_message_id: 1,
        }
    }
}

impl StoreState {
    pub(crate) fn next_user_id(&self) -> UserId {
        self.next_user_id
    }

    pub(crate) fn next_chat_id(&self) -> ChatId {
        self.next_chat_id
    }

    pub(crate) fn next_message_id(&self) -> MessageId {
        self.next_message_id
    }

    pub(crate) fn chat_info(&self, chat: &Chat) -> ChatInfo {
        ChatInfo {
            id: chat.id,
            title: chat.title.clone(),
            members: chat
                .members
                .iter()
                .filter_map(|id| self.users.get(id))
                .map(User::public)
                .collect(),
        }
    }

    /// Apply a committed record. Used for both replay and live writes.
    pub(crate) fn apply(&mut self, record: Record) -> StoreResult<()> {
        match record {
            Record::UserCreated {
                id,
                name,
                password_hash,
            } => {
                if self.user_ids_by_name.contains_key(&name) {
                    return Err(StoreError::UsernameTaken(name));
                }
                self.user_ids_by_name.insert(name.clone(), id);
                self.users.insert(
                    id,
                    User {
                        id,
                        name,
                        password_hash,
                    },
                );
                self.next_user_id = self.next_user_id.max(id + 1);
            }
            Record::ChatCreated { id, title, owner } => {
                if !self.users.contains_key(&owner) {
                    return Err(StoreError::UserNotFound(owner));
                }
                self.chats.insert(
                    id,
                    Chat {
                        id,
                        title,
                        members: vec![owner],
                    },
                );
                self.next_chat_id = self.next_chat_id.max(id + 1);
            }
            Record::MemberJoined { chat_id, user_id } => {
                if !self.users.contains_key(&user_id) {
                    return Err(StoreError::UserNotFound(user_id));
                }
                let chat = self
                    .chats
                    .get_mut(&chat_id)
                    .ok_or(StoreError::ChatNotFound(chat_id))?;
                if !chat.has_member(user_id) {
                    chat.members.push(user_id);
                }
            }
            Record::MessagePosted {
                id,
                chat_id,
                user_id,
                text,
                timestamp,
            } => {
                let user = self
                    .users
                    .get(&user_id)
                    .ok_or(StoreError::UserNotFound(user_id))?
                    .public();
                if !self.chats.contains_key(&chat_id) {
                    return Err(StoreError::ChatNotFound(chat_id));
                }
                self.messages.entry(chat_id).or_default().push(Message {
                    id,
                    chat_id,
                    user,
                    text,
                    timestamp,
                });
                self.next_message_id = self.next_message_id.max(id + 1);
            }
        }
        Ok(())
    }
}

pub(crate) struct Inner {
    pub(crate) state: StoreState,
    journal: Option<Journal>,
}

impl Inner {
    /// Journal `record`, then apply it
    pub(crate) fn commit(&mut self, record: Record) -> StoreResult<()> {
        if let Some(journal) = self.journal.as_mut() {
            journal.append(&record)?;
        }
        self.state.apply(record)
    }
}

/// Thread-safe chat store
pub struct ChatStore {
    pub(crate) inner: Mutex<Inner>,
}

impl ChatStore {
    /// Create an empty store that keeps everything in memory
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: StoreState::default(),
                journal: None,
            }),
        }
    }

    /// Open a journal-backed store, replaying existing records
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let (journal, records) = Journal::open(path)?;
        let mut state = StoreState::default();
        let count = records.len();

        for (index, record) in records.into_iter().enumerate() {
            state.apply(record).map_err(|e| StoreError::Corrupted {
                line: index + 1,
                reason: e.to_string(),
            })?;
        }

        tracing::info!(
            path = %journal.path().display(),
            records = count,
            users = state.users.len(),
            chats = state.chats.len(),
            "Chat store loaded"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                state,
                journal: Some(journal),
            }),
        })
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ChatStore {
    // Users (from users.rs)
    pub fn create_user(&self, name: &str, password_hash: String) -> StoreResult<UserId> {
        users::create_user(self, name, password_hash)
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        users::user(self, id)
    }

    pub fn user_by_name(&self, name: &str) -> Option<User> {
        users::user_by_name(self, name)
    }

    // Chats (from chats.rs)
    pub fn create_chat(&self, title: &str, owner: UserId) -> StoreResult<ChatId> {
        chats::create_chat(self, title, owner)
    }

    pub fn create_chat_with<F>(&self, title: &str, owner: UserId, on_commit: F) -> StoreResult<ChatId>
    where
        F: FnOnce(ChatId),
    {
        chats::create_chat_with(self, title, owner, on_commit)
    }

    pub fn chat(&self, id: ChatId) -> Option<Chat> {
        chats::chat(self, id)
    }

    pub fn chat_info(&self, id: ChatId) -> Option<ChatInfo> {
        chats::chat_info(self, id)
    }

    pub fn list_chats(&self) -> Vec<ChatInfo> {
        chats::list_chats(self)
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        chats::chat_ids(self)
    }

    pub fn join_chat(&self, chat_id: ChatId, user_id: UserId) -> StoreResult<ChatInfo> {
        chats::join_chat(self, chat_id, user_id)
    }

    pub fn is_member(&self, chat_id: ChatId, user_id: UserId) -> bool {
        chats::is_member(self, chat_id, user_id)
    }

    // Messages (from messages.rs)
    pub fn persist_message(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        text: &str,
    ) -> StoreResult<Message> {
        messages::persist_message(self, chat_id, user_id, text)
    }

    pub fn persist_message_with<F, T>(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        text: &str,
        on_commit: F,
    ) -> StoreResult<T>
    where
        F: FnOnce(Message) -> T,
    {
        messages::persist_message_with(self, chat_id, user_id, text, on_commit)
    }

    pub fn chat_history(
        &self,
        chat_id: ChatId,
        offset: MessageId,
        limit: usize,
    ) -> StoreResult<Vec<Message>> {
        messages::chat_history(self, chat_id, offset, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reopen_restores_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.jsonl");

        {
            let store = ChatStore::open(&path).unwrap();
            let alice = store.create_user("alice", "hash-a".to_string()).unwrap();
            let bob = store.create_user("bob", "hash-b".to_string()).unwrap();
            let chat = store.create_chat("general", alice).unwrap();
            store.join_chat(chat, bob).unwrap();
            store.persist_message(chat, bob, "hello").unwrap();
        }

        let store = ChatStore::open(&path).unwrap();
        let alice = store.user_by_name("alice").unwrap();
        assert_eq!(alice.password_hash, "hash-a");

        let info = store.chat_info(1).unwrap();
        assert_eq!(info.title, "general");
        assert_eq!(info.members.len(), 2);

        let history = store.chat_history(1, 0, 0).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello");
        assert_eq!(history[0].user.name, "bob");

        // Ids continue after the replayed ones
        let carol = store.create_user("carol", "hash-c".to_string()).unwrap();
        assert_eq!(carol, 3);
        let msg = store.persist_message(1, alice.id, "again").unwrap();
        assert_eq!(msg.id, 2);
    }

    #[test]
    fn test_replay_rejects_inconsistent_journal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"chat_created\",\"id\":1,\"title\":\"x\",\"owner\":9}\n",
        )
        .unwrap();

        match ChatStore::open(&path) {
            Err(StoreError::Corrupted { line, reason }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("user not found"));
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected corrupted journal"),
        }
    }
}
