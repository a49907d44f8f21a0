//! User operations

use super::{ChatStore, Record, StoreError, StoreResult};
use crate::types::{User, UserId};

/// Register a new user. Names are unique.
pub fn create_user(store: &ChatStore, name: &str, password_hash: String) -> StoreResult<UserId> {
    let mut inner = store.inner.lock();
    if inner.state.user_ids_by_name.contains_key(name) {
        return Err(StoreError::UsernameTaken(name.to_string()));
    }

    let id = inner.state.next_user_id();
    inner.commit(Record::UserCreated {
        id,
        name: name.to_string(),
        password_hash,
    })?;

    tracing::info!(user_id = id, name, "User registered");
    Ok(id)
}

pub fn user(store: &ChatStore, id: UserId) -> Option<User> {
    store.inner.lock().state.users.get(&id).cloned()
}

pub fn user_by_name(store: &ChatStore, name: &str) -> Option<User> {
    let inner = store.inner.lock();
    inner
        .state
        .user_ids_by_name
        .get(name)
        .and_then(|id| inner.state.users.get(id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_lookup_user() {
        let store = ChatStore::in_memory();
        let id = store.create_user("alice", "hash".to_string()).unwrap();
        assert_eq!(id, 1);

        let by_id = store.user(id).unwrap();
        let by_name = store.user_by_name("alice").unwrap();
        assert_eq!(by_id, by_name);
        assert_eq!(by_id.public().name, "alice");

        assert!(store.user(2).is_none());
        assert!(store.user_by_name("bob").is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = ChatStore::in_memory();
        store.create_user("alice", "h1".to_string()).unwrap();
        let err = store.create_user("alice", "h2".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(name) if name == "alice"));

        // The failed attempt does not consume an id
        assert_eq!(store.create_user("bob", "h3".to_string()).unwrap(), 2);
    }
}
