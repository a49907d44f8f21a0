//! Shared application state

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::Authenticator;
use crate::broker::Broker;
use crate::store::ChatStore;

/// State shared by every request handler
pub struct AppState {
    pub store: Arc<ChatStore>,
    pub broker: Broker,
    pub auth: Arc<Authenticator>,
    /// Cancelled on shutdown; every live session holds a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build state around a store, declaring every existing chat to the broker
    pub fn new(store: Arc<ChatStore>, auth: Authenticator) -> Self {
        let broker = Broker::new();
        for chat_id in store.chat_ids() {
            broker.declare_room(chat_id);
        }

        Self {
            store,
            broker,
            auth: Arc::new(auth),
            shutdown: CancellationToken::new(),
        }
    }
}
