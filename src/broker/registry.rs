//! Room registry: chat id -> live subscriber queues
//!
//! The outer map only grows. A room entry is created on first use and stays
//! (possibly empty) for the life of the process. Each room has its own lock,
//! so churn in one room never contends with publishes in another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;

use super::SubscriberToken;
use crate::types::{ChatId, Message};

/// Producer side of one subscriber queue
pub type MessageSender = UnboundedSender<Arc<Message>>;

/// Subscriber queues of a single room
#[derive(Debug, Default)]
pub struct RoomSubscribers {
    senders: Mutex<HashMap<SubscriberToken, MessageSender>>,
}

impl RoomSubscribers {
    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.lock().is_empty()
    }
}

/// Maps each room to its subscriber set
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<ChatId, Arc<RoomSubscribers>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the subscriber set of a room, creating it if absent
    pub fn ensure(&self, room_id: ChatId) -> Arc<RoomSubscribers> {
        if let Some(room) = self.rooms.read().get(&room_id) {
            return room.clone();
        }
        self.rooms.write().entry(room_id).or_default().clone()
    }

    fn get(&self, room_id: ChatId) -> Option<Arc<RoomSubscribers>> {
        self.rooms.read().get(&room_id).cloned()
    }

    /// Register a queue under `token` in `room_id`
    pub fn put(&self, room_id: ChatId, token: SubscriberToken, sender: MessageSender) {
        let room = self.ensure(room_id);
        let previous = room.senders.lock().insert(token, sender);
        debug_assert!(previous.is_none(), "subscriber token reused");
    }

    /// Remove `token` from `room_id`; returns false when it was not registered
    pub fn remove(&self, room_id: ChatId, token: SubscriberToken) -> bool {
        match self.get(room_id) {
            Some(room) => room.senders.lock().remove(&token).is_some(),
            None => false,
        }
    }

    /// Clone the current queues of a room.
    ///
    /// The room lock is held only for the copy, never while enqueueing.
    pub fn snapshot(&self, room_id: ChatId) -> Vec<MessageSender> {
        match self.get(room_id) {
            Some(room) => room.senders.lock().values().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, room_id: ChatId, token: SubscriberToken) -> bool {
        self.get(room_id)
            .map(|room| room.senders.lock().contains_key(&token))
            .unwrap_or(false)
    }

    /// Number of live subscribers in a room
    pub fn subscriber_count(&self, room_id: ChatId) -> usize {
        self.get(room_id).map(|room| room.len()).unwrap_or(0)
    }

    /// Number of rooms that ever had a subscriber
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}
