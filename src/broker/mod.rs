//! Real-time message broker
//!
//! In-memory publish/subscribe that fans newly posted messages out to every
//! live listener of a chat room.
//!
//! ```text
//!  POST message ─► store (commit) ─► Broker::publish(room, msg)
//!                                          │ snapshot room senders
//!                        ┌─────────────────┼─────────────────┐
//!                        ▼                 ▼                 ▼
//!                   queue(token A)    queue(token B)    queue(token C)
//!                        │                 │                 │
//!                  listen session    listen session    listen session
//! ```
//!
//! A subscriber added while a publish is fanning out may or may not receive
//! that message; one removed mid-fan-out likewise. Neither case blocks or
//! fails the publish.

mod registry;
mod subscription;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

pub use registry::{MessageSender, RoomRegistry, RoomSubscribers};
pub use subscription::{SubscriberToken, Subscription, SubscriptionGuard};

use crate::types::{ChatId, Message};

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors returned by the broker
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The room was never declared. Room existence is checked before the
    /// broker is reached, so this is a caller bug.
    #[error("unknown room: {0}")]
    UnknownRoom(ChatId),
}

/// Fan-out broker. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct Broker {
    registry: Arc<RoomRegistry>,
    declared: Arc<RwLock<HashSet<ChatId>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a room known to the broker. Idempotent.
    pub fn declare_room(&self, room_id: ChatId) {
        if self.declared.write().insert(room_id) {
            tracing::debug!(room_id, "Room declared");
        }
    }

    pub fn is_declared(&self, room_id: ChatId) -> bool {
        self.declared.read().contains(&room_id)
    }

    fn check_room(&self, room_id: ChatId) -> BrokerResult<()> {
        if self.is_declared(room_id) {
            Ok(())
        } else {
            Err(BrokerError::UnknownRoom(room_id))
        }
    }

    /// Register a new listener for `room_id`
    pub fn subscribe(&self, room_id: ChatId) -> BrokerResult<Subscription> {
        self.check_room(room_id)?;

        let token = SubscriberToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.put(room_id, token, tx);

        tracing::debug!(room_id, token = %token, "Subscribed");
        Ok(Subscription::new(
            rx,
            SubscriptionGuard::new(&self.registry, room_id, token),
        ))
    }

    /// Remove a listener by token.
    ///
    /// Returns false, without error, when the token is not subscribed to the
    /// room (already removed, or never was).
    pub fn unsubscribe(&self, room_id: ChatId, token: SubscriberToken) -> bool {
        let removed = self.registry.remove(room_id, token);
        if removed {
            tracing::debug!(room_id, token = %token, "Unsubscribed");
        } else {
            tracing::debug!(room_id, token = %token, "Unsubscribe for unknown token ignored");
        }
        removed
    }

    /// Deliver `message` to every listener subscribed to `room_id` right now.
    ///
    /// Returns once the message is in every snapshotted queue, with the number
    /// of queues that accepted it. Queues whose session already went away are
    /// skipped.
    pub fn publish(&self, room_id: ChatId, message: Arc<Message>) -> BrokerResult<usize> {
        self.check_room(room_id)?;

        let targets = self.registry.snapshot(room_id);
        let delivered = targets
            .iter()
            .filter(|tx| tx.send(message.clone()).is_ok())
            .count();

        tracing::trace!(room_id, message_id = message.id, delivered, "Published");
        Ok(delivered)
    }

    /// Number of live listeners in a room
    pub fn subscriber_count(&self, room_id: ChatId) -> usize {
        self.registry.subscriber_count(room_id)
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }
}
