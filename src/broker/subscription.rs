//! Subscription handle for one live listener

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use uuid::Uuid;

use super::registry::RoomRegistry;
use crate::types::{ChatId, Message};

/// Opaque identifier of one subscription, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberToken(Uuid);

impl SubscriberToken {
    /// Mint a fresh random token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// RAII handle that removes a subscriber from its room on drop
#[derive(Debug)]
pub struct SubscriptionGuard {
    registry: Weak<RoomRegistry>,
    room_id: ChatId,
    token: SubscriberToken,
    released: bool,
}

impl SubscriptionGuard {
    pub(super) fn new(registry: &Arc<RoomRegistry>, room_id: ChatId, token: SubscriberToken) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            room_id,
            token,
            released: false,
        }
    }

    /// Remove the subscriber now. Later calls and the drop are no-ops.
    fn release(&mut self) -> bool {
        if std::mem::replace(&mut self.released, true) {
            return false;
        }
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.room_id, self.token),
            None => false,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.release() {
            tracing::debug!(room_id = self.room_id, token = %self.token, "Subscription released on drop");
        }
    }
}

/// One listener's live subscription to a room.
///
/// Owns the consumer side of an unbounded FIFO queue. Messages published to
/// the room while subscribed arrive in publish order. Once the subscription
/// is removed from the room and the queue drained, `recv` yields `None`.
#[derive(Debug)]
pub struct Subscription {
    receiver: UnboundedReceiver<Arc<Message>>,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub(super) fn new(receiver: UnboundedReceiver<Arc<Message>>, guard: SubscriptionGuard) -> Self {
        Self { receiver, guard }
    }

    pub fn token(&self) -> SubscriberToken {
        self.guard.token
    }

    pub fn room_id(&self) -> ChatId {
        self.guard.room_id
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        self.receiver.recv().await
    }

    /// Take the next message without waiting
    pub fn try_recv(&mut self) -> Result<Arc<Message>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Number of messages waiting in the queue
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Leave the room, discarding anything still queued
    pub fn unsubscribe(mut self) -> bool {
        self.guard.release()
    }
}

impl Stream for Subscription {
    type Item = Arc<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
