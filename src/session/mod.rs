//! Live-listen sessions
//!
//! A session bridges one network connection to one broker subscription. It
//! drains the subscription queue and writes each message to the peer until
//! the peer goes away, a write fails, or the session is cancelled. Whatever
//! the exit path, the subscription is released exactly once.
//!
//! ```text
//! Connecting ──subscribe──► Subscribed ──┬── peer close / cancel / unsubscribed ──► ClosedClean
//!                                         └── write or read failure ──────────────► ClosedError
//! ```

mod websocket;

use std::future::Future;

use tokio_util::sync::CancellationToken;

pub use websocket::{ClientMessage, PongMessage, WsTransport};

use crate::broker::{Broker, BrokerResult, SubscriberToken, Subscription};
use crate::types::{ChatId, Message};

/// Errors raised by a transport. They end the session and never reach the broker.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Duplex channel to one remote listener
pub trait Transport: Send {
    /// Write one encoded message to the peer
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Resolve once the peer is gone: `Ok` for an orderly close, `Err` for a
    /// reset or read failure. Must be cancel safe.
    fn closed(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Subscribed,
    ClosedClean,
    ClosedError,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::ClosedClean | SessionState::ClosedError)
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub state: SessionState,
    /// Messages written to the peer
    pub delivered: u64,
    pub error: Option<TransportError>,
}

/// Encode a message as one JSON text frame
pub fn encode_message(message: &Message) -> Result<String, TransportError> {
    serde_json::to_string(message).map_err(|e| TransportError::Encode(e.to_string()))
}

/// One listener draining one room subscription
#[derive(Debug)]
pub struct ListenSession {
    room_id: ChatId,
    subscription: Option<Subscription>,
    state: SessionState,
}

impl ListenSession {
    /// A session for `room_id` that has not subscribed yet
    pub fn new(room_id: ChatId) -> Self {
        Self {
            room_id,
            subscription: None,
            state: SessionState::Connecting,
        }
    }

    /// Create a session and subscribe it to `room_id`
    pub fn connect(broker: &Broker, room_id: ChatId) -> BrokerResult<Self> {
        let mut session = Self::new(room_id);
        session.subscribe(broker)?;
        Ok(session)
    }

    /// Wrap an existing subscription
    pub fn from_subscription(subscription: Subscription) -> Self {
        Self {
            room_id: subscription.room_id(),
            subscription: Some(subscription),
            state: SessionState::Subscribed,
        }
    }

    /// `Connecting -> Subscribed`. A failed subscribe ends the session.
    pub fn subscribe(&mut self, broker: &Broker) -> BrokerResult<()> {
        if self.state != SessionState::Connecting {
            return Ok(());
        }

        match broker.subscribe(self.room_id) {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = SessionState::Subscribed;
                Ok(())
            }
            Err(e) => {
                tracing::debug!(room_id = self.room_id, error = %e, "Listen session could not subscribe");
                self.state = SessionState::ClosedError;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token of the live subscription, if there is one
    pub fn token(&self) -> Option<SubscriberToken> {
        self.subscription.as_ref().map(Subscription::token)
    }

    pub fn room_id(&self) -> ChatId {
        self.room_id
    }

    /// Pump messages to `transport` until the session ends.
    ///
    /// Cancelling `cancel` interrupts a pending wait; anything still queued
    /// for this listener is dropped. A session that never subscribed ends
    /// immediately in `ClosedError`.
    pub async fn run<T: Transport>(
        mut self,
        transport: &mut T,
        cancel: CancellationToken,
    ) -> SessionOutcome {
        let room_id = self.room_id;
        let Some(mut subscription) = self.subscription.take() else {
            tracing::warn!(room_id, state = ?self.state, "Listen session has no subscription");
            return SessionOutcome {
                state: SessionState::ClosedError,
                delivered: 0,
                error: None,
            };
        };
        let token = subscription.token();
        let mut delivered = 0u64;
        let mut error = None;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::debug!(room_id, token = %token, "Listen session cancelled");
                    self.state = SessionState::ClosedClean;
                    break;
                }

                closed = transport.closed() => {
                    match closed {
                        Ok(()) => self.state = SessionState::ClosedClean,
                        Err(e) => {
                            self.state = SessionState::ClosedError;
                            error = Some(e);
                        }
                    }
                    break;
                }

                next = subscription.recv() => {
                    let Some(message) = next else {
                        // Removed from the room by someone else
                        self.state = SessionState::ClosedClean;
                        break;
                    };

                    let frame = match encode_message(&message) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(room_id, message_id = message.id, error = %e, "Skipping message");
                            continue;
                        }
                    };

                    if let Err(e) = transport.send_text(frame).await {
                        self.state = SessionState::ClosedError;
                        error = Some(e);
                        break;
                    }
                    delivered += 1;
                }
            }
        }

        subscription.unsubscribe();

        match &error {
            Some(e) => tracing::warn!(room_id, token = %token, delivered, error = %e, "Listen session failed"),
            None => tracing::debug!(room_id, token = %token, delivered, "Listen session closed"),
        }

        SessionOutcome {
            state: self.state,
            delivered,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserPublic;
    use chrono::Utc;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct MockTransport {
        sent: mpsc::UnboundedSender<String>,
        close_rx: mpsc::UnboundedReceiver<Result<(), TransportError>>,
        fail_sends: bool,
    }

    impl Transport for MockTransport {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::Send("connection reset".to_string()));
            }
            self.sent
                .send(text)
                .map_err(|_| TransportError::Send("receiver dropped".to_string()))
        }

        async fn closed(&mut self) -> Result<(), TransportError> {
            match self.close_rx.recv().await {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }

    type Harness = (
        MockTransport,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<Result<(), TransportError>>,
    );

    fn transport(fail_sends: bool) -> Harness {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = mpsc::unbounded_channel();
        (
            MockTransport {
                sent: sent_tx,
                close_rx,
                fail_sends,
            },
            sent_rx,
            close_tx,
        )
    }

    fn message(chat_id: ChatId, id: i64, text: &str) -> Arc<Message> {
        Arc::new(Message {
            id,
            chat_id,
            user: UserPublic {
                id: 1,
                name: "alice".to_string(),
            },
            text: text.to_string(),
            timestamp: Utc::now(),
        })
    }

    fn broker_with_room(room_id: ChatId) -> Broker {
        let broker = Broker::new();
        broker.declare_room(room_id);
        broker
    }

    #[tokio::test]
    async fn test_delivers_in_order_until_peer_closes() {
        let broker = broker_with_room(1);
        let session = ListenSession::connect(&broker, 1).unwrap();
        assert_eq!(session.state(), SessionState::Subscribed);

        let (mut transport, mut sent, close) = transport(false);
        let handle = tokio::spawn(async move {
            session.run(&mut transport, CancellationToken::new()).await
        });

        broker.publish(1, message(1, 1, "one")).unwrap();
        broker.publish(1, message(1, 2, "two")).unwrap();

        let first: Message = serde_json::from_str(&sent.recv().await.unwrap()).unwrap();
        let second: Message = serde_json::from_str(&sent.recv().await.unwrap()).unwrap();
        assert_eq!(first.text, "one");
        assert_eq!(second.text, "two");

        close.send(Ok(())).unwrap();
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.state, SessionState::ClosedClean);
        assert_eq!(outcome.delivered, 2);
        assert!(outcome.error.is_none());
        assert_eq!(broker.subscriber_count(1), 0);
    }

    #[tokio::test]
    async fn test_send_failure_releases_subscription() {
        let broker = broker_with_room(2);
        let session = ListenSession::connect(&broker, 2).unwrap();
        let (mut transport, _sent, _close) = transport(true);

        broker.publish(2, message(2, 1, "lost")).unwrap();
        let outcome = session.run(&mut transport, CancellationToken::new()).await;

        assert_eq!(outcome.state, SessionState::ClosedError);
        assert!(matches!(outcome.error, Some(TransportError::Send(_))));
        assert_eq!(broker.subscriber_count(2), 0);

        // Later publishes still succeed for the room
        assert_eq!(broker.publish(2, message(2, 2, "after")).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_peer_reset_is_an_error() {
        let broker = broker_with_room(3);
        let session = ListenSession::connect(&broker, 3).unwrap();
        let (mut transport, _sent, close) = transport(false);

        close
            .send(Err(TransportError::Receive("reset".to_string())))
            .unwrap();
        let outcome = session.run(&mut transport, CancellationToken::new()).await;

        assert_eq!(outcome.state, SessionState::ClosedError);
        assert!(outcome.state.is_terminal());
        assert_eq!(broker.subscriber_count(3), 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_wait() {
        let broker = broker_with_room(4);
        let session = ListenSession::connect(&broker, 4).unwrap();
        let (mut transport, _sent, _close) = transport(false);
        let cancel = CancellationToken::new();

        let child = cancel.child_token();
        let handle = tokio::spawn(async move { session.run(&mut transport, child).await });

        assert_eq!(broker.subscriber_count(4), 1);
        cancel.cancel();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.state, SessionState::ClosedClean);
        assert_eq!(outcome.delivered, 0);
        assert_eq!(broker.subscriber_count(4), 0);
    }

    #[tokio::test]
    async fn test_external_unsubscribe_ends_session() {
        let broker = broker_with_room(5);
        let session = ListenSession::connect(&broker, 5).unwrap();
        let token = session.token().unwrap();
        let (mut transport, _sent, _close) = transport(false);

        assert!(broker.unsubscribe(5, token));
        let outcome = session.run(&mut transport, CancellationToken::new()).await;
        assert_eq!(outcome.state, SessionState::ClosedClean);
    }

    #[test]
    fn test_connect_to_unknown_room() {
        let broker = Broker::new();
        assert!(ListenSession::connect(&broker, 9).is_err());
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let broker = broker_with_room(6);

        let mut session = ListenSession::new(6);
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(session.token().is_none());

        session.subscribe(&broker).unwrap();
        assert_eq!(session.state(), SessionState::Subscribed);
        assert!(session.token().is_some());
        assert_eq!(broker.subscriber_count(6), 1);

        // Already subscribed; no second registration
        session.subscribe(&broker).unwrap();
        assert_eq!(broker.subscriber_count(6), 1);

        let mut failed = ListenSession::new(60);
        assert!(failed.subscribe(&broker).is_err());
        assert_eq!(failed.state(), SessionState::ClosedError);
        assert!(failed.state().is_terminal());
    }

    #[tokio::test]
    async fn test_run_without_subscription() {
        let (mut transport, _sent, _close) = transport(false);
        let outcome = ListenSession::new(7)
            .run(&mut transport, CancellationToken::new())
            .await;
        assert_eq!(outcome.state, SessionState::ClosedError);
        assert_eq!(outcome.delivered, 0);
    }
}
