//! Chat Server
//!
//! A multi-room chat service. Users register, create and join chats, post
//! messages, read history, and listen for new messages live over WebSocket
//! or Server-Sent Events.
//!
//! # Modules
//!
//! - `types`: Users, chats and messages
//! - `broker`: In-memory publish/subscribe that fans messages out to listeners
//! - `session`: Bridges one live connection to one broker subscription
//! - `store`: Users, chats, memberships and history, with an optional journal
//! - `auth`: Password hashing, HTTP Basic and JWT bearer authentication
//! - `api`: Axum routes
//! - `config`: Environment configuration
//! - `server`: Bootstrap and graceful shutdown
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chat_server::{Broker, Message, UserPublic};
//!
//! let broker = Broker::new();
//! broker.declare_room(7);
//!
//! let mut subscription = broker.subscribe(7).unwrap();
//! let message = Arc::new(Message {
//!     id: 1,
//!     chat_id: 7,
//!     user: UserPublic { id: 1, name: "alice".to_string() },
//!     text: "hi".to_string(),
//!     timestamp: chrono::Utc::now(),
//! });
//! assert_eq!(broker.publish(7, message).unwrap(), 1);
//! assert_eq!(subscription.try_recv().unwrap().text, "hi");
//! ```

pub mod api;
pub mod auth;
pub mod broker;
pub mod config;
pub mod logging;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use api::{create_router, ApiError, AppState};
pub use auth::{Authenticator, Credentials};
pub use broker::{Broker, BrokerError, SubscriberToken, Subscription};
pub use config::ServerConfig;
pub use session::{ListenSession, SessionOutcome, SessionState, Transport, TransportError};
pub use store::{ChatStore, StoreError};
pub use types::{Chat, ChatId, ChatInfo, Message, MessageId, User, UserId, UserPublic};

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name
pub const NAME: &str = "chat-server";
