//! Data types for the chat server
//!
//! This module contains the core data structures shared by the store, the
//! broker and the HTTP layer.

mod chat;
mod message;
mod user;

pub use chat::{Chat, ChatCreate, ChatInfo};
pub use message::{Message, MessageCreate};
pub use user::{User, UserCredentials, UserPublic};

/// Identifier of a registered user
pub type UserId = i64;

/// Identifier of a chat room
pub type ChatId = i64;

/// Identifier of a persisted message
pub type MessageId = i64;
