//! Chat message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatId, MessageId, UserPublic};

/// Request body for posting a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreate {
    pub text: String,
}

/// A posted message.
///
/// Built once by the store when the post is committed and then shared
/// read-only (behind an `Arc`) with every live listener of the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub user: UserPublic,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}
