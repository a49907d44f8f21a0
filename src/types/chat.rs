//! Chat room types

use serde::{Deserialize, Serialize};

use super::{ChatId, UserId, UserPublic};

/// A chat room with its membership list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    /// Members in join order
    pub members: Vec<UserId>,
}

impl Chat {
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }
}

/// Request body for creating a chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCreate {
    pub title: String,
}

/// Chat as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: ChatId,
    pub title: String,
    pub members: Vec<UserPublic>,
}
