//! User types

use serde::{Deserialize, Serialize};

use super::UserId;

/// A registered user as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// bcrypt hash, never sent to clients
    pub password_hash: String,
}

impl User {
    /// Public view of this user
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Name and password as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredentials {
    pub name: String,
    pub password: String,
}

/// User info that is safe to expose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: UserId,
    pub name: String,
}
