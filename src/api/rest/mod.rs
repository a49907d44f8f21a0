//! REST endpoints
//!
//! - `POST /v1/register` - Create a user
//! - `GET /v1/login` - Check credentials
//! - `POST /v1/auth/token`, `POST /v1/auth/refresh` - JWT issue and refresh
//! - `GET|POST /v1/chats`, `GET /v1/chats/:chat_id`, `POST /v1/chats/:chat_id/join`
//! - `GET /v1/chats/:chat_id/history`, `POST /v1/chats/:chat_id/message`

pub mod chats;
pub mod messages;
pub mod users;
