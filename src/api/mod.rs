//! HTTP API: REST endpoints plus live WebSocket/SSE listeners
//!
//! - `rest`: register, login, chats, history, message posting
//! - `websocket` / `sse`: live message streams backed by the broker

pub mod error;
pub mod guard;
pub mod http;
pub mod rest;
pub mod sse;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use http::create_router;
pub use state::AppState;
