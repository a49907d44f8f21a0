//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::rest::{chats, messages, users};
use super::{sse, websocket, AppState};

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Users
        .route("/v1/register", post(users::register))
        .route("/v1/login", get(users::login))
        .route("/v1/auth/token", post(users::issue_token))
        .route("/v1/auth/refresh", post(users::refresh_token))
        // Chats
        .route("/v1/chats", get(chats::list_chats).post(chats::create_chat))
        .route("/v1/chats/:chat_id", get(chats::get_chat))
        .route("/v1/chats/:chat_id/join", post(chats::join_chat))
        .route("/v1/chats/:chat_id/history", get(messages::history))
        .route("/v1/chats/:chat_id/message", post(messages::post_message))
        // Live listeners
        .route("/v1/chats/:chat_id/listen", get(websocket::listen))
        .route("/v1/chats/:chat_id/events", get(sse::events))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authenticator, Credentials};
    use crate::store::ChatStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let auth = Authenticator::new("test-secret-key-that-is-at-least-32-characters-long", 4);
        Arc::new(AppState::new(Arc::new(ChatStore::in_memory()), auth))
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_listen_requires_credentials() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/chats/1/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic");
    }

    #[tokio::test]
    async fn test_sse_listener_holds_subscription() {
        let state = test_state();
        let hash = state.auth.hash_password("pw").unwrap();
        let alice = state.store.create_user("alice", hash).unwrap();
        let chat_id = state.store.create_chat("general", alice).unwrap();
        state.broker.declare_room(chat_id);

        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/chats/{}/events", chat_id))
                    .header(header::AUTHORIZATION, Credentials::basic_header("alice", "pw"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.broker.subscriber_count(chat_id), 1);

        // Client goes away
        drop(response);
        assert_eq!(state.broker.subscriber_count(chat_id), 0);
    }

    #[tokio::test]
    async fn test_sse_streams_messages_until_shutdown() {
        use futures::StreamExt;

        let state = test_state();
        let hash = state.auth.hash_password("pw").unwrap();
        let alice = state.store.create_user("alice", hash).unwrap();
        let chat_id = state.store.create_chat("general", alice).unwrap();
        state.broker.declare_room(chat_id);

        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/chats/{}/events", chat_id))
                    .header(header::AUTHORIZATION, Credentials::basic_header("alice", "pw"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let message = state.store.persist_message(chat_id, alice, "hi").unwrap();
        state.broker.publish(chat_id, Arc::new(message)).unwrap();

        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.unwrap().unwrap();
        let frame = String::from_utf8(frame.to_vec()).unwrap().replace(": ", ":");
        assert!(frame.contains("event:message"));
        assert!(frame.contains("id:1"));
        assert!(frame.contains("\"text\":\"hi\""));

        state.shutdown.cancel();
        assert!(body.next().await.is_none());
        assert_eq!(state.broker.subscriber_count(chat_id), 0);
    }
}
