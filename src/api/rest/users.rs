//! Registration and login endpoints

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;

use crate::api::guard::current_user;
use crate::api::{ApiError, AppState};
use crate::auth::TokenPair;
use crate::types::{UserCredentials, UserId, UserPublic};

/// POST /v1/register - Create a user, returns its id
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<UserCredentials>,
) -> Result<(StatusCode, Json<UserId>), ApiError> {
    let name = credentials.name.trim().to_string();
    if name.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::bad_request("name and password must not be empty"));
    }
    if state.store.user_by_name(&name).is_some() {
        return Err(ApiError::bad_request("this username is already taken"));
    }

    let auth = state.auth.clone();
    let password = credentials.password;
    let password_hash = tokio::task::spawn_blocking(move || auth.hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("hashing task failed: {}", e)))??;

    let id = state.store.create_user(&name, password_hash)?;
    Ok((StatusCode::CREATED, Json(id)))
}

/// GET /v1/login - Return the authenticated user
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserPublic>, ApiError> {
    let user = current_user(&state, &headers, None).await?;
    Ok(Json(user.public()))
}

/// POST /v1/auth/token - Exchange name and password for a token pair
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<UserCredentials>,
) -> Result<Json<TokenPair>, ApiError> {
    let worker = state.clone();
    let user = tokio::task::spawn_blocking(move || {
        worker
            .auth
            .authenticate(&worker.store, &credentials.name, &credentials.password)
    })
    .await
    .map_err(|e| ApiError::internal(format!("authentication task failed: {}", e)))??;

    tracing::info!(user_id = user.id, "Token issued");
    Ok(Json(state.auth.issue_tokens(&user)?))
}

/// Request body for POST /v1/auth/refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /v1/auth/refresh - Trade a refresh token for a new pair
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    Ok(Json(state.auth.refresh(&state.store, &request.refresh_token)?))
}
