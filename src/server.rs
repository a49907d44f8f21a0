//! Server bootstrap: store, state, listener and graceful shutdown

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api::{create_router, AppState};
use crate::auth::Authenticator;
use crate::config::{ConfigError, ServerConfig};
use crate::store::{ChatStore, StoreError};

/// Errors that stop the server
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the configured store and build the shared state
pub fn build_state(config: &ServerConfig) -> Result<Arc<AppState>, ServerError> {
    let store = match &config.data_file {
        Some(path) => ChatStore::open(path)?,
        None => {
            tracing::warn!("CHAT_DATA_FILE not set, data will not survive a restart");
            ChatStore::in_memory()
        }
    };

    Ok(Arc::new(AppState::new(
        Arc::new(store),
        Authenticator::from_config(config),
    )))
}

/// Run the server until Ctrl-C
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    run_until(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run the server until `shutdown` resolves.
///
/// Live listeners are cancelled first so their connections close, then axum
/// drains the remaining requests.
pub async fn run_until<F>(config: ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = build_state(&config)?;
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Chat server listening");

    let sessions = state.shutdown.clone();
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            sessions.cancel();
        })
        .await?;

    tracing::info!("Chat server stopped");
    Ok(())
}
