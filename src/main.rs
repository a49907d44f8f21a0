//! Chat Server - Binary Entry Point

use chat_server::config::ServerConfig;
use chat_server::logging::init_logging;
use chat_server::server::{self, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    init_logging();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        version = chat_server::VERSION,
        persistent = config.data_file.is_some(),
        "Starting {}",
        chat_server::NAME
    );

    server::run(config).await
}
