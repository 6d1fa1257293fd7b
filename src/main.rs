//! Peakstop Game Server
//!
//! Binary entry point: installs logging, loads configuration from the
//! environment, and serves the WebSocket protocol.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use peakstop::{
    AppContext, AuthConfig, GameRegistry, GameServer, MemoryStore, ServerConfig, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let server_config = ServerConfig::from_env();
    let auth_config = AuthConfig::from_env();

    info!("Peakstop Server v{}", VERSION);

    let registry = GameRegistry::with_defaults();
    info!("Registered game variants: {:?}", registry.names());

    let ctx = AppContext {
        store: Arc::new(MemoryStore::new()),
        registry,
        auth: auth_config,
    };

    let server = GameServer::new(server_config, ctx);
    server.run().await.context("server terminated abnormally")?;

    Ok(())
}
