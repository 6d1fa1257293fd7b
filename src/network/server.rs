//! WebSocket Game Server
//!
//! Async WebSocket front end. Each connection gets its own task and its
//! own [`ConnState`]; all shared state is behind the [`AppContext`].
//! Handlers are synchronous and bounded, so a connection task never holds
//! a store lock across an await point.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::handler::{process_message, AppContext, ConnState};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static addr"),
            max_connections: 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind_addr),
            max_connections: std::env::var("MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            version: defaults.version,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// The game server.
pub struct GameServer {
    config: ServerConfig,
    ctx: Arc<AppContext>,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server around the shared application context.
    pub fn new(config: ServerConfig, ctx: AppContext) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            ctx: Arc::new(ctx),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Signal all connection tasks and the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the accept loop until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server v{} listening on {}", self.config.version, self.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Spawn a task serving one WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ctx = self.ctx.clone();
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let mut conn = ConnState::default();

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        let msg = match msg {
                            Some(Ok(msg)) => msg,
                            Some(Err(e)) => {
                                debug!("WebSocket error from {}: {}", addr, e);
                                break;
                            }
                            None => break,
                        };

                        let reply = match msg {
                            Message::Text(text) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => process_message(&ctx, &mut conn, client_msg),
                                    Err(e) => {
                                        debug!("Bad message from {}: {}", addr, e);
                                        ServerMessage::Error {
                                            code: ErrorCode::InvalidRequest,
                                            message: "Could not parse message.".into(),
                                        }
                                    }
                                }
                            }
                            Message::Ping(payload) => {
                                if ws_sender.send(Message::Pong(payload)).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                            Message::Close(_) => break,
                            // Binary and pong frames are ignored
                            _ => continue,
                        };

                        let text = match reply.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                error!("Failed to serialize reply: {}", e);
                                continue;
                            }
                        };
                        if ws_sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            connections.fetch_sub(1, Ordering::Relaxed);
            debug!("Connection from {} closed", addr);
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 1000);
        assert!(!config.version.is_empty());
    }
}
