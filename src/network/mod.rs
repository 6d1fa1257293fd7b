//! Networking layer (non-deterministic).
//!
//! - `auth`: password storage and session tokens
//! - `protocol`: JSON message types
//! - `handler`: message dispatch against the store and game registry
//! - `server`: async WebSocket front end

pub mod auth;
pub mod protocol;
pub mod handler;
pub mod server;

// Re-export key types
pub use auth::AuthConfig;
pub use handler::{AppContext, ConnState, process_message};
pub use protocol::{ClientMessage, ServerMessage, ErrorCode};
pub use server::{GameServer, ServerConfig, GameServerError};
