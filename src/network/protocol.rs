//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON, tagged by `type`. Game views are
//! embedded as pre-serialized JSON values produced by the variant's
//! explicit view functions.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create an account.
    Register {
        /// Desired username.
        username: String,
        /// Plaintext password (hashed server-side before storage).
        password: String,
    },

    /// Log in with credentials.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    /// Re-attach a session from a previously issued token.
    Resume {
        /// Session token from a prior `auth_result`.
        token: String,
    },

    /// Drop the current session.
    Logout,

    /// Place a bet and open a new game.
    CreateGame {
        /// Variant name, e.g. `"optimal-stopping"`.
        game: String,
        /// Bet amount as submitted; validated server-side so a bad value
        /// yields a notice rather than a protocol error.
        bet: String,
    },

    /// Act on the open game.
    Play {
        /// Variant name.
        game: String,
        /// Action string: `init`, `next` or `stop`. Anything else is a
        /// rejected no-op.
        action: String,
    },

    /// Resolved-game records for the authenticated user, per variant.
    Statistics,

    /// Current wallet balance.
    Balance,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Result of register/login/resume.
    AuthResult {
        /// Whether the request succeeded.
        success: bool,
        /// Session token on successful login/resume.
        token: Option<String>,
        /// Wallet balance on successful login/resume.
        balance: Option<i64>,
        /// User-facing message.
        message: String,
    },

    /// Open view of an in-progress game.
    GameView {
        /// Variant name.
        game: String,
        /// Whether the user currently has an open game of this variant.
        active: bool,
        /// Secret-hiding view (commitment hash, revealed prefix, config).
        view: serde_json::Value,
    },

    /// Terminal result of a resolved game.
    GameOver {
        /// Variant name.
        game: String,
        /// `"You win."` or `"You lose."`
        message: String,
        /// Secret-revealing view for independent verification.
        view: serde_json::Value,
    },

    /// Non-fatal user-facing notice ("Invalid bet.", ...).
    Notice {
        /// The message.
        message: String,
    },

    /// Resolved-game records per variant.
    Statistics {
        /// Variant name -> audit views, oldest first.
        data: BTreeMap<String, Vec<serde_json::Value>>,
    },

    /// Current wallet balance.
    Balance {
        /// The balance.
        balance: i64,
    },

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time (Unix millis).
        server_time: u64,
    },

    /// Protocol-level error.
    Error {
        /// Error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request requires an authenticated session.
    NotAuthenticated,
    /// Session token is invalid.
    InvalidToken,
    /// Session token has expired.
    TokenExpired,
    /// Request could not be parsed.
    InvalidRequest,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_json_roundtrip() {
        let msg = ClientMessage::CreateGame {
            game: "optimal-stopping".into(),
            bet: "100".into(),
        };

        let json = msg.to_json().unwrap();
        let parsed = ClientMessage::from_json(&json).unwrap();

        if let ClientMessage::CreateGame { game, bet } = parsed {
            assert_eq!(game, "optimal-stopping");
            assert_eq!(bet, "100");
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_client_message_tag_format() {
        let msg = ClientMessage::Play {
            game: "optimal-stopping".into(),
            action: "next".into(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"play\""));
    }

    #[test]
    fn test_server_message_json_roundtrip() {
        let msg = ServerMessage::GameView {
            game: "optimal-stopping".into(),
            active: true,
            view: json!({"position": 3, "hashed_setup": "abc"}),
        };

        let json = msg.to_json().unwrap();
        let parsed = ServerMessage::from_json(&json).unwrap();

        if let ServerMessage::GameView { active, view, .. } = parsed {
            assert!(active);
            assert_eq!(view["position"], 3);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_error_codes_snake_case() {
        let msg = ServerMessage::Error {
            code: ErrorCode::NotAuthenticated,
            message: "log in first".into(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("not_authenticated"));
    }

    #[test]
    fn test_unknown_client_message_rejected() {
        assert!(ClientMessage::from_json("{\"type\":\"teleport\"}").is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_auth_result_roundtrip() {
        let msg = ServerMessage::AuthResult {
            success: true,
            token: Some("jwt".into()),
            balance: Some(1000),
            message: "You are now logged in.".into(),
        };
        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        if let ServerMessage::AuthResult { success, balance, .. } = parsed {
            assert!(success);
            assert_eq!(balance, Some(1000));
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_statistics_roundtrip() {
        let mut data = BTreeMap::new();
        data.insert(
            "optimal-stopping".to_string(),
            vec![json!({"bet": 100, "win": true})],
        );
        let msg = ServerMessage::Statistics { data };
        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        if let ServerMessage::Statistics { data } = parsed {
            assert_eq!(data["optimal-stopping"][0]["bet"], 100);
        } else {
            panic!("Wrong message type");
        }
    }
}
