//! Request Handling
//!
//! Maps protocol messages onto store and game operations. All shared
//! state lives in an explicitly threaded [`AppContext`]; the only
//! per-connection state is which user (if any) the connection speaks for.
//!
//! Validation failures are user-facing notices with no state change;
//! each message is evaluated exactly once against the latest persisted
//! state, and nothing is retried.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::game::{GameRegistry, PlayAction, PlayOutcome};
use crate::network::auth::{self, AuthConfig, AuthError};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::store::{Store, StoreError};

/// Shared application state, threaded through every handler call.
#[derive(Clone)]
pub struct AppContext {
    /// Persistence store and ledger.
    pub store: Arc<dyn Store>,
    /// Game variant registry.
    pub registry: GameRegistry,
    /// Session/auth configuration.
    pub auth: AuthConfig,
}

/// Per-connection session state.
#[derive(Debug, Default)]
pub struct ConnState {
    /// The authenticated user, once logged in or resumed.
    pub user_id: Option<Uuid>,
}

/// Process one client message and produce the response.
pub fn process_message(ctx: &AppContext, conn: &mut ConnState, msg: ClientMessage) -> ServerMessage {
    match msg {
        ClientMessage::Register { username, password } => handle_register(ctx, &username, &password),
        ClientMessage::Login { username, password } => handle_login(ctx, conn, &username, &password),
        ClientMessage::Resume { token } => handle_resume(ctx, conn, &token),
        ClientMessage::Logout => {
            conn.user_id = None;
            ServerMessage::Notice {
                message: "You have been logged out.".into(),
            }
        }
        ClientMessage::CreateGame { game, bet } => handle_create_game(ctx, conn, &game, &bet),
        ClientMessage::Play { game, action } => handle_play(ctx, conn, &game, &action),
        ClientMessage::Statistics => handle_statistics(ctx, conn),
        ClientMessage::Balance => handle_balance(ctx, conn),
        ClientMessage::Ping { timestamp } => ServerMessage::Pong {
            timestamp,
            server_time: Utc::now().timestamp_millis() as u64,
        },
    }
}

fn require_auth(conn: &ConnState) -> Result<Uuid, ServerMessage> {
    conn.user_id.ok_or(ServerMessage::Error {
        code: ErrorCode::NotAuthenticated,
        message: "You must be logged in.".into(),
    })
}

fn internal_error() -> ServerMessage {
    ServerMessage::Error {
        code: ErrorCode::InternalError,
        message: "Internal error.".into(),
    }
}

fn handle_register(ctx: &AppContext, username: &str, password: &str) -> ServerMessage {
    if username.is_empty() || password.is_empty() {
        return ServerMessage::AuthResult {
            success: false,
            token: None,
            balance: None,
            message: "Username and password are required.".into(),
        };
    }

    match ctx.store.create_user(username, &auth::hash_password(password)) {
        Ok(_) => ServerMessage::AuthResult {
            success: true,
            token: None,
            balance: None,
            message: "Account has been created.".into(),
        },
        Err(StoreError::DuplicateUsername) => ServerMessage::AuthResult {
            success: false,
            token: None,
            balance: None,
            message: "Account with this username already exists.".into(),
        },
        Err(_) => internal_error(),
    }
}

fn handle_login(ctx: &AppContext, conn: &mut ConnState, username: &str, password: &str) -> ServerMessage {
    // Same message for unknown user and bad password: no account enumeration.
    let failed = ServerMessage::AuthResult {
        success: false,
        token: None,
        balance: None,
        message: "Invalid username or password.".into(),
    };

    let Some(user) = ctx.store.user_by_name(username) else {
        return failed;
    };
    if !auth::verify_password(&user.password_hash, password) {
        return failed;
    }

    let token = match auth::issue_token(&ctx.auth, user.id) {
        Ok(token) => token,
        Err(_) => return internal_error(),
    };

    conn.user_id = Some(user.id);
    ServerMessage::AuthResult {
        success: true,
        token: Some(token),
        balance: Some(user.balance),
        message: "You are now logged in.".into(),
    }
}

fn handle_resume(ctx: &AppContext, conn: &mut ConnState, token: &str) -> ServerMessage {
    let user_id = match auth::validate_token(&ctx.auth, token) {
        Ok(id) => id,
        Err(AuthError::Expired) => {
            return ServerMessage::Error {
                code: ErrorCode::TokenExpired,
                message: "Session has expired.".into(),
            }
        }
        Err(_) => {
            return ServerMessage::Error {
                code: ErrorCode::InvalidToken,
                message: "Invalid session token.".into(),
            }
        }
    };

    let Some(user) = ctx.store.user_by_id(user_id) else {
        return ServerMessage::Error {
            code: ErrorCode::InvalidToken,
            message: "Invalid session token.".into(),
        };
    };

    conn.user_id = Some(user.id);
    ServerMessage::AuthResult {
        success: true,
        token: Some(token.to_string()),
        balance: Some(user.balance),
        message: "Session resumed.".into(),
    }
}

fn handle_create_game(ctx: &AppContext, conn: &mut ConnState, game: &str, bet: &str) -> ServerMessage {
    let user_id = match require_auth(conn) {
        Ok(id) => id,
        Err(err) => return err,
    };
    let Some(variant) = ctx.registry.get(game) else {
        return ServerMessage::Notice {
            message: "Invalid game name.".into(),
        };
    };

    // Creating while a game is open is idempotent: show the open game.
    if let Some(open) = ctx.store.open_game(user_id, variant.name()) {
        return ServerMessage::GameView {
            game: variant.name().to_string(),
            active: true,
            view: variant.public_view(&open),
        };
    }

    let bet = match bet.trim().parse::<i64>() {
        Ok(amount) if amount > 0 => amount,
        _ => {
            return ServerMessage::Notice {
                message: "Invalid bet.".into(),
            }
        }
    };

    let record = variant.new_round(user_id, bet);
    match ctx.store.create_game(record) {
        Ok(record) => ServerMessage::GameView {
            game: variant.name().to_string(),
            active: true,
            view: variant.public_view(&record),
        },
        Err(StoreError::InsufficientFunds) => ServerMessage::Notice {
            message: "You don't have enough money.".into(),
        },
        // Lost a create race; the open game wins.
        Err(StoreError::ActiveGameExists) => match ctx.store.open_game(user_id, variant.name()) {
            Some(open) => ServerMessage::GameView {
                game: variant.name().to_string(),
                active: true,
                view: variant.public_view(&open),
            },
            None => internal_error(),
        },
        Err(_) => internal_error(),
    }
}

fn handle_play(ctx: &AppContext, conn: &mut ConnState, game: &str, action: &str) -> ServerMessage {
    let user_id = match require_auth(conn) {
        Ok(id) => id,
        Err(err) => return err,
    };
    let Some(variant) = ctx.registry.get(game) else {
        return ServerMessage::Notice {
            message: "Invalid game name.".into(),
        };
    };

    // Unknown action strings are rejected no-ops, not errors.
    let action = PlayAction::parse(action);

    let result = ctx.store.transact_open_game(user_id, variant.name(), &mut |record| {
        match action {
            Some(action) => variant.play(record, action),
            None => PlayOutcome::Unchanged,
        }
    });

    match result {
        Ok((record, PlayOutcome::Resolved { win })) => ServerMessage::GameOver {
            game: variant.name().to_string(),
            message: if win { "You win." } else { "You lose." }.into(),
            view: variant.audit_view(&record),
        },
        Ok((record, _)) => ServerMessage::GameView {
            game: variant.name().to_string(),
            active: true,
            view: variant.public_view(&record),
        },
        Err(StoreError::GameNotFound) => ServerMessage::Notice {
            message: "No active game.".into(),
        },
        Err(_) => internal_error(),
    }
}

fn handle_statistics(ctx: &AppContext, conn: &mut ConnState) -> ServerMessage {
    let user_id = match require_auth(conn) {
        Ok(id) => id,
        Err(err) => return err,
    };

    let mut data = std::collections::BTreeMap::new();
    for name in ctx.registry.names() {
        let Some(variant) = ctx.registry.get(name) else {
            continue;
        };
        let views = ctx
            .store
            .resolved_games(user_id, name)
            .iter()
            .map(|record| variant.audit_view(record))
            .collect();
        data.insert(name.to_string(), views);
    }

    ServerMessage::Statistics { data }
}

fn handle_balance(ctx: &AppContext, conn: &mut ConnState) -> ServerMessage {
    let user_id = match require_auth(conn) {
        Ok(id) => id,
        Err(err) => return err,
    };
    match ctx.store.balance(user_id) {
        Ok(balance) => ServerMessage::Balance { balance },
        Err(_) => internal_error(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fair::commitment::{verify_reveal, SetupReveal};
    use crate::store::MemoryStore;

    fn test_ctx() -> AppContext {
        AppContext {
            store: Arc::new(MemoryStore::new()),
            registry: GameRegistry::with_defaults(),
            auth: AuthConfig {
                secret: "test-secret-key-256-bits-long!!".into(),
                token_ttl_secs: 3600,
            },
        }
    }

    fn logged_in(ctx: &AppContext) -> ConnState {
        let mut conn = ConnState::default();
        let reply = process_message(
            ctx,
            &mut conn,
            ClientMessage::Register {
                username: "alice".into(),
                password: "hunter2".into(),
            },
        );
        assert!(matches!(reply, ServerMessage::AuthResult { success: true, .. }));

        let reply = process_message(
            ctx,
            &mut conn,
            ClientMessage::Login {
                username: "alice".into(),
                password: "hunter2".into(),
            },
        );
        assert!(matches!(reply, ServerMessage::AuthResult { success: true, .. }));
        conn
    }

    fn create_game(ctx: &AppContext, conn: &mut ConnState, bet: &str) -> ServerMessage {
        process_message(
            ctx,
            conn,
            ClientMessage::CreateGame {
                game: "optimal-stopping".into(),
                bet: bet.into(),
            },
        )
    }

    fn play(ctx: &AppContext, conn: &mut ConnState, action: &str) -> ServerMessage {
        process_message(
            ctx,
            conn,
            ClientMessage::Play {
                game: "optimal-stopping".into(),
                action: action.into(),
            },
        )
    }

    fn balance(ctx: &AppContext, conn: &mut ConnState) -> i64 {
        match process_message(ctx, conn, ClientMessage::Balance) {
            ServerMessage::Balance { balance } => balance,
            other => panic!("expected balance, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let ctx = test_ctx();
        let mut conn = ConnState::default();
        let register = ClientMessage::Register {
            username: "alice".into(),
            password: "pw".into(),
        };

        let first = process_message(&ctx, &mut conn, register.clone());
        assert!(matches!(first, ServerMessage::AuthResult { success: true, .. }));

        let second = process_message(&ctx, &mut conn, register);
        match second {
            ServerMessage::AuthResult { success, message, .. } => {
                assert!(!success);
                assert_eq!(message, "Account with this username already exists.");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_login_wrong_password_is_generic() {
        let ctx = test_ctx();
        let mut conn = ConnState::default();
        process_message(
            &ctx,
            &mut conn,
            ClientMessage::Register {
                username: "alice".into(),
                password: "pw".into(),
            },
        );

        for (user, pass) in [("alice", "wrong"), ("nobody", "pw")] {
            let reply = process_message(
                &ctx,
                &mut conn,
                ClientMessage::Login {
                    username: user.into(),
                    password: pass.into(),
                },
            );
            match reply {
                ServerMessage::AuthResult { success, message, .. } => {
                    assert!(!success);
                    assert_eq!(message, "Invalid username or password.");
                }
                other => panic!("unexpected reply: {:?}", other),
            }
        }
        assert!(conn.user_id.is_none());
    }

    #[test]
    fn test_resume_roundtrip() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        let token = match process_message(
            &ctx,
            &mut conn,
            ClientMessage::Login {
                username: "alice".into(),
                password: "hunter2".into(),
            },
        ) {
            ServerMessage::AuthResult { token: Some(t), .. } => t,
            other => panic!("unexpected reply: {:?}", other),
        };

        // A fresh connection resumes with the token alone
        let mut fresh = ConnState::default();
        let reply = process_message(&ctx, &mut fresh, ClientMessage::Resume { token });
        assert!(matches!(reply, ServerMessage::AuthResult { success: true, .. }));
        assert_eq!(fresh.user_id, conn.user_id);

        // Garbage token is rejected
        let mut other = ConnState::default();
        let reply = process_message(
            &ctx,
            &mut other,
            ClientMessage::Resume { token: "junk".into() },
        );
        assert!(matches!(
            reply,
            ServerMessage::Error { code: ErrorCode::InvalidToken, .. }
        ));
    }

    #[test]
    fn test_unauthenticated_requests_rejected() {
        let ctx = test_ctx();
        let mut conn = ConnState::default();

        for msg in [
            ClientMessage::CreateGame {
                game: "optimal-stopping".into(),
                bet: "100".into(),
            },
            ClientMessage::Play {
                game: "optimal-stopping".into(),
                action: "next".into(),
            },
            ClientMessage::Statistics,
            ClientMessage::Balance,
        ] {
            let reply = process_message(&ctx, &mut conn, msg);
            assert!(matches!(
                reply,
                ServerMessage::Error { code: ErrorCode::NotAuthenticated, .. }
            ));
        }
    }

    #[test]
    fn test_invalid_bets_rejected() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        for bet in ["abc", "", "-5", "0", "1.5"] {
            match create_game(&ctx, &mut conn, bet) {
                ServerMessage::Notice { message } => assert_eq!(message, "Invalid bet."),
                other => panic!("bet {:?}: unexpected reply {:?}", bet, other),
            }
        }
        // No game opened, nothing debited
        assert_eq!(balance(&ctx, &mut conn), 1000);
    }

    #[test]
    fn test_bet_over_balance_rejected() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        match create_game(&ctx, &mut conn, "1001") {
            ServerMessage::Notice { message } => {
                assert_eq!(message, "You don't have enough money.")
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(balance(&ctx, &mut conn), 1000);
    }

    #[test]
    fn test_unknown_game_name() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        match create_game(&ctx, &mut conn, "100") {
            ServerMessage::GameView { .. } => {}
            other => panic!("unexpected reply: {:?}", other),
        }
        let reply = process_message(
            &ctx,
            &mut conn,
            ClientMessage::Play {
                game: "blackjack".into(),
                action: "next".into(),
            },
        );
        match reply {
            ServerMessage::Notice { message } => assert_eq!(message, "Invalid game name."),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_create_debits_and_publishes_commitment() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        let view = match create_game(&ctx, &mut conn, "100") {
            ServerMessage::GameView { active, view, .. } => {
                assert!(active);
                view
            }
            other => panic!("unexpected reply: {:?}", other),
        };

        assert_eq!(balance(&ctx, &mut conn), 900);
        assert_eq!(view["position"], 0);
        assert_eq!(view["hashed_setup"].as_str().unwrap().len(), 64);
        // Secret stays hidden while the game is open
        assert!(view.get("seed").is_none());
        assert!(view.get("numbers").is_none());
    }

    #[test]
    fn test_create_is_idempotent_while_open() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        let first = match create_game(&ctx, &mut conn, "100") {
            ServerMessage::GameView { view, .. } => view,
            other => panic!("unexpected reply: {:?}", other),
        };
        // Second create returns the same game, no second debit
        let second = match create_game(&ctx, &mut conn, "500") {
            ServerMessage::GameView { view, .. } => view,
            other => panic!("unexpected reply: {:?}", other),
        };
        assert_eq!(first["hashed_setup"], second["hashed_setup"]);
        assert_eq!(balance(&ctx, &mut conn), 900);
    }

    #[test]
    fn test_play_scenario_to_resolution() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);
        create_game(&ctx, &mut conn, "100");
        assert_eq!(balance(&ctx, &mut conn), 900);

        // init is a no-op view refresh
        match play(&ctx, &mut conn, "init") {
            ServerMessage::GameView { view, .. } => assert_eq!(view["position"], 0),
            other => panic!("unexpected reply: {:?}", other),
        }

        // Unknown actions leave state unchanged
        match play(&ctx, &mut conn, "teleport") {
            ServerMessage::GameView { view, .. } => assert_eq!(view["position"], 0),
            other => panic!("unexpected reply: {:?}", other),
        }

        // Five in-bounds nexts advance one position each
        for expected in 1..=5u64 {
            match play(&ctx, &mut conn, "next") {
                ServerMessage::GameView { view, .. } => {
                    assert_eq!(view["position"].as_u64().unwrap(), expected);
                    assert_eq!(
                        view["revealed_numbers"].as_array().unwrap().len() as u64,
                        expected + 1
                    );
                }
                other => panic!("unexpected reply: {:?}", other),
            }
        }

        // Stop resolves: message and balance must agree with the result
        let (message, view) = match play(&ctx, &mut conn, "stop") {
            ServerMessage::GameOver { message, view, .. } => (message, view),
            other => panic!("unexpected reply: {:?}", other),
        };
        let win = view["win"].as_bool().unwrap();
        if win {
            assert_eq!(message, "You win.");
            assert_eq!(balance(&ctx, &mut conn), 1100);
        } else {
            assert_eq!(message, "You lose.");
            assert_eq!(balance(&ctx, &mut conn), 900);
        }

        // Game is closed now
        match play(&ctx, &mut conn, "next") {
            ServerMessage::Notice { message } => assert_eq!(message, "No active game."),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_next_beyond_bound_is_noop() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);
        create_game(&ctx, &mut conn, "100");

        for _ in 0..9 {
            play(&ctx, &mut conn, "next");
        }
        // At the final position; further nexts stay put
        for _ in 0..3 {
            match play(&ctx, &mut conn, "next") {
                ServerMessage::GameView { view, .. } => {
                    assert_eq!(view["position"], 9);
                }
                other => panic!("unexpected reply: {:?}", other),
            }
        }
    }

    #[test]
    fn test_statistics_support_independent_verification() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        create_game(&ctx, &mut conn, "100");
        let commitment = match play(&ctx, &mut conn, "init") {
            ServerMessage::GameView { view, .. } => {
                view["hashed_setup"].as_str().unwrap().to_string()
            }
            other => panic!("unexpected reply: {:?}", other),
        };
        play(&ctx, &mut conn, "stop");

        let data = match process_message(&ctx, &mut conn, ClientMessage::Statistics) {
            ServerMessage::Statistics { data } => data,
            other => panic!("unexpected reply: {:?}", other),
        };
        let records = &data["optimal-stopping"];
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record["bet"], 100);
        assert!(record["win"].is_boolean());

        // The published commitment survived unchanged, and the reveal checks out
        assert_eq!(record["hashed_setup"].as_str().unwrap(), commitment);
        let reveal = SetupReveal {
            seed: record["seed"].as_u64().unwrap(),
            std: record["std"].as_i64().unwrap(),
            mean: record["mean"].as_i64().unwrap(),
            numbers_count: record["numbers_count"].as_u64().unwrap() as u32,
            salt: record["salt"].as_str().unwrap().to_string(),
            numbers: record["numbers"]
                .as_array()
                .unwrap()
                .iter()
                .map(|n| n.as_i64().unwrap())
                .collect(),
        };
        assert!(verify_reveal(&commitment, &reveal).is_ok());
    }

    #[test]
    fn test_logout_clears_session() {
        let ctx = test_ctx();
        let mut conn = logged_in(&ctx);

        let reply = process_message(&ctx, &mut conn, ClientMessage::Logout);
        match reply {
            ServerMessage::Notice { message } => assert_eq!(message, "You have been logged out."),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert!(conn.user_id.is_none());

        let reply = process_message(&ctx, &mut conn, ClientMessage::Balance);
        assert!(matches!(
            reply,
            ServerMessage::Error { code: ErrorCode::NotAuthenticated, .. }
        ));
    }

    #[test]
    fn test_ping_pong() {
        let ctx = test_ctx();
        let mut conn = ConnState::default();
        match process_message(&ctx, &mut conn, ClientMessage::Ping { timestamp: 42 }) {
            ServerMessage::Pong { timestamp, server_time } => {
                assert_eq!(timestamp, 42);
                assert!(server_time > 0);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
