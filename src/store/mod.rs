//! Persistence & Ledger
//!
//! Durable records for users and games, plus the account ledger. Debits
//! and credits are executed inside the same atomic unit as the game-state
//! transition they belong to, so a crash can never leave the balance and
//! the game record disagreeing.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use uuid::Uuid;

use crate::game::{GameRecord, PlayOutcome};

pub use memory::MemoryStore;

/// Balance granted to every freshly registered user.
pub const STARTING_BALANCE: i64 = 1000;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique username.
    pub username: String,
    /// Salted password hash (see `network::auth`).
    pub password_hash: String,
    /// Current wallet balance.
    pub balance: i64,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Store and ledger errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Username is already taken.
    #[error("account with this username already exists")]
    DuplicateUsername,

    /// No such user.
    #[error("unknown user")]
    UnknownUser,

    /// Debit larger than the current balance.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// User already has an open game of this variant.
    #[error("an open game of this variant already exists")]
    ActiveGameExists,

    /// No open game to act on.
    #[error("game not found")]
    GameNotFound,
}

/// Persistence and ledger operations.
///
/// Every method is one atomic unit of work: read, validate, mutate,
/// commit. Implementations must serialize concurrent operations touching
/// the same user so that two `next` actions can never double-increment a
/// cursor and a `stop` can never race a `next`.
pub trait Store: Send + Sync {
    /// Register a user with the starting balance.
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    /// Look up a user by username.
    fn user_by_name(&self, username: &str) -> Option<UserRecord>;

    /// Look up a user by id.
    fn user_by_id(&self, id: Uuid) -> Option<UserRecord>;

    /// Current balance for a user.
    fn balance(&self, user_id: Uuid) -> Result<i64, StoreError>;

    /// Remove `amount` from a user's balance. Fails without mutation if
    /// the balance is too low.
    fn debit(&self, user_id: Uuid, amount: i64) -> Result<i64, StoreError>;

    /// Add `amount` to a user's balance.
    fn credit(&self, user_id: Uuid, amount: i64) -> Result<i64, StoreError>;

    /// Persist a freshly created open game, debiting its bet in the same
    /// unit. Fails without side effects if the user already has an open
    /// game of the same kind or cannot cover the bet.
    fn create_game(&self, record: GameRecord) -> Result<GameRecord, StoreError>;

    /// The user's open (non-terminal) game of the given kind, if any.
    fn open_game(&self, user_id: Uuid, kind: &str) -> Option<GameRecord>;

    /// Apply one play action to the user's open game, atomically.
    ///
    /// The closure mutates the record and reports the outcome; the store
    /// persists the result and, when the outcome is a winning resolution,
    /// credits `2 x bet` in the same unit (stake plus equal winnings).
    fn transact_open_game(
        &self,
        user_id: Uuid,
        kind: &str,
        play: &mut dyn FnMut(&mut GameRecord) -> PlayOutcome,
    ) -> Result<(GameRecord, PlayOutcome), StoreError>;

    /// All resolved games of the given kind for a user, oldest first.
    fn resolved_games(&self, user_id: Uuid, kind: &str) -> Vec<GameRecord>;
}
