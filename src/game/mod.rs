//! Game State Machines
//!
//! Per-variant game logic behind the `GameVariant` capability trait,
//! selected through a `GameRegistry` keyed by variant name. The record
//! types here are what the store persists; variant modules own the rules
//! for mutating them.
//!
//! Lifecycle: created (bet debited) -> in progress -> resolved (terminal).
//! `win` stays `None` until the resolving transition sets it together with
//! `game_over`.

pub mod optimal_stopping;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

pub use optimal_stopping::{OptimalStopping, OptimalStoppingConfig, OptimalStoppingState};

/// A player action within an open game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayAction {
    /// No-op; returns the current open view (idempotent first render).
    Init,
    /// Reveal the next number.
    Next,
    /// Stop at the current position and resolve the game.
    Stop,
}

impl PlayAction {
    /// Parse a wire action string. Unknown strings are rejected upstream
    /// as no-ops rather than errors.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "init" => Some(Self::Init),
            "next" => Some(Self::Next),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

/// Result of applying one action to an open game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// State unchanged: `init`, an out-of-range `next`, or a rejected action.
    Unchanged,
    /// The cursor advanced; game still open.
    Advanced,
    /// The game resolved with the given result.
    Resolved {
        /// Whether the player won.
        win: bool,
    },
}

/// Variant-specific portion of a game record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantState {
    /// Optimal-stopping sequence game.
    OptimalStopping(OptimalStoppingState),
}

/// A persisted game.
///
/// `hashed_setup` is computed once at creation and never recomputed into
/// the record; its stability over the game's lifetime is what the player
/// verifies against after the reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Unique game identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Variant name (registry key).
    pub kind: String,
    /// Amount debited at creation.
    pub bet: i64,
    /// Per-game salt (hex).
    pub salt: String,
    /// Commitment hash published at creation.
    pub hashed_setup: String,
    /// Whether the game has resolved.
    pub game_over: bool,
    /// Resolution result; `None` while the game is open.
    pub win: Option<bool>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Variant state.
    pub state: VariantState,
}

/// Capability interface implemented by each game variant.
///
/// Views are explicit serialization functions returning fixed structured
/// records: `public_view` hides the secret while the game is open,
/// `audit_view` exposes everything needed for independent verification
/// once it is resolved.
pub trait GameVariant: Send + Sync {
    /// Registry key and wire name of this variant.
    fn name(&self) -> &'static str;

    /// Create a new game record for `user_id` with the given bet.
    ///
    /// Generates the secret setup and salt, computes the commitment hash,
    /// and returns an open record at position zero. The caller persists it
    /// atomically with the bet debit.
    fn new_round(&self, user_id: Uuid, bet: i64) -> GameRecord;

    /// Apply one action to an open record.
    ///
    /// Rejected actions leave the record untouched and report
    /// [`PlayOutcome::Unchanged`]. A resolving action sets `win` and
    /// `game_over` on the record before returning.
    fn play(&self, record: &mut GameRecord, action: PlayAction) -> PlayOutcome;

    /// Secret-hiding view of an open game.
    fn public_view(&self, record: &GameRecord) -> serde_json::Value;

    /// Secret-revealing view of a resolved game.
    fn audit_view(&self, record: &GameRecord) -> serde_json::Value;
}

/// Registry mapping variant names to their handlers.
#[derive(Clone, Default)]
pub struct GameRegistry {
    variants: BTreeMap<&'static str, Arc<dyn GameVariant>>,
}

impl GameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in variants.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OptimalStopping::default()));
        registry
    }

    /// Register a variant under its name.
    pub fn register(&mut self, variant: Arc<dyn GameVariant>) {
        self.variants.insert(variant.name(), variant);
    }

    /// Look up a variant by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn GameVariant>> {
        self.variants.get(name).cloned()
    }

    /// Names of all registered variants, in stable order.
    pub fn names(&self) -> Vec<&'static str> {
        self.variants.keys().copied().collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
