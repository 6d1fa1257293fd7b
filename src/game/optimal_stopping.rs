//! Optimal-Stopping Game
//!
//! Numbers are revealed one at a time; the player decides when to stop.
//! They win iff the number they stopped on equals the maximum of the
//! entire sequence, not merely the revealed prefix. The full sequence is
//! re-derived from the stored setup on every access, never persisted.

use chrono::Utc;
use serde::{Serialize, Deserialize};
use serde_json::json;
use uuid::Uuid;

use crate::fair::commitment::commitment_hash;
use crate::fair::sequence::derive_sequence;
use crate::fair::setup::{generate_salt, generate_setup, SetupBounds};
use super::{GameRecord, GameVariant, PlayAction, PlayOutcome, VariantState};

/// Configuration for the optimal-stopping variant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OptimalStoppingConfig {
    /// Mean of the number distribution.
    pub mean: i64,
    /// Lower bound for the secret volatility.
    pub std_lower_bound: i64,
    /// Upper bound for the secret volatility.
    pub std_upper_bound: i64,
    /// How many numbers a game holds.
    pub numbers_count: u32,
    /// Lower bound for the secret seed.
    pub seed_lower_bound: u64,
    /// Upper bound for the secret seed.
    pub seed_upper_bound: u64,
}

impl Default for OptimalStoppingConfig {
    fn default() -> Self {
        Self {
            mean: 1000,
            std_lower_bound: 10,
            std_upper_bound: 100,
            numbers_count: 10,
            seed_lower_bound: 0,
            seed_upper_bound: u32::MAX as u64,
        }
    }
}

impl OptimalStoppingConfig {
    /// Bounds for secret setup generation.
    pub fn setup_bounds(&self) -> SetupBounds {
        SetupBounds {
            seed_min: self.seed_lower_bound,
            seed_max: self.seed_upper_bound,
            std_min: self.std_lower_bound,
            std_max: self.std_upper_bound,
        }
    }
}

/// Persisted state of one optimal-stopping game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimalStoppingState {
    /// Secret sequence seed.
    pub seed: u64,
    /// Secret volatility.
    pub std: i64,
    /// Distribution mean (public).
    pub mean: i64,
    /// Public lower volatility bound the secret std was drawn from.
    pub std_lower_bound: i64,
    /// Public upper volatility bound the secret std was drawn from.
    pub std_upper_bound: i64,
    /// Sequence length (public).
    pub numbers_count: u32,
    /// 0-based cursor into the sequence; only ever increases.
    pub position: u32,
}

impl OptimalStoppingState {
    /// Re-derive the full sequence from the stored setup.
    pub fn numbers(&self) -> Vec<i64> {
        derive_sequence(self.seed, self.mean, self.std, self.numbers_count)
    }

    /// The prefix of the sequence revealed so far (inclusive of the cursor).
    pub fn revealed_numbers(&self) -> Vec<i64> {
        let mut numbers = self.numbers();
        numbers.truncate(self.position as usize + 1);
        numbers
    }

    /// Canonical secret-setup string, the commitment preimage half.
    pub fn secret_setup(&self) -> String {
        format!("{}:{}", self.seed, self.std)
    }
}

/// The optimal-stopping variant handler.
#[derive(Clone, Debug, Default)]
pub struct OptimalStopping {
    config: OptimalStoppingConfig,
}

impl OptimalStopping {
    /// Variant with a custom configuration.
    pub fn with_config(config: OptimalStoppingConfig) -> Self {
        Self { config }
    }

    /// Win iff the number at `position` equals the maximum of the full
    /// sequence. Ties on the maximum value count as a win.
    fn win_condition(numbers: &[i64], position: u32) -> bool {
        let peak = numbers.iter().copied().max();
        peak.is_some() && Some(numbers[position as usize]) == peak
    }
}

impl GameVariant for OptimalStopping {
    fn name(&self) -> &'static str {
        "optimal-stopping"
    }

    fn new_round(&self, user_id: Uuid, bet: i64) -> GameRecord {
        let setup = generate_setup(&self.config.setup_bounds());
        let salt = generate_salt();
        let hashed_setup = commitment_hash(&setup.secret_string(), &salt);

        GameRecord {
            id: Uuid::new_v4(),
            user_id,
            kind: self.name().to_string(),
            bet,
            salt,
            hashed_setup,
            game_over: false,
            win: None,
            created_at: Utc::now(),
            state: VariantState::OptimalStopping(OptimalStoppingState {
                seed: setup.seed,
                std: setup.std,
                mean: self.config.mean,
                std_lower_bound: self.config.std_lower_bound,
                std_upper_bound: self.config.std_upper_bound,
                numbers_count: self.config.numbers_count,
                position: 0,
            }),
        }
    }

    fn play(&self, record: &mut GameRecord, action: PlayAction) -> PlayOutcome {
        let VariantState::OptimalStopping(state) = &mut record.state;

        match action {
            PlayAction::Init => PlayOutcome::Unchanged,
            PlayAction::Next => {
                // Bounded by this record's own count, not the live config.
                if state.position + 1 >= state.numbers_count {
                    return PlayOutcome::Unchanged;
                }
                state.position += 1;
                PlayOutcome::Advanced
            }
            PlayAction::Stop => {
                let win = Self::win_condition(&state.numbers(), state.position);
                record.win = Some(win);
                record.game_over = true;
                PlayOutcome::Resolved { win }
            }
        }
    }

    fn public_view(&self, record: &GameRecord) -> serde_json::Value {
        let VariantState::OptimalStopping(state) = &record.state;

        json!({
            "hashed_setup": record.hashed_setup,
            "revealed_numbers": state.revealed_numbers(),
            "position": state.position,
            "numbers_count": state.numbers_count,
            "mean": state.mean,
            "std_lower_bound": state.std_lower_bound,
            "std_upper_bound": state.std_upper_bound,
        })
    }

    fn audit_view(&self, record: &GameRecord) -> serde_json::Value {
        let VariantState::OptimalStopping(state) = &record.state;

        json!({
            "bet": record.bet,
            "win": record.win,
            "hashed_setup": record.hashed_setup,
            "salt": record.salt,
            "numbers": state.numbers(),
            "position": state.position,
            "numbers_count": state.numbers_count,
            "mean": state.mean,
            "std_lower_bound": state.std_lower_bound,
            "std_upper_bound": state.std_upper_bound,
            "seed": state.seed,
            "std": state.std,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
