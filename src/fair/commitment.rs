//! Game Commitment Protocol
//!
//! Commit to the secret setup before the first number is revealed.
//! Reveal and verify at game end to prevent manipulation: the published
//! hash binds the server to one sequence, and the revealed parameters let
//! anyone recompute both the hash and the sequence independently.

use sha2::{Sha256, Digest};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::fair::sequence::derive_sequence;

/// Compute the commitment hash over `"{secret_setup}:{salt}"`.
///
/// Returned as a lowercase hex string; this is the value published to the
/// player at game creation and stored immutably with the game record.
pub fn commitment_hash(secret_setup: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_setup.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Post-resolution reveal of a game's secret material.
///
/// Published once the game is over; everything needed to audit the game
/// without trusting the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetupReveal {
    /// Sequence seed.
    pub seed: u64,
    /// Volatility used for the sequence.
    pub std: i64,
    /// Distribution mean (public configuration, included for completeness).
    pub mean: i64,
    /// Number of values in the sequence.
    pub numbers_count: u32,
    /// Per-game salt.
    pub salt: String,
    /// The sequence the server claims was played.
    pub numbers: Vec<i64>,
}

/// Errors raised when a reveal does not match the published commitment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitmentError {
    /// Recomputed commitment hash differs from the published one.
    #[error("commitment hash mismatch: expected {expected}, got {got}")]
    HashMismatch {
        /// Hash published at game creation.
        expected: String,
        /// Hash recomputed from the reveal.
        got: String,
    },

    /// Sequence re-derived from the revealed setup differs from the claim.
    #[error("sequence mismatch: revealed numbers are not derived from the setup")]
    SequenceMismatch,
}

/// Verify a reveal against the commitment hash published at creation.
///
/// Checks both directions of the fairness guarantee:
/// 1. the revealed (seed, std, salt) hash to the pre-game commitment, and
/// 2. the claimed numbers are exactly what that setup derives.
pub fn verify_reveal(published_hash: &str, reveal: &SetupReveal) -> Result<(), CommitmentError> {
    let secret_setup = format!("{}:{}", reveal.seed, reveal.std);
    let recomputed = commitment_hash(&secret_setup, &reveal.salt);
    if recomputed != published_hash {
        return Err(CommitmentError::HashMismatch {
            expected: published_hash.to_string(),
            got: recomputed,
        });
    }

    let derived = derive_sequence(reveal.seed, reveal.mean, reveal.std, reveal.numbers_count);
    if derived != reveal.numbers {
        return Err(CommitmentError::SequenceMismatch);
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
