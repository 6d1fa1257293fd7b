//! Deterministic Sequence Derivation
//!
//! The full number sequence of a game is a pure function of
//! (seed, mean, std, count). It is never persisted: every access
//! re-derives it from the stored parameters, which is exactly what makes
//! post-game verification possible.

use crate::core::rng::DeterministicRng;

/// Derive the full number sequence for a game.
///
/// Numbers are approximately normally distributed around `mean` with
/// standard deviation `std`. Same inputs always produce the same output.
pub fn derive_sequence(seed: u64, mean: i64, std: i64, count: u32) -> Vec<i64> {
    let mut rng = DeterministicRng::new(seed);
    (0..count).map(|_| rng.next_gaussian(mean, std)).collect()
}

// =============================================================================
// TESTS
// =============================================================================
