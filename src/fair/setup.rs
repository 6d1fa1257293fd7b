//! Secret Setup Generation
//!
//! Secret game parameters come from the operating system CSPRNG, never
//! from the deterministic gameplay RNG. A predictable setup source would
//! let either party forecast outcomes, which breaks the fairness scheme.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Serialize, Deserialize};

/// Number of random bytes in a per-game salt (hex-encoded on the wire).
pub const SALT_BYTES: usize = 8;

/// Inclusive bounds for secret setup generation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SetupBounds {
    /// Minimum sequence seed.
    pub seed_min: u64,
    /// Maximum sequence seed.
    pub seed_max: u64,
    /// Minimum volatility (standard deviation).
    pub std_min: i64,
    /// Maximum volatility (standard deviation).
    pub std_max: i64,
}

/// Secret parameters that determine a game's number sequence.
///
/// Kept server-side until the game resolves; only the commitment hash
/// over these values is published up front.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Seed for the deterministic sequence RNG.
    pub seed: u64,
    /// Volatility of the generated numbers.
    pub std: i64,
}

impl GameSetup {
    /// Canonical secret-setup string, the preimage half of the commitment.
    pub fn secret_string(&self) -> String {
        format!("{}:{}", self.seed, self.std)
    }
}

/// Generate a fresh secret setup within the given bounds.
pub fn generate_setup(bounds: &SetupBounds) -> GameSetup {
    GameSetup {
        seed: OsRng.gen_range(bounds.seed_min..=bounds.seed_max),
        std: OsRng.gen_range(bounds.std_min..=bounds.std_max),
    }
}

/// Generate a per-game salt: `SALT_BYTES` random bytes, hex-encoded.
///
/// The salt is mixed into the commitment hash so identical setups in
/// different games still commit to different hashes.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// =============================================================================
// TESTS
// =============================================================================
