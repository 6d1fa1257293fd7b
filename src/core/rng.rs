//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for fast, high-quality, deterministic randomness.
//! Given the same seed, produces identical sequences on all platforms.
//! This generator drives gameplay sequences only; secret material (seeds,
//! salts) always comes from the OS CSPRNG in `fair::setup`.

use serde::{Serialize, Deserialize};

/// One in the Q32.32 fixed-point scale used by the gaussian sampler.
const GAUSS_ONE: i64 = 1 << 32;

/// Deterministic PRNG using the Xorshift128+ algorithm.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG produces the exact same sequence of
/// values on any platform. Resolved games are re-derived from their
/// stored seed, so this sequence must never change between releases.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random u32.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Sample an approximately normal integer with the given mean and
    /// standard deviation.
    ///
    /// Uses the Irwin-Hall construction: the sum of 12 uniform samples on
    /// [0, 1) has mean 6 and variance 1, so centering it yields a standard
    /// normal approximation. All arithmetic is integer (Q32.32), keeping
    /// the output bit-identical across platforms.
    pub fn next_gaussian(&mut self, mean: i64, std: i64) -> i64 {
        let mut sum: i64 = 0;
        for _ in 0..12 {
            // Uniform in [0, 2^32), i.e. [0, 1) in Q32.32
            sum += (self.next_u64() >> 32) as i64;
        }
        let z = sum - 6 * GAUSS_ONE;
        mean + (((z as i128) * (std as i128)) >> 32) as i64
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================
