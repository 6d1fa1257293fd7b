//! Core deterministic primitives.
//!
//! Everything here is designed for perfect cross-platform determinism:
//! replaying a resolved game from its stored seed must reproduce the
//! exact sequence the player saw.

pub mod rng;

// Re-export core types
pub use rng::DeterministicRng;
