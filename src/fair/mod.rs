//! Commitment Engine
//!
//! Provably-fair commit-reveal scheme for games of chance:
//! - `setup`: cryptographically-sourced secret parameters and salts
//! - `sequence`: deterministic derivation of the number sequence
//! - `commitment`: pre-game commitment hash and post-game verification
//!
//! The server commits to `SHA256("{secret_setup}:{salt}")` before any
//! number is revealed. After resolution the secret setup and salt are
//! published, so anyone can recompute both the hash and the full sequence
//! and confirm the server could not have changed the outcome mid-game.

pub mod setup;
pub mod sequence;
pub mod commitment;

// Re-export key types
pub use setup::{GameSetup, SetupBounds, generate_setup, generate_salt};
pub use sequence::derive_sequence;
pub use commitment::{commitment_hash, SetupReveal, CommitmentError, verify_reveal};
