//! # Peakstop Game Server
//!
//! Provably-fair "optimal stopping" game service: accounts, a wallet
//! balance, and a commit-reveal scheme that lets every resolved game be
//! audited without trusting the server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PEAKSTOP SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Xorshift128+ PRNG, gaussian sampler       │
//! │                                                              │
//! │  fair/           - Commitment engine                         │
//! │  ├── setup.rs    - CSPRNG secret setup and salts             │
//! │  ├── sequence.rs - Deterministic sequence derivation         │
//! │  └── commitment.rs - Commit hash, reveal, verification       │
//! │                                                              │
//! │  game/           - Game state machines                       │
//! │  └── optimal_stopping.rs - The optimal-stopping variant      │
//! │                                                              │
//! │  store/          - Persistence and ledger (atomic units)     │
//! │  network/        - Auth, protocol, handlers, WS server       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantee
//!
//! Before the first number is revealed the server publishes
//! `SHA256("{seed}:{std}:{salt}")` and stores it immutably with the game.
//! The sequence is a pure function of the committed setup, re-derived on
//! every access and never persisted. After resolution the secret setup is
//! released, so either party can recompute both the hash and the sequence
//! and prove the outcome was fixed before play began.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod fair;
pub mod game;
pub mod store;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use fair::{commitment_hash, derive_sequence, verify_reveal, SetupReveal};
pub use game::{GameRecord, GameRegistry, GameVariant, PlayAction, PlayOutcome};
pub use store::{MemoryStore, Store, StoreError, UserRecord, STARTING_BALANCE};
pub use network::{AppContext, AuthConfig, GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
