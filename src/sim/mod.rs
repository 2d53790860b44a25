//! Deterministic round engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one step per display frame)
//! - Seeded RNG only
//! - Stable iteration order (by token id)
//! - No rendering or platform dependencies

pub mod spawn;
pub mod state;
pub mod tick;

pub use spawn::{round_max_score, tokenize_options};
pub use state::{
    ContentError, GamePhase, GameState, Particle, ParticleColor, Rank, RoundEvent, RoundSummary,
    Token,
};
pub use tick::{abort_round, advance, hit_token, next_question, reset, start_round};
