//! Stone Breaker - a falling-word quiz arcade for debate training
//!
//! Core modules:
//! - `quiz`: Question bank model, answer scoring, grade tiers
//! - `sim`: Deterministic round engine (token spawning, per-frame update, hits)
//! - `assistant`: Debate-mentor completion client with retry/backoff
//! - `chatlog`: Mentor conversation history persisted to LocalStorage
//! - `settings`: Sound/visual preferences

pub mod assistant;
pub mod chatlog;
pub mod content;
pub mod quiz;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod audio;

pub use chatlog::ChatLog;
pub use quiz::{GradeScale, Question, Tier};
pub use settings::Settings;

/// Game tuning constants
pub mod consts {
    /// Host display refresh the simulation is tuned against (frames per second)
    pub const FRAME_RATE: f32 = 60.0;
    /// Fixed simulation timestep in seconds (one display frame)
    pub const SIM_DT: f32 = 1.0 / FRAME_RATE;
    /// Maximum catch-up frames per host callback to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield bottom bound, percent-of-viewport coordinates
    pub const BOTTOM_BOUND: f32 = 100.0;

    /// Token spawn layout
    pub const SPAWN_X_MIN: f32 = 15.0;
    pub const SPAWN_X_SPAN: f32 = 70.0;
    /// Horizontal jitter applied on top of the base spawn column (+/-)
    pub const SPAWN_JITTER: f32 = 2.5;
    pub const SPAWN_Y_BASE: f32 = -10.0;
    pub const SPAWN_Y_RANGE: f32 = 30.0;
    /// Extra vertical offset per token index so tokens enter staggered
    pub const SPAWN_STAGGER: f32 = 10.0;

    /// Fall speed range, percent per frame (slow enough to stay readable)
    pub const FALL_SPEED_MIN: f32 = 0.08;
    pub const FALL_SPEED_RANGE: f32 = 0.15;

    /// Distance over which a token fades in while still above the fold
    pub const FADE_IN_DISTANCE: f32 = 30.0;
    /// Rotation increment per frame, degrees
    pub const ROTATION_RATE: f32 = 0.5;
    /// Sinusoidal horizontal drift (cosmetic wobble)
    pub const DRIFT_FREQ: f32 = 0.02;
    pub const DRIFT_AMP: f32 = 0.02;

    /// Token box sizing from word length
    pub const TOKEN_SIZE_PER_CHAR: f32 = 8.0;
    pub const TOKEN_SIZE_MIN: f32 = 40.0;
    pub const TOKEN_SIZE_MAX: f32 = 80.0;

    /// Words this short carry no meaning worth shooting at
    pub const MIN_WORD_LEN: usize = 2;
    /// Upper bound on tokens per round for readability
    pub const MAX_TOKENS: usize = 8;
    /// Decoy floor so even one-word answers get company
    pub const MIN_DECOYS: usize = 4;

    /// Scoring
    pub const HIT_BASE_SCORE: u32 = 100;
    pub const STREAK_BONUS: u32 = 50;

    /// Revealed-wrong token penalty behavior
    pub const WRONG_SPEED_FACTOR: f32 = 1.3;
    pub const WRONG_REVEAL_OPACITY: f32 = 0.8;

    /// Particle bursts
    pub const CORRECT_BURST: usize = 15;
    pub const WRONG_BURST: usize = 6;
    /// Particle lifetime in frames
    pub const PARTICLE_LIFE: u32 = 60;
    /// Downward acceleration on particle velocity, percent per second squared
    pub const PARTICLE_GRAVITY: f32 = 50.0;
    /// Hard cap on live particles
    pub const MAX_PARTICLES: usize = 256;
}
