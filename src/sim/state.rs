//! Game state and core simulation types
//!
//! Everything a round mutates lives here; tokens and particles are ephemeral
//! and discarded at round end.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::Question;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Idle on the question card, awaiting an explicit launch
    Question,
    /// Active round: tokens falling, hits accepted
    Falling,
    /// Post-round summary, awaiting an explicit "next"
    Complete,
    /// All questions played; terminal until reset
    Final,
}

/// A falling answer-word token. `destroyed` and `hit` are mutually exclusive
/// terminal flags: `destroyed` removes a correct token, `hit` reveals a wrong
/// one (which stays on screen, faster and more dangerous).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Unique within the round
    pub id: u32,
    pub text: String,
    pub is_correct: bool,
    /// Percent-of-viewport coordinates; x in [0, 100], y unbounded
    /// (negative is above the visible area)
    pub pos: Vec2,
    /// Fall speed, percent per frame
    pub speed: f32,
    pub destroyed: bool,
    pub hit: bool,
    /// Fades in from 0 as the token enters the visible area
    pub opacity: f32,
    /// Degrees, cosmetic, monotonically increasing
    pub rotation: f32,
    /// Render box size derived from word length
    pub size: f32,
}

impl Token {
    /// A terminal token ignores further pointer hits
    pub fn is_terminal(&self) -> bool {
        self.destroyed || self.hit
    }
}

/// Burst particle color (the host maps these to its palette)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleColor {
    /// Correct hit celebration
    Green,
    /// Wrong hit warning
    Red,
}

/// A visual-effect particle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    /// Percent per second
    pub vel: Vec2,
    /// Frames remaining
    pub life: u32,
    pub max_life: u32,
    pub color: ParticleColor,
    pub size: f32,
}

/// Arcade performance rank derived from final accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    LogicMaster,
    TruthSeeker,
    FallacyHunter,
    StoneBreaker,
    Apprentice,
}

impl Rank {
    pub fn from_accuracy(accuracy: f32) -> Self {
        if accuracy >= 90.0 {
            Rank::LogicMaster
        } else if accuracy >= 80.0 {
            Rank::TruthSeeker
        } else if accuracy >= 70.0 {
            Rank::FallacyHunter
        } else if accuracy >= 60.0 {
            Rank::StoneBreaker
        } else {
            Rank::Apprentice
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Rank::LogicMaster => "Logic Master",
            Rank::TruthSeeker => "Truth Seeker",
            Rank::FallacyHunter => "Fallacy Hunter",
            Rank::StoneBreaker => "Stone Breaker",
            Rank::Apprentice => "Apprentice",
        }
    }
}

/// Engine-to-host notification, drained once per frame by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// A correct token was destroyed. Carries the streak before this hit
    /// incremented it (drives the ascending tone pitch).
    CorrectHit { streak: u32 },
    /// A wrong token was revealed
    WrongHit,
    /// The round reached `Complete`
    RoundComplete,
    /// The last round was advanced past; game is `Final`
    GameComplete,
}

/// Snapshot of round progress handed to the host on phase changes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoundSummary {
    pub question_index: usize,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub correct_hits: u32,
    pub missed: u32,
    pub phase: GamePhase,
}

/// Content errors detected before a round can start
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("question bank is empty")]
    EmptyBank,
}

/// RNG seed wrapper. The generator is rebuilt per round so each layout is
/// reproducible in isolation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generator for one round's layout
    pub fn round_rng(&self, round: usize) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed ^ (round as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// Counters captured when a round starts, restored if the round is aborted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub(crate) struct RoundBaseline {
    pub score: u32,
    pub streak: u32,
    pub correct_hits: u32,
    pub missed: u32,
    pub max_score: u32,
}

/// Complete game state (deterministic)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Immutable question bank, supplied whole at construction
    bank: Vec<Question>,
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng_state: RngState,
    /// 0-based, monotonic non-decreasing until reset
    pub question_index: usize,
    pub score: u32,
    /// Consecutive correct hits; resets to 0 on any wrong hit
    pub streak: u32,
    /// Non-decreasing within a session
    pub best_streak: u32,
    pub correct_hits: u32,
    /// Wrong tokens that reached the bottom unhandled
    pub missed: u32,
    pub phase: GamePhase,
    /// Achievable maximum score accumulated across started rounds
    pub max_score: u32,
    /// Simulation frame counter
    pub time_frames: u64,
    pub tokens: Vec<Token>,
    /// Visual particles (not gameplay-affecting)
    #[serde(skip)]
    pub particles: Vec<Particle>,
    /// Pending notifications for the host
    #[serde(skip)]
    pub events: Vec<RoundEvent>,
    pub(crate) baseline: RoundBaseline,
    next_id: u32,
}

impl GameState {
    /// Create a new game over the given bank. Fails on an empty bank -
    /// there is nothing to play and no partial round may exist.
    pub fn new(bank: Vec<Question>, seed: u64) -> Result<Self, ContentError> {
        if bank.is_empty() {
            return Err(ContentError::EmptyBank);
        }
        Ok(Self {
            bank,
            seed,
            rng_state: RngState::new(seed),
            question_index: 0,
            score: 0,
            streak: 0,
            best_streak: 0,
            correct_hits: 0,
            missed: 0,
            phase: GamePhase::Question,
            max_score: 0,
            time_frames: 0,
            tokens: Vec::new(),
            particles: Vec::new(),
            events: Vec::new(),
            baseline: RoundBaseline::default(),
            next_id: 1,
        })
    }

    pub fn bank(&self) -> &[Question] {
        &self.bank
    }

    pub fn question_count(&self) -> usize {
        self.bank.len()
    }

    /// The active question
    pub fn question(&self) -> &Question {
        &self.bank[self.question_index]
    }

    /// Allocate a token id
    pub(crate) fn next_token_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Take all pending host notifications
    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn summary(&self) -> RoundSummary {
        RoundSummary {
            question_index: self.question_index,
            score: self.score,
            streak: self.streak,
            best_streak: self.best_streak,
            correct_hits: self.correct_hits,
            missed: self.missed,
            phase: self.phase,
        }
    }

    /// Overall accuracy in [0, 100], normalized by the achievable maximum of
    /// the rounds actually started.
    pub fn accuracy(&self) -> f32 {
        if self.max_score == 0 {
            return 0.0;
        }
        (100.0 * self.score as f32 / self.max_score as f32).min(100.0)
    }

    pub fn rank(&self) -> Rank {
        Rank::from_accuracy(self.accuracy())
    }
}
