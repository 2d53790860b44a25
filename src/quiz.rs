//! Question bank model and pure answer evaluation
//!
//! No mutable state lives here; every function is safe to call from any
//! round or component concurrently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One multiple-choice question. Immutable once loaded; the bank owns these
/// and hands out shared references only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the bank
    pub id: u32,
    pub prompt: String,
    /// At least two options
    pub options: Vec<String>,
    /// Index into `options`
    pub correct: usize,
    /// Shown after the question is answered
    pub explanation: String,
}

impl Question {
    /// The text of the correct option
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct]
    }
}

/// Selected option index keyed by question index
pub type AnswerSheet = HashMap<usize, usize>;

/// Count of answers matching the bank's answer key.
///
/// Unanswered questions count as incorrect; entries whose question index
/// falls outside the bank are ignored.
pub fn score(answers: &AnswerSheet, bank: &[Question]) -> usize {
    bank.iter()
        .enumerate()
        .filter(|(i, q)| answers.get(i) == Some(&q.correct))
        .count()
}

/// Percentage of `correct` out of `total`, in [0, 100]. Zero when `total`
/// is zero rather than dividing by it.
pub fn percentage(correct: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    100.0 * correct as f32 / total as f32
}

/// Named performance bracket for a percentage score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Excellent,
    Good,
    Fair,
    NeedsWork,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Excellent => "Excellent",
            Tier::Good => "Good",
            Tier::Fair => "Fair",
            Tier::NeedsWork => "Needs Work",
        }
    }
}

/// Tier boundaries. Excellent/Fair cutoffs are shared; the Good cutoff
/// differs between the basic quiz and the parliamentary module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeScale {
    pub good_cutoff: f32,
}

impl GradeScale {
    /// Basic quiz scale
    pub const QUIZ: GradeScale = GradeScale { good_cutoff: 80.0 };
    /// British Parliamentary module scale
    pub const PARLIAMENTARY: GradeScale = GradeScale { good_cutoff: 75.0 };

    pub const EXCELLENT_CUTOFF: f32 = 90.0;
    pub const FAIR_CUTOFF: f32 = 60.0;

    /// Map a percentage to its tier. Ties go to the higher tier.
    pub fn tier(&self, pct: f32) -> Tier {
        if pct >= Self::EXCELLENT_CUTOFF {
            Tier::Excellent
        } else if pct >= self.good_cutoff {
            Tier::Good
        } else if pct >= Self::FAIR_CUTOFF {
            Tier::Fair
        } else {
            Tier::NeedsWork
        }
    }
}
