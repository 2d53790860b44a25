//! Round initialization: answer tokenization and randomized token layout

use glam::Vec2;
use rand::Rng;

use super::state::{GameState, Token};
use crate::consts::*;
use crate::quiz::Question;

fn meaningful_words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .filter(|w| w.chars().count() > MIN_WORD_LEN)
}

/// Split a question's options into correct words and decoy words.
///
/// Correct words come from the correct option, deduplicated so each spawns
/// exactly once. Decoys come from the other options, capped at
/// `max(MAX_TOKENS - correct_count, MIN_DECOYS)`; a decoy that matches a
/// correct word is dropped so correctness stays a property of the token.
pub fn tokenize_options(question: &Question) -> (Vec<String>, Vec<String>) {
    let mut correct: Vec<String> = Vec::new();
    for word in meaningful_words(question.correct_option()) {
        if !correct.iter().any(|w| w == word) {
            correct.push(word.to_string());
        }
    }

    let cap = MAX_TOKENS.saturating_sub(correct.len()).max(MIN_DECOYS);
    let decoys: Vec<String> = question
        .options
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != question.correct)
        .flat_map(|(_, option)| meaningful_words(option))
        .filter(|w| !correct.iter().any(|c| c == w))
        .take(cap)
        .map(str::to_string)
        .collect();

    (correct, decoys)
}

/// Maximum score achievable in a round with `correct_count` correct tokens,
/// entering with the given streak: each hit pays `base + streak * bonus` and
/// grows the streak by one.
pub fn round_max_score(correct_count: u32, entering_streak: u32) -> u32 {
    let c = correct_count;
    c * HIT_BASE_SCORE + STREAK_BONUS * (c * entering_streak + c.saturating_sub(1) * c / 2)
}

/// Build the token set for the active question. Layout is drawn from the
/// round's seeded generator so it is reproducible.
pub(crate) fn spawn_tokens(state: &mut GameState) {
    let (correct, decoys) = tokenize_options(state.question());
    let mut rng = state.rng_state.round_rng(state.question_index);

    let words = correct
        .into_iter()
        .map(|w| (w, true))
        .chain(decoys.into_iter().map(|w| (w, false)));

    for (index, (text, is_correct)) in words.enumerate() {
        let jitter = rng.random_range(-SPAWN_JITTER..SPAWN_JITTER);
        let x = SPAWN_X_MIN + rng.random_range(0.0..SPAWN_X_SPAN) + jitter;
        // Staggered by index so tokens do not all appear at once
        let y = SPAWN_Y_BASE
            - rng.random_range(0.0..SPAWN_Y_RANGE)
            - index as f32 * SPAWN_STAGGER;
        let speed = FALL_SPEED_MIN + rng.random_range(0.0..FALL_SPEED_RANGE);
        let rotation = rng.random_range(0.0..360.0);
        let size = (text.chars().count() as f32 * TOKEN_SIZE_PER_CHAR)
            .clamp(TOKEN_SIZE_MIN, TOKEN_SIZE_MAX);

        let id = state.next_token_id();
        state.tokens.push(Token {
            id,
            text,
            is_correct,
            pos: Vec2::new(x, y),
            speed,
            destroyed: false,
            hit: false,
            opacity: 0.0,
            rotation,
            size,
        });
    }
}
