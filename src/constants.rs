//! Configuration constants for the quizroom engine
//!
//! This module contains the limits and tuning values used throughout
//! the session engine, grouped by the component they belong to.

/// Session-wide limits
pub mod session {
    /// Maximum number of players allowed in a single session
    pub const MAX_PLAYER_COUNT: usize = 1000;
    /// Maximum length of a player display name in characters
    pub const MAX_NAME_LENGTH: usize = 50;
}

/// Question bank limits
pub mod bank {
    /// Maximum number of questions in a single bank
    pub const MAX_QUESTION_COUNT: usize = 500;
    /// Maximum length of a question prompt in characters
    pub const MAX_PROMPT_LENGTH: usize = 400;
    /// Maximum length of a single answer option in characters
    pub const MAX_ANSWER_LENGTH: usize = 200;
    /// Maximum number of distractor options per question
    pub const MAX_DISTRACTOR_COUNT: usize = 8;
}

/// Per-question countdown configuration
pub mod timer {
    /// Number of ticks a question stays open before it expires
    pub const QUESTION_TICKS: u32 = 10;
    /// Seconds between consecutive countdown ticks
    pub const TICK_SECONDS: u64 = 1;
}

/// Scoring coefficients
///
/// Points for a correct answer are
/// `(SPEED_NUMERATOR / latency_ms) * SPEED_WEIGHT + (RANK_BASE - RANK_STEP * rank) + FLOOR_BONUS`,
/// clamped at zero and rounded.
pub mod scoring {
    /// Numerator of the speed term, divided by the answer latency in milliseconds
    pub const SPEED_NUMERATOR: f64 = 10_000.0;
    /// Multiplier applied to the speed term
    pub const SPEED_WEIGHT: f64 = 520.0;
    /// Base of the rank bonus, earned in full at rank 0
    pub const RANK_BASE: f64 = 321.0;
    /// Amount the rank bonus decays per rank position
    pub const RANK_STEP: f64 = 2.0;
    /// Constant bonus awarded to every correct answer
    pub const FLOOR_BONUS: f64 = 100.0;
    /// Lower clamp on answer latency in milliseconds, keeps the speed term finite
    pub const MIN_LATENCY_MS: f64 = 1.0;
}
