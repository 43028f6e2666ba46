//! Scoring engine
//!
//! Pure computation of the points a participant earns when a question
//! closes. The score rewards both correctness and speed: a reciprocal
//! latency term dominates for fast answers and decays toward zero as
//! latency grows, a small rank bonus rewards answering earlier than
//! other participants, and a constant floor bonus tops up every correct
//! answer.

use web_time::Duration;

use crate::constants::scoring;

/// Computes the points awarded to one participant for one question
///
/// `rank` is the participant's 0-based position when all participants
/// are ordered by ascending answer time. Incorrect or missing answers
/// always score exactly zero regardless of timing. The result is
/// clamped at zero before rounding, so a very late correct answer at a
/// very high rank cannot subtract points.
pub fn award(correct: bool, latency: Duration, rank: usize) -> u64 {
    if !correct {
        return 0;
    }

    let latency_ms = (latency.as_millis() as f64).max(scoring::MIN_LATENCY_MS);
    let speed = (scoring::SPEED_NUMERATOR / latency_ms) * scoring::SPEED_WEIGHT;
    let rank_bonus = scoring::RANK_BASE - scoring::RANK_STEP * rank as f64;

    (speed + rank_bonus + scoring::FLOOR_BONUS).max(0.0).round() as u64
}
