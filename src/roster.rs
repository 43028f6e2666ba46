//! Participant identity and roster management
//!
//! This module tracks the players joined to one session: their stable
//! connection ids, display names, cumulative scores, and the per-question
//! answer ledger. The roster preserves join order, which is the stable
//! tie-break when two answers carry the same timestamp.

use std::{fmt::Display, str::FromStr};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;
use web_time::SystemTime;

/// A unique identifier for a participant connection
///
/// Stable for the lifetime of one connection; a participant that
/// disconnects and returns gets a fresh id.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random participant id (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    /// Formats the id as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an id from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Errors that can occur when managing the roster
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The session has reached the maximum number of allowed players
    #[error("maximum number of players reached")]
    MaximumPlayers,
    /// The display name exceeds the allowed length
    #[error("display name too long")]
    NameTooLong,
    /// The id is already present in this roster
    #[error("participant already joined")]
    AlreadyJoined,
}

/// One player's state within a session
///
/// `pending_answer` and `answered_at` are cleared at every question
/// open and populated at most once per question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// The display name the player joined with
    pub name: String,
    /// Cumulative score, never decremented
    pub score: u64,
    /// The answer submitted for the currently open question, if any
    pub pending_answer: Option<String>,
    /// When the pending answer was submitted
    pub answered_at: Option<SystemTime>,
}

impl Participant {
    fn new(name: String) -> Self {
        Self {
            name,
            score: 0,
            pending_answer: None,
            answered_at: None,
        }
    }
}

/// The serializable roster projection broadcast to the room
///
/// Pending answers are deliberately absent; only identity and score
/// leave the engine.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerInfo {
    /// The participant's connection id
    pub id: Id,
    /// The participant's display name
    pub name: String,
    /// The participant's cumulative score
    pub score: u64,
}

/// The set of players joined to one session, in join order
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Roster {
    players: IndexMap<Id, Participant>,
}

impl Roster {
    /// Adds a player to the roster
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaximumPlayers`] when the session is full,
    /// [`Error::NameTooLong`] for an oversized display name, and
    /// [`Error::AlreadyJoined`] for a duplicate id.
    pub fn add(&mut self, id: Id, name: String) -> Result<(), Error> {
        if self.players.len() >= crate::constants::session::MAX_PLAYER_COUNT {
            return Err(Error::MaximumPlayers);
        }
        if name.chars().count() > crate::constants::session::MAX_NAME_LENGTH {
            return Err(Error::NameTooLong);
        }
        if self.players.contains_key(&id) {
            return Err(Error::AlreadyJoined);
        }
        self.players.insert(id, Participant::new(name));
        Ok(())
    }

    /// Removes a player, returning their state if they were present
    ///
    /// Uses a shifting removal so the join order of the remaining
    /// players is preserved.
    pub fn remove(&mut self, id: Id) -> Option<Participant> {
        self.players.shift_remove(&id)
    }

    /// Checks whether an id is in the roster
    pub fn contains(&self, id: Id) -> bool {
        self.players.contains_key(&id)
    }

    /// Returns the number of joined players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Checks whether the roster is empty
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Returns the player ids in join order
    pub fn ids(&self) -> Vec<Id> {
        self.players.keys().copied().collect()
    }

    /// Looks up a player's state
    pub fn get(&self, id: Id) -> Option<&Participant> {
        self.players.get(&id)
    }

    /// Builds the broadcastable roster projection, in join order
    pub fn infos(&self) -> Vec<PlayerInfo> {
        self.players
            .iter()
            .map(|(id, p)| PlayerInfo {
                id: *id,
                name: p.name.clone(),
                score: p.score,
            })
            .collect()
    }

    /// Records a player's answer for the open question
    ///
    /// Returns `false` without mutating anything if the player is
    /// unknown or already answered this question; re-submission is an
    /// idempotent no-op, not an error, since network retries can
    /// legitimately deliver the same answer twice.
    pub fn record_answer(&mut self, id: Id, answer: String, at: SystemTime) -> bool {
        match self.players.get_mut(&id) {
            Some(p) if p.pending_answer.is_none() => {
                p.pending_answer = Some(answer);
                p.answered_at = Some(at);
                true
            }
            _ => false,
        }
    }

    /// Checks whether every current player has answered
    ///
    /// Vacuously true for an empty roster; the close decision is still
    /// only ever triggered by a submission or the countdown, so an
    /// empty lobby cannot close a question by itself.
    pub fn all_answered(&self) -> bool {
        self.players.values().all(|p| p.pending_answer.is_some())
    }

    /// Clears every player's answer ledger for a fresh question
    pub fn reset_answers(&mut self) {
        for p in self.players.values_mut() {
            p.pending_answer = None;
            p.answered_at = None;
        }
    }

    /// Orders players by ascending answer time for scoring
    ///
    /// Players who never answered are ranked as if they answered at
    /// `fallback` (the close instant), placing them last. The sort is
    /// stable, so ties fall back to join order.
    pub fn ranked(&self, fallback: SystemTime) -> Vec<(Id, SystemTime)> {
        self.players
            .iter()
            .map(|(id, p)| (*id, p.answered_at.unwrap_or(fallback)))
            .sorted_by_key(|(_, at)| *at)
            .collect_vec()
    }

    /// Applies a scoring outcome to one player
    pub fn apply_points(&mut self, id: Id, points: u64) {
        if let Some(p) = self.players.get_mut(&id) {
            p.score += points;
        }
    }

    /// Clears pending answers after scoring, keeping timestamps intact
    pub fn clear_pending_answers(&mut self) {
        for p in self.players.values_mut() {
            p.pending_answer = None;
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use web_time::Duration;

    #[test]
    fn test_add_and_contains() {
        let mut roster = Roster::default();
        let id = Id::new();
        roster.add(id, "Ada".to_string()).unwrap();
        assert!(roster.contains(id));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(id).unwrap().score, 0);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut roster = Roster::default();
        let id = Id::new();
        roster.add(id, "Ada".to_string()).unwrap();
        assert_eq!(
            roster.add(id, "Ada again".to_string()),
            Err(Error::AlreadyJoined)
        );
        assert_eq!(roster.get(id).unwrap().name, "Ada");
    }

    #[test]
    fn test_add_oversized_name_rejected() {
        let mut roster = Roster::default();
        let name = "x".repeat(crate::constants::session::MAX_NAME_LENGTH + 1);
        assert_eq!(roster.add(Id::new(), name), Err(Error::NameTooLong));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut roster = Roster::default();
        roster.add(Id::new(), "Ada".to_string()).unwrap();
        assert!(roster.remove(Id::new()).is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_infos_preserve_join_order() {
        let mut roster = Roster::default();
        let a = Id::new();
        let b = Id::new();
        let c = Id::new();
        roster.add(a, "A".to_string()).unwrap();
        roster.add(b, "B".to_string()).unwrap();
        roster.add(c, "C".to_string()).unwrap();
        roster.remove(b);

        let names: Vec<_> = roster.infos().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn test_record_answer_idempotent() {
        let mut roster = Roster::default();
        let id = Id::new();
        roster.add(id, "Ada".to_string()).unwrap();

        let first = SystemTime::now();
        assert!(roster.record_answer(id, "Paris".to_string(), first));
        assert!(!roster.record_answer(id, "Lyon".to_string(), first + Duration::from_secs(1)));

        let p = roster.get(id).unwrap();
        assert_eq!(p.pending_answer.as_deref(), Some("Paris"));
        assert_eq!(p.answered_at, Some(first));
    }

    #[test]
    fn test_record_answer_unknown_player() {
        let mut roster = Roster::default();
        assert!(!roster.record_answer(Id::new(), "x".to_string(), SystemTime::now()));
    }

    #[test]
    fn test_all_answered() {
        let mut roster = Roster::default();
        let a = Id::new();
        let b = Id::new();
        roster.add(a, "A".to_string()).unwrap();
        roster.add(b, "B".to_string()).unwrap();
        assert!(!roster.all_answered());

        roster.record_answer(a, "x".to_string(), SystemTime::now());
        assert!(!roster.all_answered());

        roster.record_answer(b, "y".to_string(), SystemTime::now());
        assert!(roster.all_answered());
    }

    #[test]
    fn test_reset_answers() {
        let mut roster = Roster::default();
        let id = Id::new();
        roster.add(id, "Ada".to_string()).unwrap();
        roster.record_answer(id, "x".to_string(), SystemTime::now());

        roster.reset_answers();
        let p = roster.get(id).unwrap();
        assert!(p.pending_answer.is_none());
        assert!(p.answered_at.is_none());
    }

    #[test]
    fn test_ranked_orders_by_time_with_fallback_last() {
        let mut roster = Roster::default();
        let fast = Id::new();
        let slow = Id::new();
        let silent = Id::new();
        roster.add(slow, "Slow".to_string()).unwrap();
        roster.add(fast, "Fast".to_string()).unwrap();
        roster.add(silent, "Silent".to_string()).unwrap();

        let start = SystemTime::now();
        roster.record_answer(slow, "x".to_string(), start + Duration::from_millis(3000));
        roster.record_answer(fast, "y".to_string(), start + Duration::from_millis(1000));

        let ranked = roster.ranked(start + Duration::from_millis(10_000));
        let order: Vec<_> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, [fast, slow, silent]);
    }

    #[test]
    fn test_ranked_tie_breaks_by_join_order() {
        let mut roster = Roster::default();
        let first = Id::new();
        let second = Id::new();
        roster.add(first, "First".to_string()).unwrap();
        roster.add(second, "Second".to_string()).unwrap();

        let at = SystemTime::now();
        roster.record_answer(first, "x".to_string(), at);
        roster.record_answer(second, "y".to_string(), at);

        let ranked = roster.ranked(at);
        let order: Vec<_> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, [first, second]);
    }

    #[test]
    fn test_apply_points_accumulates() {
        let mut roster = Roster::default();
        let id = Id::new();
        roster.add(id, "Ada".to_string()).unwrap();
        roster.apply_points(id, 100);
        roster.apply_points(id, 50);
        assert_eq!(roster.get(id).unwrap().score, 150);
    }

    #[test]
    fn test_id_roundtrip() {
        let id = Id::new();
        let parsed = Id::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
