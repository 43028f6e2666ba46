//! # Quizroom Session Engine
//!
//! This library provides the core logic for live multiplayer trivia
//! sessions: the session registry and per-session state machine,
//! concurrent answer collection with rank-and-latency scoring, the
//! per-question countdown, and the broadcast contracts a gateway uses
//! to keep every connected host and player in sync. The engine is
//! sans-IO: transport, scheduling, and persistence are injected by the
//! embedding application through the [`tunnel::Tunnel`] trait and the
//! `schedule_message` callbacks.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod bank;
pub mod constants;
pub mod registry;
pub mod roster;
pub mod score;
pub mod session;
pub mod session_code;
pub mod timer;
pub mod tunnel;

/// Messages carrying the full current view for one participant
///
/// Sent to a single participant when they need the whole picture at
/// once, such as a late joiner syncing into a live question.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Session view synchronization
    Session(session::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages notifying participants of individual state changes
///
/// Update messages are broadcast to a session's room (or sent to one
/// requester, for errors and creation receipts) as the state machine
/// moves.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Registry-level updates: creation receipts and request errors
    Registry(registry::UpdateMessage),
    /// Session-level updates: roster, questions, views, countdown
    Session(session::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages the engine asks the embedder to redeliver after a delay
///
/// The engine never sleeps; countdown ticks are round-tripped through
/// the embedder's scheduler and fed back into
/// [`registry::Registry::receive_alarm`].
#[derive(Debug, Clone, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Session countdown tick alarms
    Session(session::AlarmMessage),
}
