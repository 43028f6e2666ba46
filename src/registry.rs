//! Session registry and event routing
//!
//! The registry owns every live session and every registered question
//! bank, and is the single inbound surface for the embedding gateway:
//! create, join, participant messages, tick alarms, and disconnects all
//! enter here and are routed to the addressed session. The registry is
//! an owned value the embedder injects into its handlers; the crate
//! keeps no ambient state.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use web_time::Duration;

use crate::{
    bank::QuestionBank,
    roster::{self, Id},
    session::{self, Session},
    session_code::SessionCode,
    tunnel::Tunnel,
};

/// Errors reported for registry-level requests
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The addressed session code maps to no live session
    #[error("session {0} not found")]
    SessionNotFound(SessionCode),
    /// The referenced question bank was never registered
    #[error("question bank {0:?} not found")]
    BankNotFound(String),
    /// Joining the addressed session failed
    #[error(transparent)]
    Roster(#[from] roster::Error),
}

/// Update messages the registry sends to individual requesters
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// A session was created; sent to the creator only
    SessionCreated(SessionCode),
    /// A request failed; sent to the requester only
    Error(Error),
}

/// The owned collection of live sessions and registered banks
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionCode, Session>,
    banks: HashMap<String, QuestionBank>,
}

fn send_to<T: Tunnel, F: Fn(Id) -> Option<T>>(
    message: &crate::UpdateMessage,
    id: Id,
    tunnel_finder: F,
) {
    if let Some(tunnel) = tunnel_finder(id) {
        tunnel.send_message(message);
    }
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Looks up a live session by its code
    pub fn session(&self, code: SessionCode) -> Option<&Session> {
        self.sessions.get(&code)
    }

    /// Deposits a validated question bank under a name
    ///
    /// Re-registering a name replaces the bank; sessions already playing
    /// the old bank keep their own copy and are unaffected.
    ///
    /// # Errors
    ///
    /// Returns the validation report if the bank violates its bounds
    /// (empty, oversized prompts or option lists).
    pub fn register_bank(&mut self, name: String, bank: QuestionBank) -> Result<(), garde::Report> {
        garde::Validate::validate(&bank)?;
        tracing::info!(bank = %name, questions = bank.len(), "bank registered");
        self.banks.insert(name, bank);
        Ok(())
    }

    /// Creates a session playing the named bank
    ///
    /// Allocates a code not held by any live session, retrying on
    /// collision. The creator becomes the session host and is told the
    /// code; on a missing bank reference nothing is created and the
    /// error goes to the creator only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BankNotFound`] if `bank_ref` names no
    /// registered bank.
    pub fn create_session<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        host_id: Id,
        bank_ref: &str,
        tunnel_finder: F,
    ) -> Result<SessionCode, Error> {
        let Some(bank) = self.banks.get(bank_ref) else {
            let error = Error::BankNotFound(bank_ref.to_string());
            send_to(
                &UpdateMessage::Error(error.clone()).into(),
                host_id,
                tunnel_finder,
            );
            return Err(error);
        };

        let code = loop {
            let candidate = SessionCode::new();
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        self.sessions
            .insert(code, Session::new(code, host_id, bank.clone()));
        tracing::info!(session = %code, bank = %bank_ref, "session created");

        send_to(
            &UpdateMessage::SessionCreated(code).into(),
            host_id,
            tunnel_finder,
        );
        Ok(code)
    }

    /// Joins a player to a live session
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] for an unknown code (also
    /// reported to the requester's tunnel) and a wrapped
    /// [`roster::Error`] if the session rejects the join.
    pub fn join_session<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        code: SessionCode,
        player_id: Id,
        name: String,
        tunnel_finder: F,
    ) -> Result<(), Error> {
        let Some(session) = self.sessions.get_mut(&code) else {
            let error = Error::SessionNotFound(code);
            send_to(
                &UpdateMessage::Error(error.clone()).into(),
                player_id,
                tunnel_finder,
            );
            return Err(error);
        };

        session.join(player_id, name, tunnel_finder)?;
        Ok(())
    }

    /// Routes a participant message to the addressed session
    ///
    /// Unknown codes report [`Error::SessionNotFound`] to the sender
    /// and change nothing.
    pub fn receive_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        sender: Id,
        code: SessionCode,
        message: session::IncomingMessage,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        let Some(session) = self.sessions.get_mut(&code) else {
            send_to(
                &UpdateMessage::Error(Error::SessionNotFound(code)).into(),
                sender,
                tunnel_finder,
            );
            return;
        };
        session.receive_message(sender, message, schedule_message, tunnel_finder);
    }

    /// Routes a tick alarm to the session it names
    ///
    /// Alarms addressed to a session that has since been removed are
    /// dropped silently; the scheduler needs no cancellation support.
    pub fn receive_alarm<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        message: crate::AlarmMessage,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        let crate::AlarmMessage::Session(alarm) = message;
        let session::AlarmMessage::TimerTick { session: code, .. } = &alarm;
        let code = *code;

        match self.sessions.get_mut(&code) {
            Some(session) => session.receive_alarm(&alarm, schedule_message, tunnel_finder),
            None => tracing::debug!(session = %code, "tick for a vanished session dropped"),
        }
    }

    /// Handles a participant connection going away
    ///
    /// Scans every live session; where the id is a joined player it is
    /// removed and the shrunken roster is broadcast to that room. A host
    /// going away does not tear the session down.
    pub fn disconnect<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, id: Id, tunnel_finder: F) {
        for session in self.sessions.values_mut() {
            session.remove_player(id, &tunnel_finder);
        }
    }

    /// Removes a session, returning it if it was live
    ///
    /// Sessions are never garbage-collected implicitly; the embedder
    /// decides when a room is over. In-flight tick alarms for the
    /// removed session become no-ops.
    pub fn remove_session(&mut self, code: SessionCode) -> Option<Session> {
        let session = self.sessions.remove(&code);
        if session.is_some() {
            tracing::info!(session = %code, "session removed");
        }
        session
    }
}
