//! Session state machine
//!
//! This module contains the per-game state machine: lobby membership,
//! the randomized question walk, the per-question answer ledger, the
//! countdown, the one-time close-and-score transition, and every
//! broadcast a session emits to its room. One session is mutated by one
//! serialized event at a time; the countdown tick is delivered through
//! [`Session::receive_alarm`] as an ordinary event rather than a
//! concurrent writer.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::{Duration, SystemTime};

use crate::{
    bank::QuestionBank,
    constants,
    roster::{self, Id, Participant, PlayerInfo, Roster},
    score,
    session_code::SessionCode,
    timer::{TickOutcome, TimerController},
    tunnel::Tunnel,
};

/// Where a session currently stands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Phase {
    /// Players are gathering; no question has been presented yet
    Lobby,
    /// A question has been presented (open or already scored)
    Question(OpenQuestion),
    /// The question walk is exhausted; the final board is up
    Finished,
}

/// Runtime state of the question currently presented
///
/// The bank record itself stays immutable; the presentation timestamp,
/// the one-shot `closed` flag, and the per-open option shuffle live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenQuestion {
    /// Cursor into the session's presentation order
    pub position: usize,
    /// The option order fixed when this question opened
    pub options: Vec<String>,
    /// When the question was presented to the room
    pub started_at: SystemTime,
    /// Set exactly once, when scoring has been applied
    pub closed: bool,
}

/// Session-scoped errors reported to the requesting participant
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Advance was requested past the last question while it was still open
    #[error("no question remains and the current one is still open")]
    SequenceViolation,
}

/// Messages received from session participants
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingMessage {
    /// Messages only the session host may send
    Host(IncomingHostMessage),
    /// Messages only joined players may send
    Player(IncomingPlayerMessage),
}

impl IncomingMessage {
    /// Validates that a message matches the sender's role
    ///
    /// Host commands are only honored from the recorded host id and
    /// player commands only from roster members; anything else is
    /// dropped without effect.
    fn follows(&self, sender: Id, session: &Session) -> bool {
        match self {
            IncomingMessage::Host(_) => sender == session.host_id,
            IncomingMessage::Player(_) => session.roster.contains(sender),
        }
    }
}

/// Commands the host drives the session with
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingHostMessage {
    /// Leave the lobby and present the first question
    Start,
    /// Present the next question, or finish after the last one
    Advance,
    /// Route the whole room to the leaderboard view
    ShowBoard,
}

/// Messages active players can send
#[derive(Debug, Deserialize, Clone)]
pub enum IncomingPlayerMessage {
    /// The player's answer for the open question
    Answer(String),
}

/// The screen a participant should be showing
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Host's in-question control screen
    HostGame,
    /// Player's answering screen
    Player,
    /// The shared leaderboard
    Board,
}

/// Update messages broadcast to the room
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// The membership or scores changed
    RosterUpdated {
        /// Current players in join order
        players: Vec<PlayerInfo>,
        /// The session's join code
        session: SessionCode,
        /// The session host's id
        host: Id,
    },
    /// A question opened
    QuestionUpdated {
        /// The question text
        prompt: String,
        /// Answer options in this open's shuffled order
        options: Vec<String>,
    },
    /// The recipient should switch screens
    ViewChanged(View),
    /// Countdown update carrying the remaining tick count
    TimerTick(u32),
    /// A request failed; sent to the requester only
    Error(Error),
}

/// Sync messages carrying the full current view for one participant
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// The session is in the lobby
    Lobby {
        /// Current players in join order
        players: Vec<PlayerInfo>,
        /// The session's join code
        session: SessionCode,
        /// The session host's id
        host: Id,
    },
    /// A question is open
    Question {
        /// The question text
        prompt: String,
        /// The option order the rest of the room is seeing
        options: Vec<String>,
        /// Ticks left on the countdown
        remaining: u32,
    },
    /// The leaderboard is up
    Board {
        /// Current players in join order
        players: Vec<PlayerInfo>,
    },
}

/// Alarm messages requesting redelivery through the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One countdown tick for one session
    TimerTick {
        /// The session whose countdown this tick belongs to
        session: SessionCode,
        /// Generation stamp identifying the countdown
        generation: u64,
    },
}

/// One running trivia game
pub struct Session {
    /// The short join code identifying this session
    code: SessionCode,
    /// The host's id; never entered into the roster, never transferred
    host_id: Id,
    /// Joined players
    roster: Roster,
    /// The immutable question bank this session plays through
    bank: QuestionBank,
    /// Randomized permutation of question indices, fixed at creation
    order: Vec<usize>,
    /// Current phase
    phase: Phase,
    /// The session's countdown
    timer: TimerController,
}

impl Debug for Session {
    /// Custom debug implementation that avoids printing the whole bank
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("code", &self.code)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session around a validated question bank
    ///
    /// Draws the presentation order once; it never changes afterwards.
    pub fn new(code: SessionCode, host_id: Id, bank: QuestionBank) -> Self {
        let order = bank.shuffled_order();
        Self {
            code,
            host_id,
            roster: Roster::default(),
            bank,
            order,
            phase: Phase::Lobby,
            timer: TimerController::default(),
        }
    }

    /// Returns the session's join code
    pub fn code(&self) -> SessionCode {
        self.code
    }

    /// Returns the host's id
    pub fn host_id(&self) -> Id {
        self.host_id
    }

    /// Returns the current phase
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Returns the presentation order drawn at creation
    pub fn presentation_order(&self) -> &[usize] {
        &self.order
    }

    /// Returns the number of joined players
    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    /// Checks whether an id is a joined player
    pub fn has_player(&self, id: Id) -> bool {
        self.roster.contains(id)
    }

    /// Looks up a joined player's state
    pub fn player(&self, id: Id) -> Option<&Participant> {
        self.roster.get(id)
    }

    /// Returns the broadcastable roster projection
    pub fn players(&self) -> Vec<PlayerInfo> {
        self.roster.infos()
    }

    // Broadcast helpers; the room is the roster plus the host.

    fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &crate::UpdateMessage,
        tunnel_finder: F,
    ) {
        for id in self
            .roster
            .ids()
            .into_iter()
            .chain(std::iter::once(self.host_id))
        {
            if let Some(tunnel) = tunnel_finder(id) {
                tunnel.send_message(message);
            }
        }
    }

    fn announce_players<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &crate::UpdateMessage,
        tunnel_finder: F,
    ) {
        for id in self.roster.ids() {
            if let Some(tunnel) = tunnel_finder(id) {
                tunnel.send_message(message);
            }
        }
    }

    fn send_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &crate::UpdateMessage,
        id: Id,
        tunnel_finder: F,
    ) {
        if let Some(tunnel) = tunnel_finder(id) {
            tunnel.send_message(message);
        }
    }

    fn roster_update(&self) -> UpdateMessage {
        UpdateMessage::RosterUpdated {
            players: self.roster.infos(),
            session: self.code,
            host: self.host_id,
        }
    }

    /// Adds a player to the session
    ///
    /// Permitted in any phase; a player joining mid-question has no
    /// pending answer and is ranked as never-answered if the question
    /// closes before they submit. The full roster is broadcast to the
    /// room and the joiner receives a sync of the current view.
    ///
    /// # Errors
    ///
    /// Returns a [`roster::Error`] if the session is full or the id is
    /// already joined; nothing is broadcast in that case.
    pub fn join<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        player_id: Id,
        name: String,
        tunnel_finder: F,
    ) -> Result<(), roster::Error> {
        self.roster.add(player_id, name)?;
        tracing::info!(session = %self.code, player = %player_id, "player joined");

        self.announce(&self.roster_update().into(), &tunnel_finder);
        if let Some(tunnel) = tunnel_finder(player_id) {
            tunnel.send_state(&self.state_message());
        }
        Ok(())
    }

    /// Removes a player, broadcasting the new roster if they were joined
    ///
    /// Removing an id that was never in this session is a no-op.
    pub fn remove_player<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        player_id: Id,
        tunnel_finder: F,
    ) -> bool {
        if self.roster.remove(player_id).is_none() {
            return false;
        }
        tracing::info!(session = %self.code, player = %player_id, "player left");
        self.announce(&self.roster_update().into(), tunnel_finder);
        true
    }

    /// Handles an incoming participant message
    ///
    /// Messages whose kind does not match the sender's role are dropped
    /// without effect.
    pub fn receive_message<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        sender: Id,
        message: IncomingMessage,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        if !message.follows(sender, self) {
            return;
        }

        match message {
            IncomingMessage::Host(IncomingHostMessage::Start | IncomingHostMessage::Advance) => {
                self.next_question(sender, schedule_message, tunnel_finder);
            }
            IncomingMessage::Host(IncomingHostMessage::ShowBoard) => {
                self.announce(&UpdateMessage::ViewChanged(View::Board).into(), tunnel_finder);
            }
            IncomingMessage::Player(IncomingPlayerMessage::Answer(answer)) => {
                self.submit_answer(sender, answer, tunnel_finder);
            }
        }
    }

    /// Moves the cursor to the next question, or finishes the session
    ///
    /// Advancing past a still-open question that has successors abandons
    /// it unscored; its countdown is superseded when the next one opens.
    /// Advancing past the last question transitions to the final board
    /// if it is closed and reports a [`Error::SequenceViolation`] to the
    /// requester if it is not. Advancing a finished session re-broadcasts
    /// the board view.
    fn next_question<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        requester: Id,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        let next = match &self.phase {
            Phase::Lobby => 0,
            Phase::Question(current) => current.position + 1,
            Phase::Finished => {
                self.announce(&UpdateMessage::ViewChanged(View::Board).into(), tunnel_finder);
                return;
            }
        };

        if next < self.order.len() {
            self.open_question(next, schedule_message, tunnel_finder);
        } else if matches!(&self.phase, Phase::Question(current) if current.closed) {
            self.timer.cancel();
            self.phase = Phase::Finished;
            tracing::info!(session = %self.code, "session finished");
            self.announce(&UpdateMessage::ViewChanged(View::Board).into(), tunnel_finder);
        } else {
            tracing::warn!(session = %self.code, "advance past the end with an open question");
            self.send_message(
                &UpdateMessage::Error(Error::SequenceViolation).into(),
                requester,
                tunnel_finder,
            );
        }
    }

    /// Opens the question at `position` in the presentation order
    fn open_question<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        position: usize,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        let Some(record) = self.order.get(position).and_then(|i| self.bank.question(*i))
        else {
            return;
        };
        let prompt = record.prompt.clone();
        let options = record.shuffled_options();

        self.roster.reset_answers();
        self.phase = Phase::Question(OpenQuestion {
            position,
            options: options.clone(),
            started_at: SystemTime::now(),
            closed: false,
        });

        tracing::debug!(session = %self.code, position, "question opened");

        self.announce(
            &UpdateMessage::QuestionUpdated { prompt, options }.into(),
            &tunnel_finder,
        );
        self.send_message(
            &UpdateMessage::ViewChanged(View::HostGame).into(),
            self.host_id,
            &tunnel_finder,
        );
        self.announce_players(&UpdateMessage::ViewChanged(View::Player).into(), &tunnel_finder);

        let generation = self.timer.start(constants::timer::QUESTION_TICKS);
        self.announce(
            &UpdateMessage::TimerTick(constants::timer::QUESTION_TICKS).into(),
            &tunnel_finder,
        );
        schedule_message(
            AlarmMessage::TimerTick {
                session: self.code,
                generation,
            }
            .into(),
            Duration::from_secs(constants::timer::TICK_SECONDS),
        );
    }

    /// Stores a player's answer and runs the close decision
    ///
    /// Ignored when no question is open and after the player's first
    /// submission for this question.
    fn submit_answer<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        player_id: Id,
        answer: String,
        tunnel_finder: F,
    ) {
        let open = matches!(&self.phase, Phase::Question(current) if !current.closed);
        if !open {
            return;
        }
        if !self
            .roster
            .record_answer(player_id, answer, SystemTime::now())
        {
            return;
        }

        if self.roster.all_answered() {
            self.close_question(false, tunnel_finder);
        }
    }

    /// Closes and scores the open question, exactly once
    ///
    /// The `closed` flag guards the race between a last-second answer
    /// and the countdown expiry: whichever path arrives second finds the
    /// flag set and returns without rescoring.
    fn close_question<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        timed_out: bool,
        tunnel_finder: F,
    ) {
        let (position, started_at) = {
            let Phase::Question(current) = &mut self.phase else {
                return;
            };
            if current.closed {
                return;
            }
            current.closed = true;
            (current.position, current.started_at)
        };

        self.timer.cancel();

        let Some(record) = self.order.get(position).and_then(|i| self.bank.question(*i))
        else {
            return;
        };

        // Never-answered players rank behind everyone, at the close instant.
        let now = SystemTime::now();
        for (rank, (id, answered_at)) in self.roster.ranked(now).into_iter().enumerate() {
            let correct = self
                .roster
                .get(id)
                .and_then(|p| p.pending_answer.as_deref())
                .is_some_and(|answer| record.is_correct(answer));
            let latency = answered_at.duration_since(started_at).unwrap_or_default();
            self.roster.apply_points(id, score::award(correct, latency, rank));
        }
        self.roster.clear_pending_answers();

        tracing::info!(session = %self.code, position, timed_out, "question closed and scored");

        self.announce(&self.roster_update().into(), &tunnel_finder);
        self.announce(&UpdateMessage::ViewChanged(View::Board).into(), &tunnel_finder);
    }

    /// Handles a countdown tick alarm
    ///
    /// Stale alarms (superseded countdowns, already-closed questions)
    /// die silently; live ones broadcast the remaining count, reschedule
    /// themselves, and at zero trigger the timed-out close.
    pub fn receive_alarm<
        T: Tunnel,
        F: Fn(Id) -> Option<T>,
        S: FnMut(crate::AlarmMessage, Duration),
    >(
        &mut self,
        message: &AlarmMessage,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        let AlarmMessage::TimerTick { generation, .. } = message;

        if !matches!(&self.phase, Phase::Question(current) if !current.closed) {
            self.timer.cancel();
            return;
        }

        match self.timer.tick(*generation) {
            TickOutcome::Stale => {}
            TickOutcome::Tick(remaining) => {
                self.announce(&UpdateMessage::TimerTick(remaining).into(), &tunnel_finder);
                schedule_message(
                    AlarmMessage::TimerTick {
                        session: self.code,
                        generation: *generation,
                    }
                    .into(),
                    Duration::from_secs(constants::timer::TICK_SECONDS),
                );
            }
            TickOutcome::Expired => {
                self.announce(&UpdateMessage::TimerTick(0).into(), &tunnel_finder);
                self.close_question(true, tunnel_finder);
            }
        }
    }

    /// Builds the sync message matching the current view
    pub fn state_message(&self) -> crate::SyncMessage {
        match &self.phase {
            Phase::Lobby => SyncMessage::Lobby {
                players: self.roster.infos(),
                session: self.code,
                host: self.host_id,
            },
            Phase::Question(current) if !current.closed => SyncMessage::Question {
                prompt: self
                    .order
                    .get(current.position)
                    .and_then(|i| self.bank.question(*i))
                    .map(|record| record.prompt.clone())
                    .unwrap_or_default(),
                options: current.options.clone(),
                remaining: self.timer.remaining().unwrap_or(0),
            },
            Phase::Question(_) | Phase::Finished => SyncMessage::Board {
                players: self.roster.infos(),
            },
        }
        .into()
    }
}
