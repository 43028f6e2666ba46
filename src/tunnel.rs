//! Broadcast gateway seam
//!
//! This module defines the trait for tunneling messages between the
//! session engine and connected participants (players and hosts). The
//! tunnel abstraction keeps the engine transport-agnostic: WebSockets,
//! Server-Sent Events, or an in-memory queue in tests all fit behind
//! the same interface.

use super::{SyncMessage, UpdateMessage};

/// Trait for sending messages through a communication tunnel
///
/// Every broadcast the engine performs goes through a tunnel looked up
/// by participant id, so the set of tunnels the finder resolves defines
/// the room.
pub trait Tunnel {
    /// Sends an update message to the participant
    ///
    /// Update messages notify participants about changes that affect
    /// their current view: roster changes, new questions, countdown
    /// ticks, view transitions, and errors.
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a state synchronization message to the participant
    ///
    /// Sync messages carry the full current view, typically sent when a
    /// participant joins mid-session.
    fn send_state(&self, state: &SyncMessage);

    /// Closes the communication tunnel
    ///
    /// Called when the participant disconnects or the session no longer
    /// needs the connection.
    fn close(self);
}
