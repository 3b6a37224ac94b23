//! Session registry for the two player slots
//!
//! This module handles the server-side bookkeeping of connected players:
//! - Slot assignment on connect and rejection when both slots are taken
//! - Slot release on disconnect, which resets the match
//! - Last-write-wins storage of each player's paddle direction
//! - Snapshot delivery to every occupied slot
//!
//! The registry never touches sockets directly. Each session carries the
//! sending half of its connection's outbound channel; dropping that sender
//! tells the transport to close the connection. The channel is bounded: a
//! peer that stops reading loses snapshots instead of growing the queue.

use crate::game::MatchState;
use log::{debug, info};
use rand::Rng;
use shared::{clamp_direction, ServerMessage, Slot};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identity of a transport connection, unique for the life of the process
pub type ConnectionId = u64;

/// Messages a connection may have queued before further snapshots are dropped
pub const OUTBOUND_CAPACITY: usize = 32;

/// Sending half of a connection's outbound queue
pub type Outbound = mpsc::Sender<ServerMessage>;

/// Why a connection could not be seated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("both player slots are taken")]
    Full,
}

/// A connection bound to a slot
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub slot: Slot,
    outbound: Outbound,
}

impl Session {
    /// Queues a message if the connection is still open and keeping up.
    /// A later snapshot supersedes a dropped one.
    fn send(&self, message: ServerMessage) {
        match self.outbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Session {} is not reading, dropping message", self.id)
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session {} closed before delivery", self.id)
            }
        }
    }
}

/// The two player slots and the connection that holds each one
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: [Option<Session>; 2],
    by_connection: HashMap<ConnectionId, Slot>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new connection to the first free slot.
    ///
    /// On success the connection is sent its `assign` message, the lifecycle is
    /// re-evaluated and a fresh snapshot goes to everyone. When both slots are
    /// taken the connection is sent `full` and its sender is dropped.
    pub fn assign(
        &mut self,
        id: ConnectionId,
        addr: SocketAddr,
        outbound: Outbound,
        state: &mut MatchState,
        now: Instant,
    ) -> Result<Slot, RegistryError> {
        let Some(slot) = Slot::ALL
            .into_iter()
            .find(|slot| self.slots[slot.index()].is_none())
        else {
            info!("Rejecting connection {} from {}: room full", id, addr);
            if outbound.try_send(ServerMessage::Full).is_err() {
                debug!("Connection {} closed before rejection", id);
            }
            return Err(RegistryError::Full);
        };

        let session = Session {
            id,
            addr,
            slot,
            outbound,
        };
        session.send(ServerMessage::assign(slot));
        info!("Connection {} from {} assigned slot {}", id, addr, slot.index());

        self.slots[slot.index()] = Some(session);
        self.by_connection.insert(id, slot);

        state.evaluate(self.occupancy(), now);
        self.broadcast(state, now);
        Ok(slot)
    }

    /// Frees the slot owned by `id` and resets the match.
    ///
    /// Returns the released slot, or None if the connection never held one.
    pub fn release<R: Rng + ?Sized>(
        &mut self,
        id: ConnectionId,
        state: &mut MatchState,
        now: Instant,
        rng: &mut R,
    ) -> Option<Slot> {
        let slot = self.by_connection.remove(&id)?;
        if let Some(session) = self.slots[slot.index()].take() {
            info!(
                "Connection {} from {} left slot {}",
                session.id,
                session.addr,
                slot.index()
            );
        }

        state.set_direction(slot, 0.0);
        state.reset(rng);
        state.evaluate(self.occupancy(), now);
        self.broadcast(state, now);
        Some(slot)
    }

    /// Stores the latest direction for the connection's paddle.
    /// Returns false if the connection holds no slot.
    pub fn set_direction(&self, id: ConnectionId, direction: f64, state: &mut MatchState) -> bool {
        match self.by_connection.get(&id) {
            Some(slot) => {
                state.set_direction(*slot, clamp_direction(direction));
                true
            }
            None => false,
        }
    }

    /// Which slots currently hold a connection
    pub fn occupancy(&self) -> [bool; 2] {
        [self.slots[0].is_some(), self.slots[1].is_some()]
    }

    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }

    /// Sends the current snapshot to every occupied slot
    pub fn broadcast(&self, state: &MatchState, now: Instant) {
        if self.is_empty() {
            return;
        }

        let message = ServerMessage::State(state.snapshot(self.occupancy(), now));
        for session in self.slots.iter().flatten() {
            session.send(message.clone());
        }
    }
}
