//! Fixed-capacity connection table
//!
//! The registry of live connections, owned exclusively by the `ChatServer`
//! actor. Slots are allocated lowest-index-first and reused only after an
//! explicit removal, so iteration order is stable for a fixed connection
//! history and broadcast fan-out is deterministic.

use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::error::AppError;
use crate::protocol::ServerMessage;
use crate::types::SlotId;

/// Maximum number of simultaneously connected clients
pub const MAX_CLIENTS: usize = 100;

/// Slot-indexed registry of live connections
#[derive(Debug)]
pub struct ConnectionTable {
    slots: Vec<Option<Connection>>,
}

impl ConnectionTable {
    /// Create an empty table with the given capacity
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// Store a new Unverified connection in the first free slot
    ///
    /// Fails with [`AppError::TableFull`] when every slot is occupied,
    /// leaving the table unchanged; the caller must discard the socket.
    pub fn insert(
        &mut self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<SlotId, AppError> {
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(AppError::TableFull)?;
        let id = SlotId(free);
        self.slots[free] = Some(Connection::new(id, sender));
        Ok(id)
    }

    /// Free a slot, returning the connection that occupied it
    ///
    /// Idempotent: removing an already-free slot is a no-op returning `None`.
    /// Dropping the returned connection drops its sender, which ends the
    /// peer's writer task and closes the socket.
    pub fn remove(&mut self, id: SlotId) -> Option<Connection> {
        self.slots.get_mut(id.index())?.take()
    }

    /// Look up a live connection
    pub fn get(&self, id: SlotId) -> Option<&Connection> {
        self.slots.get(id.index())?.as_ref()
    }

    /// Look up a live connection mutably
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut Connection> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Slot ids of every live connection, in ascending slot order
    pub fn live_slots(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| SlotId(i)))
            .collect()
    }

    /// Iterate over live connections in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether the table holds no live connections
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new(MAX_CLIENTS)
    }
}
