//! Basic type definitions for the chat relay
//!
//! Provides the `SlotId` newtype: the position a connection occupies in the
//! fixed-capacity connection table.

/// Connection table slot index (newtype pattern)
///
/// A connection's identity for its whole lifetime. Slots are reused after a
/// connection is removed, so a `SlotId` is only meaningful while the
/// connection it was issued for is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl SlotId {
    /// Index into the connection table's slot array
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
