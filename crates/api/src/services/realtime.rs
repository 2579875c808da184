//! In-process change feed.
//!
//! Every write publishes a [`ChangeEvent`]; SSE subscribers receive them
//! live. Slow subscribers that fall behind skip what they missed and are
//! expected to refetch.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per subscriber before it starts lagging.
pub const CHANNEL_CAPACITY: usize = 256;

/// Tables that publish changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Products,
    Appointments,
    Profiles,
    Orders,
}

/// Kind of write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// One row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub action: ChangeAction,
    pub id: Uuid,
}

/// Broadcast hub shared through the application state.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Create a feed with [`CHANNEL_CAPACITY`] slots.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, table: Table, action: ChangeAction, id: impl Into<Uuid>) {
        let event = ChangeEvent {
            table,
            action,
            id: id.into(),
        };
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(?event, receivers, "published change");
    }

    /// Subscribe to future changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}
