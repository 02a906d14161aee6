use crate::domain::value_objects::{EntityClass, NetworkState, RecordId};
use serde::{Deserialize, Serialize};

/// Published on the completion bus after a sync pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Emitted once per pass per class, only when something was synced.
    Completed {
        entity_class: EntityClass,
        success_count: u32,
    },
    /// A record hit the retry cap and will not be retried automatically.
    TerminalFailure {
        entity_class: EntityClass,
        record_id: RecordId,
        retry_count: u32,
        error: String,
    },
}

/// Snapshot for pending-count and sync indicators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEvent {
    pub network: NetworkState,
    pub syncing: bool,
    pub pending_count: u64,
}

/// Edge raised by the network monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkTransition {
    BecameOnline,
    WentOffline,
}
