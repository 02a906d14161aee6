use crate::domain::value_objects::EntityClass;
use serde::{Deserialize, Serialize};

/// Outcome of one sync pass over an entity class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub entity_class: EntityClass,
    pub synced_count: u32,
    pub failed_count: u32,
    pub terminal_count: u32,
    /// Failures under the cap whose error another attempt may clear.
    pub retryable_count: u32,
    /// Records left pending because something they depend on is not synced yet.
    pub deferred_count: u32,
    /// Another pass for this class was already running.
    pub skipped: bool,
}

impl SyncReport {
    pub fn new(entity_class: EntityClass) -> Self {
        Self {
            entity_class,
            synced_count: 0,
            failed_count: 0,
            terminal_count: 0,
            retryable_count: 0,
            deferred_count: 0,
            skipped: false,
        }
    }

    pub fn skipped(entity_class: EntityClass) -> Self {
        Self {
            skipped: true,
            ..Self::new(entity_class)
        }
    }

    /// Failures worth a timed follow-up pass.
    pub fn retryable_failures(&self) -> u32 {
        self.retryable_count
    }
}
