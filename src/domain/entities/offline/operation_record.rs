use crate::domain::value_objects::{
    EntityClass, OfflinePayload, RecordId, RecordStatus, ServerId, SyncAction,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload field naming the entity an operation applies to.
pub const ENTITY_ID_FIELD: &str = "id";

/// One queued user action against an entity collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRecord {
    pub id: RecordId,
    pub entity_class: EntityClass,
    pub action: SyncAction,
    pub payload: OfflinePayload,
    /// Owning entity for child collections (material/equipment, surveys).
    pub parent_id: Option<String>,
    pub status: RecordStatus,
    pub retry_count: u32,
    /// Temporary id whose create must be replayed before this record.
    pub depends_on: Option<RecordId>,
    pub server_id: Option<ServerId>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OperationRecord {
    pub fn new_pending(
        id: RecordId,
        entity_class: EntityClass,
        action: SyncAction,
        payload: OfflinePayload,
        depends_on: Option<RecordId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_class,
            action,
            payload,
            parent_id: None,
            status: RecordStatus::Pending,
            retry_count: 0,
            depends_on,
            server_id: None,
            error: None,
            timestamp: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// The id of the entity this operation targets, as carried in the payload.
    pub fn target_id(&self) -> Option<&str> {
        self.payload.get_str(ENTITY_ID_FIELD)
    }

    pub fn mark_synced(&mut self, server_id: Option<ServerId>) {
        self.status = RecordStatus::Synced;
        self.error = None;
        if server_id.is_some() {
            self.server_id = server_id;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RecordStatus::Failed;
        self.retry_count += 1;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Puts a terminal record back in the queue for a manual retry.
    pub fn reset_for_retry(&mut self) {
        self.status = RecordStatus::Pending;
        self.retry_count = 0;
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self, max_retries: u32) -> bool {
        self.status == RecordStatus::Failed && self.retry_count >= max_retries
    }

    /// Pending records, and failed records still under the retry cap.
    pub fn is_replayable(&self, max_retries: u32) -> bool {
        match self.status {
            RecordStatus::Pending => true,
            RecordStatus::Failed => self.retry_count < max_retries,
            RecordStatus::Synced => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> OperationRecord {
        OperationRecord::new_pending(
            RecordId::generate(),
            EntityClass::WorkOrder,
            SyncAction::Update,
            OfflinePayload::new(json!({"id": "wo-1"})).unwrap(),
            None,
        )
    }

    #[test]
    fn failure_increments_retry_count_until_terminal() {
        let mut record = record();
        assert!(record.is_replayable(3));

        for _ in 0..3 {
            record.mark_failed("500");
        }

        assert_eq!(record.retry_count, 3);
        assert!(record.is_terminal(3));
        assert!(!record.is_replayable(3));
        assert_eq!(record.error.as_deref(), Some("500"));
    }

    #[test]
    fn synced_records_are_not_replayable() {
        let mut record = record();
        record.mark_synced(Some(ServerId::new("42".into()).unwrap()));
        assert_eq!(record.status, RecordStatus::Synced);
        assert!(!record.is_replayable(3));
        assert_eq!(record.target_id(), Some("wo-1"));
    }
}
