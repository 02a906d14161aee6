use crate::domain::value_objects::{EntityClass, RecordId, RecordStatus, ServerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File content queued for upload, owned by a work order or survey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentRecord {
    pub id: RecordId,
    pub entity_class: EntityClass,
    /// Owning entity; may itself be a temporary id.
    pub parent_entity_id: String,
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub status: RecordStatus,
    pub retry_count: u32,
    pub depends_on: Option<RecordId>,
    pub server_id: Option<ServerId>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a caller hands over when queueing a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDraft {
    pub parent_entity_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl AttachmentDraft {
    pub fn new(
        parent_entity_id: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            parent_entity_id: parent_entity_id.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

impl AttachmentRecord {
    pub fn new_pending(
        id: RecordId,
        entity_class: EntityClass,
        draft: AttachmentDraft,
        depends_on: Option<RecordId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_class,
            parent_entity_id: draft.parent_entity_id,
            file_name: draft.file_name,
            mime_type: draft.mime_type,
            data: draft.data,
            status: RecordStatus::Pending,
            retry_count: 0,
            depends_on,
            server_id: None,
            error: None,
            timestamp: now,
            updated_at: now,
        }
    }

    pub fn mark_synced(&mut self, server_id: ServerId) {
        self.status = RecordStatus::Synced;
        self.server_id = Some(server_id);
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RecordStatus::Failed;
        self.retry_count += 1;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn reset_for_retry(&mut self) {
        self.status = RecordStatus::Pending;
        self.retry_count = 0;
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self, max_retries: u32) -> bool {
        self.status == RecordStatus::Failed && self.retry_count >= max_retries
    }

    pub fn is_replayable(&self, max_retries: u32) -> bool {
        match self.status {
            RecordStatus::Pending => true,
            RecordStatus::Failed => self.retry_count < max_retries,
            RecordStatus::Synced => false,
        }
    }
}
