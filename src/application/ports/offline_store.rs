use crate::domain::entities::{AttachmentRecord, OperationRecord};
use crate::domain::value_objects::{EntityClass, RecordId, RecordStatus, ServerId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable local queue, one collection per entity class.
///
/// Every call is its own transaction. Once `put` returns `Ok` the record
/// survives a restart; a store that cannot take the write returns
/// `AppError::StorageUnavailable`.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    async fn put(&self, record: &OperationRecord) -> Result<(), AppError>;
    async fn get(
        &self,
        class: EntityClass,
        id: &RecordId,
    ) -> Result<Option<OperationRecord>, AppError>;
    async fn get_all_by_status(
        &self,
        class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<OperationRecord>, AppError>;
    async fn get_all_by_parent(
        &self,
        class: EntityClass,
        parent_id: &str,
    ) -> Result<Vec<OperationRecord>, AppError>;
    async fn delete(&self, class: EntityClass, id: &RecordId) -> Result<bool, AppError>;

    async fn put_attachment(&self, record: &AttachmentRecord) -> Result<(), AppError>;
    async fn get_attachment(
        &self,
        class: EntityClass,
        id: &RecordId,
    ) -> Result<Option<AttachmentRecord>, AppError>;
    async fn get_attachments_by_status(
        &self,
        class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<AttachmentRecord>, AppError>;
    async fn get_attachments_by_parent(
        &self,
        class: EntityClass,
        parent_id: &str,
    ) -> Result<Vec<AttachmentRecord>, AppError>;
    async fn delete_attachment(&self, class: EntityClass, id: &RecordId)
    -> Result<bool, AppError>;

    /// Works on both record kinds.
    async fn contains(&self, class: EntityClass, id: &str) -> Result<bool, AppError>;
    async fn count_by_status(
        &self,
        class: EntityClass,
        status: RecordStatus,
    ) -> Result<u64, AppError>;
    /// Deletes synced records last touched before `cutoff`.
    async fn purge_synced_before(
        &self,
        class: EntityClass,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError>;
    /// Server id of a record that was synced but not yet deleted.
    async fn find_server_id(
        &self,
        class: EntityClass,
        id: &str,
    ) -> Result<Option<ServerId>, AppError>;
}
