use super::mappers::{attachment_from_row, operation_from_row, payload_to_db};
use super::rows::{AttachmentRow, OperationRow};
use crate::application::ports::{NetworkStateStore, OfflineStore};
use crate::domain::entities::{AttachmentRecord, OperationRecord};
use crate::domain::value_objects::{EntityClass, RecordId, RecordStatus, ServerId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

const WAS_OFFLINE_KEY: &str = "was_offline";

const OPERATION_COLUMNS: &str = "id, action, payload, parent_id, status, retry_count, \
     depends_on, server_id, error_message, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str = "id, parent_id, file_name, mime_type, data, status, \
     retry_count, depends_on, server_id, error_message, created_at, updated_at";

/// SQLite-backed queue; one table per entity class.
pub struct SqliteOfflineStore {
    pool: Pool<Sqlite>,
}

impl SqliteOfflineStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn operation_table(class: EntityClass) -> Result<&'static str, AppError> {
        if class.is_attachment() {
            return Err(AppError::ValidationError(format!(
                "{class} stores file uploads, not operations"
            )));
        }
        Ok(class.collection())
    }

    fn attachment_table(class: EntityClass) -> Result<&'static str, AppError> {
        if !class.is_attachment() {
            return Err(AppError::ValidationError(format!(
                "{class} stores operations, not file uploads"
            )));
        }
        Ok(class.collection())
    }
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn put(&self, record: &OperationRecord) -> Result<(), AppError> {
        let table = Self::operation_table(record.entity_class)?;
        let payload = payload_to_db(&record.payload)?;

        let sql = format!(
            r#"
            INSERT INTO {table} ({OPERATION_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                action = excluded.action,
                payload = excluded.payload,
                parent_id = excluded.parent_id,
                status = excluded.status,
                retry_count = excluded.retry_count,
                depends_on = excluded.depends_on,
                server_id = excluded.server_id,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#
        );

        sqlx::query(&sql)
            .bind(record.id.as_str())
            .bind(record.action.as_str())
            .bind(&payload)
            .bind(record.parent_id.as_deref())
            .bind(record.status.as_str())
            .bind(i64::from(record.retry_count))
            .bind(record.depends_on.as_ref().map(RecordId::as_str))
            .bind(record.server_id.as_ref().map(ServerId::as_str))
            .bind(record.error.as_deref())
            .bind(record.timestamp.timestamp_millis())
            .bind(record.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(AppError::storage_write)?;

        Ok(())
    }

    async fn get(
        &self,
        class: EntityClass,
        id: &RecordId,
    ) -> Result<Option<OperationRecord>, AppError> {
        let table = Self::operation_table(class)?;
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM {table} WHERE id = ?1");

        let row = sqlx::query_as::<_, OperationRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| operation_from_row(class, row)).transpose()
    }

    async fn get_all_by_status(
        &self,
        class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<OperationRecord>, AppError> {
        let table = Self::operation_table(class)?;
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM {table} WHERE status = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );

        let rows = sqlx::query_as::<_, OperationRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| operation_from_row(class, row))
            .collect()
    }

    async fn get_all_by_parent(
        &self,
        class: EntityClass,
        parent_id: &str,
    ) -> Result<Vec<OperationRecord>, AppError> {
        let table = Self::operation_table(class)?;
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM {table} WHERE parent_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );

        let rows = sqlx::query_as::<_, OperationRow>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| operation_from_row(class, row))
            .collect()
    }

    async fn delete(&self, class: EntityClass, id: &RecordId) -> Result<bool, AppError> {
        let table = Self::operation_table(class)?;
        let sql = format!("DELETE FROM {table} WHERE id = ?1");

        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(AppError::storage_write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn put_attachment(&self, record: &AttachmentRecord) -> Result<(), AppError> {
        let table = Self::attachment_table(record.entity_class)?;

        let sql = format!(
            r#"
            INSERT INTO {table} ({ATTACHMENT_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                parent_id = excluded.parent_id,
                status = excluded.status,
                retry_count = excluded.retry_count,
                depends_on = excluded.depends_on,
                server_id = excluded.server_id,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            "#
        );

        sqlx::query(&sql)
            .bind(record.id.as_str())
            .bind(&record.parent_entity_id)
            .bind(&record.file_name)
            .bind(&record.mime_type)
            .bind(&record.data)
            .bind(record.status.as_str())
            .bind(i64::from(record.retry_count))
            .bind(record.depends_on.as_ref().map(RecordId::as_str))
            .bind(record.server_id.as_ref().map(ServerId::as_str))
            .bind(record.error.as_deref())
            .bind(record.timestamp.timestamp_millis())
            .bind(record.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(AppError::storage_write)?;

        Ok(())
    }

    async fn get_attachment(
        &self,
        class: EntityClass,
        id: &RecordId,
    ) -> Result<Option<AttachmentRecord>, AppError> {
        let table = Self::attachment_table(class)?;
        let sql = format!("SELECT {ATTACHMENT_COLUMNS} FROM {table} WHERE id = ?1");

        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| attachment_from_row(class, row)).transpose()
    }

    async fn get_attachments_by_status(
        &self,
        class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<AttachmentRecord>, AppError> {
        let table = Self::attachment_table(class)?;
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM {table} WHERE status = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );

        let rows = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| attachment_from_row(class, row))
            .collect()
    }

    async fn get_attachments_by_parent(
        &self,
        class: EntityClass,
        parent_id: &str,
    ) -> Result<Vec<AttachmentRecord>, AppError> {
        let table = Self::attachment_table(class)?;
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM {table} WHERE parent_id = ?1 \
             ORDER BY created_at ASC, rowid ASC"
        );

        let rows = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| attachment_from_row(class, row))
            .collect()
    }

    async fn delete_attachment(
        &self,
        class: EntityClass,
        id: &RecordId,
    ) -> Result<bool, AppError> {
        let table = Self::attachment_table(class)?;
        let sql = format!("DELETE FROM {table} WHERE id = ?1");

        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(AppError::storage_write)?;

        Ok(result.rows_affected() > 0)
    }

    async fn contains(&self, class: EntityClass, id: &str) -> Result<bool, AppError> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", class.collection());

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn count_by_status(
        &self,
        class: EntityClass,
        status: RecordStatus,
    ) -> Result<u64, AppError> {
        let sql = format!(
            "SELECT COUNT(*) as count FROM {} WHERE status = ?1",
            class.collection()
        );

        let row = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn purge_synced_before(
        &self,
        class: EntityClass,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE status = ?1 AND updated_at <= ?2",
            class.collection()
        );

        let result = sqlx::query(&sql)
            .bind(RecordStatus::Synced.as_str())
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(AppError::storage_write)?;

        Ok(result.rows_affected())
    }

    async fn find_server_id(
        &self,
        class: EntityClass,
        id: &str,
    ) -> Result<Option<ServerId>, AppError> {
        let sql = format!(
            "SELECT server_id FROM {} WHERE id = ?1 AND server_id IS NOT NULL",
            class.collection()
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let server_id: Option<String> = row.try_get("server_id")?;
        Ok(server_id.and_then(|value| ServerId::new(value).ok()))
    }
}

#[async_trait]
impl NetworkStateStore for SqliteOfflineStore {
    async fn load_was_offline(&self) -> Result<Option<bool>, AppError> {
        let row = sqlx::query("SELECT value FROM network_state WHERE key = ?1")
            .bind(WAS_OFFLINE_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.try_get("value")?;
        Ok(Some(value == "true"))
    }

    async fn save_was_offline(&self, was_offline: bool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO network_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(WAS_OFFLINE_KEY)
        .bind(if was_offline { "true" } else { "false" })
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(AppError::storage_write)?;

        Ok(())
    }
}
