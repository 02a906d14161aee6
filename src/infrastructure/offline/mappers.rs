use super::rows::{AttachmentRow, OperationRow};
use crate::domain::entities::{AttachmentRecord, OperationRecord};
use crate::domain::value_objects::{
    EntityClass, OfflinePayload, RecordId, RecordStatus, ServerId, SyncAction,
};
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};
use std::str::FromStr;

pub fn operation_from_row(
    class: EntityClass,
    row: OperationRow,
) -> Result<OperationRecord, AppError> {
    Ok(OperationRecord {
        id: parse_record_id(&row.id)?,
        entity_class: class,
        action: SyncAction::from_str(&row.action).map_err(AppError::DeserializationError)?,
        payload: OfflinePayload::from_json_str(&row.payload)
            .map_err(AppError::DeserializationError)?,
        parent_id: row.parent_id,
        status: parse_status(&row.status)?,
        retry_count: retry_count_from_db(row.retry_count),
        depends_on: row.depends_on.as_deref().map(parse_record_id).transpose()?,
        server_id: row.server_id.and_then(|id| ServerId::new(id).ok()),
        error: row.error_message,
        timestamp: millis_to_datetime(row.created_at),
        updated_at: millis_to_datetime(row.updated_at),
    })
}

pub fn attachment_from_row(
    class: EntityClass,
    row: AttachmentRow,
) -> Result<AttachmentRecord, AppError> {
    Ok(AttachmentRecord {
        id: parse_record_id(&row.id)?,
        entity_class: class,
        parent_entity_id: row.parent_id,
        file_name: row.file_name,
        mime_type: row.mime_type,
        data: row.data,
        status: parse_status(&row.status)?,
        retry_count: retry_count_from_db(row.retry_count),
        depends_on: row.depends_on.as_deref().map(parse_record_id).transpose()?,
        server_id: row.server_id.and_then(|id| ServerId::new(id).ok()),
        error: row.error_message,
        timestamp: millis_to_datetime(row.created_at),
        updated_at: millis_to_datetime(row.updated_at),
    })
}

pub fn payload_to_db(payload: &OfflinePayload) -> Result<String, AppError> {
    serde_json::to_string(payload.as_json())
        .map_err(|err| AppError::SerializationError(err.to_string()))
}

pub fn millis_to_datetime(value: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(value)
        .single()
        .unwrap_or_else(Utc::now)
}

fn parse_record_id(value: &str) -> Result<RecordId, AppError> {
    RecordId::parse(value).map_err(AppError::DeserializationError)
}

fn parse_status(value: &str) -> Result<RecordStatus, AppError> {
    RecordStatus::from_str(value).map_err(AppError::DeserializationError)
}

fn retry_count_from_db(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
