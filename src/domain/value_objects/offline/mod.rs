pub mod entity_class;
pub mod payload;
pub mod record_id;
pub mod record_status;
pub mod server_id;
pub mod sync_action;

pub use entity_class::EntityClass;
pub use payload::OfflinePayload;
pub use record_id::RecordId;
pub use record_status::RecordStatus;
pub use server_id::ServerId;
pub use sync_action::SyncAction;
