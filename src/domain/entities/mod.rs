pub mod offline;
pub mod sync_event;

pub use offline::{
    AttachmentDraft, AttachmentRecord, ENTITY_ID_FIELD, OperationRecord, SyncReport,
};
pub use sync_event::{NetworkTransition, StatusEvent, SyncEvent};
