pub mod attachment_record;
pub mod operation_record;
pub mod sync_report;

pub use attachment_record::{AttachmentDraft, AttachmentRecord};
pub use operation_record::{ENTITY_ID_FIELD, OperationRecord};
pub use sync_report::SyncReport;
