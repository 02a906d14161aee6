pub mod entities;
pub mod value_objects;

pub use entities::{AttachmentRecord, OperationRecord, SyncEvent, SyncReport};
pub use value_objects::{EntityClass, RecordId, RecordStatus, SyncAction};
