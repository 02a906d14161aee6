pub mod network_state;
pub mod offline;

pub use network_state::NetworkState;
pub use offline::{
    EntityClass, OfflinePayload, RecordId, RecordStatus, ServerId, SyncAction,
};
