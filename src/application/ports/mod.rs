pub mod connectivity;
pub mod network_state_store;
pub mod offline_store;
pub mod remote_api;

pub use connectivity::ConnectivityProbe;
pub use network_state_store::NetworkStateStore;
pub use offline_store::OfflineStore;
pub use remote_api::{
    RemoteApi, RemoteMethod, RemoteRequest, RemoteResponse, RemoteRoute, UploadRequest,
};
