pub mod connectivity_probe;
pub mod remote_api;

pub use connectivity_probe::HttpConnectivityProbe;
pub use remote_api::ReqwestRemoteApi;
