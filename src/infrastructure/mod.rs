pub mod database;
pub mod http;
pub mod offline;

pub use database::{Database, DbPool};
pub use http::{HttpConnectivityProbe, ReqwestRemoteApi};
pub use offline::SqliteOfflineStore;
