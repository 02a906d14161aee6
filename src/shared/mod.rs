pub mod config;
pub mod error;
pub mod metrics;

pub use config::{AppConfig, ReconciliationPolicy, SyncConfig};
pub use error::{AppError, Result};
