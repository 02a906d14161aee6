pub mod ports;
pub mod services;

pub use services::{NetworkMonitor, OfflineService, OfflineServiceTrait, SyncOrchestrator};
