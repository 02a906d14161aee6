pub mod network_monitor;
pub mod notification_bus;
pub mod offline_service;
pub mod sync;

pub use network_monitor::NetworkMonitor;
pub use notification_bus::{CallbackHandle, EventBus, Subscription};
pub use offline_service::{OfflineService, OfflineServiceTrait, SaveOfflineParams};
pub use sync::SyncOrchestrator;
