pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{ConnectivityProbe, NetworkStateStore, OfflineStore, RemoteApi};
pub use application::services::{
    NetworkMonitor, OfflineService, OfflineServiceTrait, SaveOfflineParams, SyncOrchestrator,
};
pub use domain::entities::{
    AttachmentDraft, AttachmentRecord, NetworkTransition, OperationRecord, StatusEvent, SyncEvent,
    SyncReport,
};
pub use domain::value_objects::{
    EntityClass, NetworkState, OfflinePayload, RecordId, RecordStatus, ServerId, SyncAction,
};
pub use infrastructure::{Database, DbPool, SqliteOfflineStore};
pub use shared::{AppConfig, AppError, ReconciliationPolicy, SyncConfig};
pub use state::AppState;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldsync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if let Err(err) = installed {
        tracing::debug!(error = %err, "tracing subscriber already installed; keeping it");
    }
}
