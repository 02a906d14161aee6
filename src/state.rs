use crate::application::ports::{ConnectivityProbe, NetworkStateStore, OfflineStore, RemoteApi};
use crate::application::services::{NetworkMonitor, OfflineService, SyncOrchestrator};
use crate::infrastructure::{Database, DbPool, HttpConnectivityProbe, ReqwestRemoteApi, SqliteOfflineStore};
use crate::shared::config::{AppConfig, SyncConfig};
use anyhow::Context;
use std::sync::Arc;

/// Fully wired engine for one device.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: Option<DbPool>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub network_monitor: Arc<NetworkMonitor>,
    pub offline_service: Arc<OfflineService>,
}

impl AppState {
    /// SQLite store plus the HTTP client and probe described by `config`.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid configuration")?;

        let pool = Database::initialize(&config.database.url, config.database.max_connections)
            .await
            .context("failed to open offline store")?;
        let store = Arc::new(SqliteOfflineStore::new(pool.clone()));
        let remote: Arc<dyn RemoteApi> = Arc::new(ReqwestRemoteApi::new(&config.api)?);
        let probe: Arc<dyn ConnectivityProbe> = Arc::new(HttpConnectivityProbe::new(&config)?);

        let mut state = Self::with_components(
            store.clone(),
            store,
            remote,
            probe,
            config.sync.clone(),
        )
        .await;
        state.config = config;
        state.db_pool = Some(pool);
        Ok(state)
    }

    /// Wires the engine around caller-provided ports.
    pub async fn with_components(
        store: Arc<dyn OfflineStore>,
        network_store: Arc<dyn NetworkStateStore>,
        remote: Arc<dyn RemoteApi>,
        probe: Arc<dyn ConnectivityProbe>,
        sync: SyncConfig,
    ) -> Self {
        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&store),
            remote,
            sync.clone(),
        ));
        let network_monitor = NetworkMonitor::initialize(network_store, probe).await;
        let offline_service = OfflineService::new(
            store,
            Arc::clone(&orchestrator),
            Arc::clone(&network_monitor),
        );

        let config = AppConfig {
            sync,
            ..AppConfig::default()
        };

        Self {
            config,
            db_pool: None,
            orchestrator,
            network_monitor,
            offline_service,
        }
    }
}
