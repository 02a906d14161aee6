use super::mocks::{MockProbe, MockRemoteApi};
use fieldsync::application::services::OfflineServiceTrait;
use fieldsync::{
    AppState, Database, DbPool, EntityClass, NetworkMonitor, OfflineService, ReconciliationPolicy,
    RecordId, RecordStatus, SaveOfflineParams, SqliteOfflineStore, SyncAction, SyncConfig,
    SyncOrchestrator,
};
use serde_json::Value;
use std::sync::Arc;

pub struct TestEngine {
    pub pool: DbPool,
    pub store: Arc<SqliteOfflineStore>,
    pub remote: MockRemoteApi,
    pub probe: MockProbe,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub monitor: Arc<NetworkMonitor>,
    pub service: Arc<OfflineService>,
}

/// No background draining, no retry firing during a test, synced records
/// kept around long enough to inspect.
pub fn test_sync_config() -> SyncConfig {
    SyncConfig {
        auto_sync: false,
        max_retries: 3,
        retry_delay_ms: 60_000,
        synced_grace_ms: 60_000,
        reconciliation_policy: ReconciliationPolicy::DropReference,
    }
}

pub async fn setup_engine(sync: SyncConfig, online: bool) -> TestEngine {
    let pool = Database::in_memory().await.expect("in-memory sqlite");
    let store = Arc::new(SqliteOfflineStore::new(pool.clone()));
    setup_engine_with_store(pool, store, sync, online).await
}

pub async fn setup_engine_with_store(
    pool: DbPool,
    store: Arc<SqliteOfflineStore>,
    sync: SyncConfig,
    online: bool,
) -> TestEngine {
    let remote = MockRemoteApi::new();
    let probe = MockProbe::new(online);

    let state = AppState::with_components(
        store.clone(),
        store.clone(),
        Arc::new(remote.clone()),
        Arc::new(probe.clone()),
        sync,
    )
    .await;

    TestEngine {
        pool,
        store,
        remote,
        probe,
        orchestrator: state.orchestrator,
        monitor: state.network_monitor,
        service: state.offline_service,
    }
}

pub fn params(class: EntityClass, action: SyncAction, payload: Value) -> SaveOfflineParams {
    SaveOfflineParams::new(class, action, payload).expect("object payload")
}

impl TestEngine {
    pub async fn go_online(&self) {
        self.probe.set_online(true);
        self.service.set_online(true).await;
    }

    pub async fn queue(
        &self,
        class: EntityClass,
        action: SyncAction,
        id: Option<&str>,
        payload: Value,
    ) -> RecordId {
        let mut params = params(class, action, payload);
        if let Some(id) = id {
            params = params.with_id(id);
        }
        self.service.save_offline(params).await.expect("queued")
    }

    pub async fn records(&self, class: EntityClass, status: RecordStatus) -> Vec<fieldsync::OperationRecord> {
        self.service
            .list_records(class, status)
            .await
            .expect("list records")
    }
}
