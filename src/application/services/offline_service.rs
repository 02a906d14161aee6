use crate::application::ports::OfflineStore;
use crate::application::services::network_monitor::NetworkMonitor;
use crate::application::services::notification_bus::{CallbackHandle, EventBus, Subscription};
use crate::application::services::sync::{strategy_for, SyncOrchestrator};
use crate::domain::entities::{
    AttachmentDraft, AttachmentRecord, NetworkTransition, OperationRecord, StatusEvent, SyncEvent,
    SyncReport, ENTITY_ID_FIELD,
};
use crate::domain::value_objects::{
    EntityClass, OfflinePayload, RecordId, RecordStatus, SyncAction,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct SaveOfflineParams {
    pub entity_class: EntityClass,
    pub action: SyncAction,
    pub payload: OfflinePayload,
    /// Temporary id for a create, or the target entity for other actions.
    pub id: Option<String>,
}

impl SaveOfflineParams {
    pub fn new(entity_class: EntityClass, action: SyncAction, payload: Value) -> Result<Self, AppError> {
        Ok(Self {
            entity_class,
            action,
            payload: OfflinePayload::new(payload).map_err(AppError::ValidationError)?,
            id: None,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[async_trait]
pub trait OfflineServiceTrait: Send + Sync {
    async fn save_offline(&self, params: SaveOfflineParams) -> Result<RecordId, AppError>;
    async fn save_attachment(
        &self,
        entity_class: EntityClass,
        draft: AttachmentDraft,
    ) -> Result<RecordId, AppError>;
    async fn sync_now(&self) -> Result<Vec<SyncReport>, AppError>;
    async fn pending_count(&self) -> Result<u64, AppError>;
    async fn list_records(
        &self,
        entity_class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<OperationRecord>, AppError>;
    async fn list_attachments(
        &self,
        entity_class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<AttachmentRecord>, AppError>;
    async fn retry_failed(&self, entity_class: EntityClass) -> Result<u32, AppError>;
    async fn set_online(&self, online: bool) -> Option<NetworkTransition>;
    fn subscribe_to_completion(&self) -> Subscription<SyncEvent>;
    fn subscribe_to_status(&self) -> Subscription<StatusEvent>;
}

/// Entry point for hosts: queues actions while offline and drains the queue
/// when connectivity returns.
pub struct OfflineService {
    this: Weak<Self>,
    store: Arc<dyn OfflineStore>,
    orchestrator: Arc<SyncOrchestrator>,
    monitor: Arc<NetworkMonitor>,
    status: EventBus<StatusEvent>,
}

impl OfflineService {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        orchestrator: Arc<SyncOrchestrator>,
        monitor: Arc<NetworkMonitor>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            store,
            orchestrator,
            monitor,
            status: EventBus::new(),
        })
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    /// Reacts to network transitions until the service is dropped. Drains
    /// the queue right away when already online.
    pub fn start(&self) -> JoinHandle<()> {
        let mut transitions = self.monitor.subscribe();
        let this = self.this.clone();

        tokio::spawn(async move {
            if let Some(service) = this.upgrade() {
                if service.monitor.is_online().await && service.orchestrator.config().auto_sync {
                    service.drain().await;
                }
            }

            while let Some(transition) = transitions.recv().await {
                let Some(service) = this.upgrade() else {
                    break;
                };
                service.handle_transition(transition).await;
            }
            tracing::debug!(target: "offline::service", "transition listener stopped");
        })
    }

    /// Polls the connectivity probe in the background.
    pub fn watch_connectivity(&self, interval: Duration) -> JoinHandle<()> {
        self.monitor.watch(interval)
    }

    pub fn on_completion<F, Fut>(&self, callback: F) -> CallbackHandle
    where
        F: FnMut(SyncEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.orchestrator.events().subscribe_with(callback)
    }

    pub async fn status(&self) -> Result<StatusEvent, AppError> {
        Ok(StatusEvent {
            network: self.monitor.current().await,
            syncing: self.orchestrator.is_syncing(),
            pending_count: self.pending_count().await?,
        })
    }

    async fn handle_transition(&self, transition: NetworkTransition) {
        match transition {
            NetworkTransition::BecameOnline => {
                self.publish_status().await;
                if self.orchestrator.config().auto_sync {
                    self.drain().await;
                }
            }
            NetworkTransition::WentOffline => {
                if self.orchestrator.cancel_retry() {
                    tracing::info!(target: "offline::service", "went offline; pending retry dropped");
                }
                self.publish_status().await;
            }
        }
    }

    async fn drain(&self) -> Vec<SyncReport> {
        self.publish_status().await;
        let reports = self.orchestrator.sync_all().await;
        self.publish_status().await;
        reports
    }

    async fn publish_status(&self) {
        match self.status().await {
            Ok(status) => {
                self.status.publish(status);
            }
            Err(err) => tracing::warn!(
                target: "offline::service",
                error = %err,
                "could not compute sync status"
            ),
        }
    }

    /// Starts a background drain when online and auto sync is enabled.
    async fn after_enqueue(&self) {
        self.publish_status().await;

        if !self.orchestrator.config().auto_sync || !self.monitor.is_online().await {
            return;
        }
        let Some(service) = self.this.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            service.drain().await;
        });
    }

    /// Resolves `id` in `class` for storage on a new record. A synced local
    /// record yields its server id; a local record still in the queue
    /// yields itself plus a dependency on it.
    async fn link_local(
        &self,
        class: EntityClass,
        id: &str,
    ) -> Result<(String, Option<RecordId>), AppError> {
        if let Some(server_id) = self.orchestrator.known_server_id(id) {
            return Ok((server_id, None));
        }
        if let Some(server_id) = self.store.find_server_id(class, id).await? {
            return Ok((server_id.into(), None));
        }
        if self.store.contains(class, id).await? {
            return Ok((id.to_string(), RecordId::parse(id).ok()));
        }
        Ok((id.to_string(), None))
    }
}

#[async_trait]
impl OfflineServiceTrait for OfflineService {
    async fn save_offline(&self, params: SaveOfflineParams) -> Result<RecordId, AppError> {
        let SaveOfflineParams {
            entity_class,
            action,
            mut payload,
            id,
        } = params;

        if entity_class.is_attachment() {
            return Err(AppError::ValidationError(format!(
                "{entity_class} records are queued with save_attachment"
            )));
        }
        let strategy = strategy_for(entity_class);
        strategy.ensure_supported(action)?;

        let mut depends_on = None;
        let record_id = if action.is_create() {
            let record_id = match id {
                Some(id) => RecordId::new(id).map_err(AppError::ValidationError)?,
                None => RecordId::generate(),
            };
            payload.set_str(ENTITY_ID_FIELD, record_id.as_str());
            record_id
        } else {
            if action.targets_entity() {
                let target = id
                    .or_else(|| payload.get_str(ENTITY_ID_FIELD).map(str::to_string))
                    .filter(|target| !target.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::ValidationError(format!(
                            "{entity_class} {action} requires an entity id"
                        ))
                    })?;
                let (resolved, dependency) = self.link_local(entity_class, &target).await?;
                payload.set_str(ENTITY_ID_FIELD, &resolved);
                depends_on = dependency;
            }
            RecordId::generate()
        };

        let mut parent_id = None;
        if let Some(parent) = strategy.parent {
            if let Some(value) = payload.get_str(parent.field).map(str::to_string) {
                let (resolved, dependency) = self.link_local(parent.class, &value).await?;
                payload.set_str(parent.field, &resolved);
                parent_id = Some(resolved);
                if depends_on.is_none() {
                    depends_on = dependency;
                }
            }
        }

        let record =
            OperationRecord::new_pending(record_id.clone(), entity_class, action, payload, depends_on)
                .with_parent(parent_id);
        self.store.put(&record).await?;

        tracing::info!(
            target: "offline::service",
            class = %entity_class,
            action = %action,
            record_id = %record_id,
            depends_on = ?record.depends_on.as_ref().map(RecordId::as_str),
            "action queued"
        );

        self.after_enqueue().await;
        Ok(record_id)
    }

    async fn save_attachment(
        &self,
        entity_class: EntityClass,
        mut draft: AttachmentDraft,
    ) -> Result<RecordId, AppError> {
        if !entity_class.is_attachment() {
            return Err(AppError::ValidationError(format!(
                "{entity_class} does not hold attachments"
            )));
        }
        if draft.file_name.trim().is_empty() {
            return Err(AppError::ValidationError("file_name is required".to_string()));
        }
        if draft.parent_entity_id.trim().is_empty() {
            return Err(AppError::ValidationError(
                "parent_entity_id is required".to_string(),
            ));
        }

        let mut depends_on = None;
        if let Some(parent) = strategy_for(entity_class).parent {
            let (resolved, dependency) = self.link_local(parent.class, &draft.parent_entity_id).await?;
            draft.parent_entity_id = resolved;
            depends_on = dependency;
        }

        let record = AttachmentRecord::new_pending(RecordId::generate(), entity_class, draft, depends_on);
        self.store.put_attachment(&record).await?;

        tracing::info!(
            target: "offline::service",
            class = %entity_class,
            record_id = %record.id,
            bytes = record.data.len(),
            "attachment queued"
        );

        self.after_enqueue().await;
        Ok(record.id)
    }

    async fn sync_now(&self) -> Result<Vec<SyncReport>, AppError> {
        if !self.monitor.is_online().await {
            return Err(AppError::Network("Device is offline".to_string()));
        }
        Ok(self.drain().await)
    }

    /// Records not yet synced: pending, plus failed ones awaiting a retry.
    async fn pending_count(&self) -> Result<u64, AppError> {
        let mut total = 0;
        for class in EntityClass::SYNC_ORDER {
            total += self.store.count_by_status(class, RecordStatus::Pending).await?;
            total += self.store.count_by_status(class, RecordStatus::Failed).await?;
        }
        Ok(total)
    }

    async fn list_records(
        &self,
        entity_class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<OperationRecord>, AppError> {
        self.store.get_all_by_status(entity_class, status).await
    }

    async fn list_attachments(
        &self,
        entity_class: EntityClass,
        status: RecordStatus,
    ) -> Result<Vec<AttachmentRecord>, AppError> {
        self.store.get_attachments_by_status(entity_class, status).await
    }

    async fn retry_failed(&self, entity_class: EntityClass) -> Result<u32, AppError> {
        let max_retries = self.orchestrator.config().max_retries;
        let mut requeued = 0;

        if entity_class.is_attachment() {
            let failed = self
                .store
                .get_attachments_by_status(entity_class, RecordStatus::Failed)
                .await?;
            for mut record in failed.into_iter().filter(|r| r.is_terminal(max_retries)) {
                record.reset_for_retry();
                self.store.put_attachment(&record).await?;
                requeued += 1;
            }
        } else {
            let failed = self
                .store
                .get_all_by_status(entity_class, RecordStatus::Failed)
                .await?;
            for mut record in failed.into_iter().filter(|r| r.is_terminal(max_retries)) {
                record.reset_for_retry();
                self.store.put(&record).await?;
                requeued += 1;
            }
        }

        if requeued > 0 {
            tracing::info!(
                target: "offline::service",
                class = %entity_class,
                requeued,
                "terminal records requeued"
            );
            self.after_enqueue().await;
        }
        Ok(requeued)
    }

    async fn set_online(&self, online: bool) -> Option<NetworkTransition> {
        self.monitor.observe(online).await
    }

    fn subscribe_to_completion(&self) -> Subscription<SyncEvent> {
        self.orchestrator.subscribe()
    }

    fn subscribe_to_status(&self) -> Subscription<StatusEvent> {
        self.status.subscribe()
    }
}
