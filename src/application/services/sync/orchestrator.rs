use super::grouping::{group_for_replay, ReplayUnit};
use super::reconciliation::{IdMap, Reconciled, Reconciler};
use super::retry::RetryScheduler;
use super::strategy::{strategy_for, SyncStrategy};
use crate::application::ports::{
    OfflineStore, RemoteApi, RemoteRequest, RemoteResponse, UploadRequest,
};
use crate::application::services::notification_bus::{EventBus, Subscription};
use crate::domain::entities::{
    AttachmentRecord, OperationRecord, SyncEvent, SyncReport, ENTITY_ID_FIELD,
};
use crate::domain::value_objects::{EntityClass, RecordId, RecordStatus, ServerId};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use crate::shared::metrics::{SyncMetrics, SyncMetricsSnapshot};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

enum UploadOutcome {
    Synced,
    Failed(Failure),
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    terminal: bool,
    retryable: bool,
}

impl Failure {
    fn count(self, report: &mut SyncReport) {
        report.failed_count += 1;
        if self.terminal {
            report.terminal_count += 1;
        } else if self.retryable {
            report.retryable_count += 1;
        }
    }
}

struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Replays queued records against the remote API, one entity class at a time.
pub struct SyncOrchestrator {
    store: Arc<dyn OfflineStore>,
    remote: Arc<dyn RemoteApi>,
    reconciler: Reconciler,
    config: SyncConfig,
    in_flight: HashMap<EntityClass, AtomicBool>,
    retry: RetryScheduler,
    events: EventBus<SyncEvent>,
    metrics: SyncMetrics,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        remote: Arc<dyn RemoteApi>,
        config: SyncConfig,
    ) -> Self {
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::new(IdMap::new()),
            config.reconciliation_policy,
        );
        let in_flight = EntityClass::SYNC_ORDER
            .iter()
            .map(|class| (*class, AtomicBool::new(false)))
            .collect();

        Self {
            store,
            remote,
            reconciler,
            config,
            in_flight,
            retry: RetryScheduler::new(),
            events: EventBus::new(),
            metrics: SyncMetrics::new(),
        }
    }

    pub fn subscribe(&self) -> Subscription<SyncEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus<SyncEvent> {
        &self.events
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight
            .values()
            .any(|flag| flag.load(Ordering::Acquire))
    }

    pub fn retry_scheduled(&self) -> bool {
        self.retry.is_scheduled()
    }

    /// Drops a waiting retry; a pass that already started keeps running.
    pub fn cancel_retry(&self) -> bool {
        self.retry.cancel()
    }

    /// Server id minted for a temporary id during this process's lifetime.
    pub fn known_server_id(&self, temp: &str) -> Option<String> {
        self.reconciler.ids().get(temp)
    }

    fn try_begin(&self, class: EntityClass) -> Option<PassGuard<'_>> {
        let flag = self.in_flight.get(&class)?;
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(PassGuard { flag })
    }

    /// Every class in dependency order. A failing class does not stop the
    /// ones after it.
    pub async fn sync_all(self: &Arc<Self>) -> Vec<SyncReport> {
        let mut reports = Vec::with_capacity(EntityClass::SYNC_ORDER.len());
        for class in EntityClass::SYNC_ORDER {
            match self.sync_pending(class).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    tracing::error!(
                        target: "sync::orchestrator",
                        class = %class,
                        error = %err,
                        "sync pass aborted"
                    );
                }
            }
        }
        reports
    }

    /// One pass over `class`. Returns a skipped report when a pass for the
    /// class is already running.
    pub async fn sync_pending(self: &Arc<Self>, class: EntityClass) -> Result<SyncReport, AppError> {
        let Some(_guard) = self.try_begin(class) else {
            tracing::debug!(
                target: "sync::orchestrator",
                class = %class,
                "pass already in progress; skipped"
            );
            return Ok(SyncReport::skipped(class));
        };

        self.metrics.record_pass();
        self.purge_expired(class).await;

        let report = if class.is_attachment() {
            self.replay_attachments(class).await?
        } else {
            self.replay_operations(class).await?
        };

        if report.synced_count > 0 {
            self.events.publish(SyncEvent::Completed {
                entity_class: class,
                success_count: report.synced_count,
            });
        }
        if report.retryable_failures() > 0 {
            self.schedule_retry();
        }

        if report.synced_count + report.failed_count + report.deferred_count > 0 {
            tracing::info!(
                target: "sync::orchestrator",
                class = %class,
                synced = report.synced_count,
                failed = report.failed_count,
                terminal = report.terminal_count,
                deferred = report.deferred_count,
                "sync pass finished"
            );
        }

        Ok(report)
    }

    fn schedule_retry(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.retry.schedule(self.config.retry_delay(), async move {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.sync_all().await;
            }
        });
    }

    async fn purge_expired(&self, class: EntityClass) {
        let grace = chrono::Duration::milliseconds(self.config.synced_grace_ms as i64);
        match self.store.purge_synced_before(class, Utc::now() - grace).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(
                target: "sync::orchestrator",
                class = %class,
                purged,
                "removed expired synced records"
            ),
            Err(err) => tracing::warn!(
                target: "sync::orchestrator",
                class = %class,
                error = %err,
                "failed to purge synced records"
            ),
        }
    }

    async fn load_operations(&self, class: EntityClass) -> Result<Vec<OperationRecord>, AppError> {
        let max_retries = self.config.max_retries;
        let mut records = self.store.get_all_by_status(class, RecordStatus::Pending).await?;
        let failed = self.store.get_all_by_status(class, RecordStatus::Failed).await?;
        records.extend(failed.into_iter().filter(|r| r.is_replayable(max_retries)));
        Ok(records)
    }

    async fn load_attachments(&self, class: EntityClass) -> Result<Vec<AttachmentRecord>, AppError> {
        let max_retries = self.config.max_retries;
        let mut records = self
            .store
            .get_attachments_by_status(class, RecordStatus::Pending)
            .await?;
        let failed = self
            .store
            .get_attachments_by_status(class, RecordStatus::Failed)
            .await?;
        records.extend(failed.into_iter().filter(|r| r.is_replayable(max_retries)));
        Ok(records)
    }

    async fn replay_operations(&self, class: EntityClass) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::new(class);
        let records = self.load_operations(class).await?;
        if records.is_empty() {
            return Ok(report);
        }

        let strategy = strategy_for(class);
        for unit in group_for_replay(records) {
            self.replay_unit(strategy, unit, &mut report).await;
        }
        Ok(report)
    }

    /// Replays one dependency group in order. Once the group's create fails
    /// or cannot be sent, the rest of the group stays pending.
    async fn replay_unit(
        &self,
        strategy: &SyncStrategy,
        unit: ReplayUnit<OperationRecord>,
        report: &mut SyncReport,
    ) {
        let context = if unit.has_create() && unit.records.len() > 1 {
            self.fetch_context(strategy, &unit.records).await
        } else {
            None
        };

        let mut held_back: Option<String> = None;
        for mut record in unit.records {
            if let Some(reason) = &held_back {
                report.deferred_count += 1;
                tracing::debug!(
                    target: "sync::orchestrator",
                    record_id = %record.id,
                    reason = %reason,
                    "dependent left pending"
                );
                continue;
            }

            let is_create = record.action.is_create();
            match self.reconciler.reconcile_operation(&mut record).await {
                Ok(Reconciled::Ready { .. }) => {}
                Ok(Reconciled::Deferred(reason)) => {
                    report.deferred_count += 1;
                    tracing::debug!(
                        target: "sync::orchestrator",
                        record_id = %record.id,
                        reason = %reason,
                        "record deferred"
                    );
                    if is_create {
                        held_back = Some(reason);
                    }
                    continue;
                }
                Ok(Reconciled::Blocked(gaps)) => {
                    report.deferred_count += 1;
                    self.persist(&record).await;
                    if is_create {
                        held_back = Some(format!("create {} blocked on {:?}", record.id, gaps));
                    }
                    continue;
                }
                Err(err) => {
                    report.deferred_count += 1;
                    tracing::warn!(
                        target: "sync::reconcile",
                        record_id = %record.id,
                        error = %err,
                        "could not reconcile references"
                    );
                    if is_create {
                        held_back = Some(err.to_string());
                    }
                    continue;
                }
            }

            if !is_create {
                if let (Some(context), Some(spec)) = (&context, strategy.context) {
                    record.payload.merge_missing(context, spec.fields);
                }
            }

            match self.send_operation(strategy, &record).await {
                Ok(response) => {
                    self.complete_operation(&mut record, response).await;
                    report.synced_count += 1;
                }
                Err(err) => {
                    self.fail_operation(&mut record, &err).await.count(report);
                    if is_create {
                        held_back = Some(format!("create {} failed", record.id));
                    }
                }
            }
        }
    }

    /// Canonical server fields for the group, fetched once.
    async fn fetch_context(
        &self,
        strategy: &SyncStrategy,
        records: &[OperationRecord],
    ) -> Option<Value> {
        let spec = strategy.context?;
        let reference = records
            .iter()
            .find_map(|record| record.payload.get_str(spec.reference_field))?
            .to_string();

        let id = match strategy.parent {
            Some(parent) if parent.field == spec.reference_field => self
                .reconciler
                .resolve_reference(parent.class, &reference)
                .await
                .ok()
                .flatten()?,
            _ => reference,
        };

        match self.remote.fetch_context(&spec.path(&id)).await {
            Ok(context) => Some(context),
            Err(err) => {
                tracing::warn!(
                    target: "sync::orchestrator",
                    class = %strategy.entity_class,
                    resource = spec.resource,
                    error = %err,
                    "context fetch failed; replaying without it"
                );
                None
            }
        }
    }

    async fn send_operation(
        &self,
        strategy: &SyncStrategy,
        record: &OperationRecord,
    ) -> Result<RemoteResponse, AppError> {
        let route = strategy.route(record.action, record.target_id())?;
        let mut body = record.payload.clone();
        if record.action.is_create() {
            // The server assigns the id; the temporary one never leaves the device.
            body.remove(ENTITY_ID_FIELD);
        }

        self.remote
            .send(RemoteRequest {
                entity_class: record.entity_class,
                action: record.action,
                route,
                body: body.into_inner(),
            })
            .await
    }

    async fn complete_operation(&self, record: &mut OperationRecord, response: RemoteResponse) {
        if record.action.is_create() {
            match response.id.as_deref() {
                Some(server_id) => self.reconciler.ids().insert(&record.id, server_id),
                None => tracing::warn!(
                    target: "sync::orchestrator",
                    record_id = %record.id,
                    "create returned no id; dependents cannot be reconciled"
                ),
            }
        }

        let server_id = response.id.and_then(|id| ServerId::new(id).ok());
        record.mark_synced(server_id);
        self.persist(record).await;
        self.metrics.record_synced();
        self.schedule_deletion(record.entity_class, record.id.clone());

        tracing::debug!(
            target: "sync::orchestrator",
            class = %record.entity_class,
            record_id = %record.id,
            action = %record.action,
            "record synced"
        );
    }

    async fn fail_operation(&self, record: &mut OperationRecord, err: &AppError) -> Failure {
        record.mark_failed(err.to_string());
        self.persist(record).await;
        self.note_failure(record.entity_class, &record.id, record.retry_count, err)
    }

    async fn replay_attachments(&self, class: EntityClass) -> Result<SyncReport, AppError> {
        let mut report = SyncReport::new(class);
        let records = self.load_attachments(class).await?;
        if records.is_empty() {
            return Ok(report);
        }

        let strategy = strategy_for(class);
        for unit in group_for_replay(records) {
            for record in unit.records {
                match self.upload_attachment(strategy, record).await {
                    UploadOutcome::Synced => report.synced_count += 1,
                    UploadOutcome::Failed(failure) => failure.count(&mut report),
                }
            }
        }
        Ok(report)
    }

    async fn upload_attachment(
        &self,
        strategy: &SyncStrategy,
        mut record: AttachmentRecord,
    ) -> UploadOutcome {
        let parent_id = match self.reconciler.attachment_parent(&record).await {
            Ok(parent_id) => parent_id,
            Err(err) => {
                tracing::warn!(
                    target: "sync::reconcile",
                    record_id = %record.id,
                    error = %err,
                    "could not resolve attachment owner"
                );
                None
            }
        };

        let request = UploadRequest {
            entity_class: record.entity_class,
            route: strategy.upload_route(),
            parent_id,
            file_name: record.file_name.clone(),
            mime_type: record.mime_type.clone(),
            // Stored bytes are never rewritten by an upsert.
            data: std::mem::take(&mut record.data),
        };

        let outcome = self
            .remote
            .upload(request)
            .await
            .and_then(|id| ServerId::new(id).map_err(AppError::SyncFailed));

        match outcome {
            Ok(server_id) => {
                self.reconciler.ids().insert(&record.id, server_id.as_str());
                record.mark_synced(server_id);
                self.persist_attachment(&record).await;
                self.metrics.record_synced();
                self.schedule_attachment_deletion(record.entity_class, record.id.clone());
                UploadOutcome::Synced
            }
            Err(err) => {
                record.mark_failed(err.to_string());
                self.persist_attachment(&record).await;
                UploadOutcome::Failed(self.note_failure(
                    record.entity_class,
                    &record.id,
                    record.retry_count,
                    &err,
                ))
            }
        }
    }

    /// Logs, counts and, at the cap, announces a failed attempt. Errors that
    /// another attempt cannot fix do not arm the retry timer; the record
    /// still goes out again on the next pass.
    fn note_failure(
        &self,
        class: EntityClass,
        id: &RecordId,
        retry_count: u32,
        err: &AppError,
    ) -> Failure {
        let terminal = retry_count >= self.config.max_retries;
        let retryable = err.is_retryable();
        self.metrics.record_failed(terminal);

        if terminal {
            let exhausted = AppError::MaxRetriesExceeded {
                record_id: id.to_string(),
                retry_count,
            };
            tracing::error!(
                target: "sync::orchestrator",
                class = %class,
                error = %exhausted,
                last_error = %err,
                "record will not be retried automatically"
            );
            self.events.publish(SyncEvent::TerminalFailure {
                entity_class: class,
                record_id: id.clone(),
                retry_count,
                error: err.to_string(),
            });
        } else {
            tracing::warn!(
                target: "sync::orchestrator",
                class = %class,
                record_id = %id,
                retry_count,
                retryable,
                error = %err,
                "record replay failed"
            );
        }
        Failure {
            terminal,
            retryable,
        }
    }

    async fn persist(&self, record: &OperationRecord) {
        if let Err(err) = self.store.put(record).await {
            tracing::error!(
                target: "sync::orchestrator",
                record_id = %record.id,
                error = %err,
                "failed to persist record state"
            );
        }
    }

    async fn persist_attachment(&self, record: &AttachmentRecord) {
        if let Err(err) = self.store.put_attachment(record).await {
            tracing::error!(
                target: "sync::orchestrator",
                record_id = %record.id,
                error = %err,
                "failed to persist attachment state"
            );
        }
    }

    fn schedule_deletion(&self, class: EntityClass, id: RecordId) {
        let store = Arc::clone(&self.store);
        let grace = self.config.synced_grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(err) = store.delete(class, &id).await {
                tracing::warn!(
                    target: "sync::orchestrator",
                    record_id = %id,
                    error = %err,
                    "failed to delete synced record"
                );
            }
        });
    }

    fn schedule_attachment_deletion(&self, class: EntityClass, id: RecordId) {
        let store = Arc::clone(&self.store);
        let grace = self.config.synced_grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(err) = store.delete_attachment(class, &id).await {
                tracing::warn!(
                    target: "sync::orchestrator",
                    record_id = %id,
                    error = %err,
                    "failed to delete synced attachment"
                );
            }
        });
    }
}
