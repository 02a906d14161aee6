use super::strategy::strategy_for;
use crate::application::ports::OfflineStore;
use crate::domain::entities::{AttachmentRecord, OperationRecord, ENTITY_ID_FIELD};
use crate::domain::value_objects::{EntityClass, RecordId};
use crate::shared::config::ReconciliationPolicy;
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Temporary id to server id, shared by every pass of one engine.
#[derive(Debug, Default)]
pub struct IdMap {
    inner: RwLock<HashMap<String, String>>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, temp: &RecordId, server_id: &str) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(temp.as_str().to_string(), server_id.to_string());
    }

    pub fn get(&self, temp: &str) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(temp).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of preparing a record for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// References rewritten; the record can be sent.
    Ready { dropped: Vec<String> },
    /// A create this record needs has not been synced yet.
    Deferred(String),
    /// Unresolved list references under `ReconciliationPolicy::BlockRecord`.
    Blocked(Vec<String>),
}

enum Resolution {
    Server(String),
    /// A local record that has no server id yet.
    Unsynced,
    /// Not a local record; already a server id.
    Foreign,
}

pub struct Reconciler {
    store: Arc<dyn OfflineStore>,
    ids: Arc<IdMap>,
    policy: ReconciliationPolicy,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        ids: Arc<IdMap>,
        policy: ReconciliationPolicy,
    ) -> Self {
        Self { store, ids, policy }
    }

    pub fn ids(&self) -> &Arc<IdMap> {
        &self.ids
    }

    /// Server id for a temporary id: the id map first, then a synced record
    /// that has not been deleted yet.
    pub async fn resolve(&self, class: EntityClass, id: &str) -> Result<Option<String>, AppError> {
        if let Some(server_id) = self.ids.get(id) {
            return Ok(Some(server_id));
        }

        if let Some(server_id) = self.store.find_server_id(class, id).await? {
            if let Ok(temp) = RecordId::parse(id) {
                self.ids.insert(&temp, server_id.as_str());
            }
            return Ok(Some(server_id.into()));
        }

        Ok(None)
    }

    async fn classify(&self, class: EntityClass, id: &str) -> Result<Resolution, AppError> {
        if let Some(server_id) = self.resolve(class, id).await? {
            return Ok(Resolution::Server(server_id));
        }
        if self.store.contains(class, id).await? {
            Ok(Resolution::Unsynced)
        } else {
            Ok(Resolution::Foreign)
        }
    }

    /// Id usable against the server, or `None` while it is still temporary.
    pub async fn resolve_reference(
        &self,
        class: EntityClass,
        id: &str,
    ) -> Result<Option<String>, AppError> {
        Ok(match self.classify(class, id).await? {
            Resolution::Server(server_id) => Some(server_id),
            Resolution::Foreign => Some(id.to_string()),
            Resolution::Unsynced => None,
        })
    }

    /// Rewrites the target id, parent id and reference lists of `record`
    /// in place.
    pub async fn reconcile_operation(
        &self,
        record: &mut OperationRecord,
    ) -> Result<Reconciled, AppError> {
        let strategy = strategy_for(record.entity_class);

        if !record.action.is_create() {
            if let Some(temp) = record.depends_on.clone() {
                // A record waits either on its own create or on its parent's.
                let targets_dependency = record.target_id() == Some(temp.as_str());
                let class = match strategy.parent {
                    Some(parent) if !targets_dependency => parent.class,
                    _ => record.entity_class,
                };
                match self.classify(class, temp.as_str()).await? {
                    Resolution::Server(server_id) => {
                        if targets_dependency {
                            record.payload.set_str(ENTITY_ID_FIELD, &server_id);
                        }
                    }
                    Resolution::Unsynced => {
                        return Ok(Reconciled::Deferred(format!(
                            "{class} create {temp} has not been synced"
                        )));
                    }
                    Resolution::Foreign => {
                        tracing::warn!(
                            target: "sync::reconcile",
                            record_id = %record.id,
                            depends_on = %temp,
                            "dependency is no longer queued; replaying as-is"
                        );
                    }
                }
            }
        }

        if let Some(parent) = strategy.parent {
            if let Some(value) = record.payload.get_str(parent.field).map(str::to_string) {
                match self.classify(parent.class, &value).await? {
                    Resolution::Server(server_id) => {
                        record.payload.set_str(parent.field, &server_id);
                        record.parent_id = Some(server_id);
                    }
                    Resolution::Unsynced => {
                        return Ok(Reconciled::Deferred(format!(
                            "{} {value} has not been synced",
                            parent.class
                        )));
                    }
                    Resolution::Foreign => {}
                }
            }
        }

        // Everything this record waited on now has a server id.
        record.depends_on = None;

        let mut gaps = Vec::new();
        let mut rewrites = Vec::new();
        for list in strategy.reference_lists {
            let Some(values) = record.payload.string_list(list.field) else {
                continue;
            };

            let mut rewritten: Vec<String> = Vec::with_capacity(values.len());
            for value in values {
                let resolved = match self.classify(list.class, &value).await? {
                    Resolution::Server(server_id) => Some(server_id),
                    Resolution::Foreign => Some(value),
                    Resolution::Unsynced => {
                        gaps.push(value);
                        None
                    }
                };
                if let Some(id) = resolved {
                    if !rewritten.contains(&id) {
                        rewritten.push(id);
                    }
                }
            }
            rewrites.push((list.field, rewritten));
        }

        if !gaps.is_empty() {
            let gap = AppError::ReconciliationGap(format!(
                "{} record {} references unsynced ids {:?}",
                record.entity_class, record.id, gaps
            ));
            match self.policy {
                ReconciliationPolicy::BlockRecord => {
                    tracing::warn!(
                        target: "sync::reconcile",
                        record_id = %record.id,
                        error = %gap,
                        "record held back until references resolve"
                    );
                    return Ok(Reconciled::Blocked(gaps));
                }
                ReconciliationPolicy::DropReference => {
                    tracing::warn!(
                        target: "sync::reconcile",
                        record_id = %record.id,
                        error = %gap,
                        "dropping unresolved references"
                    );
                }
            }
        }

        for (field, values) in rewrites {
            record.payload.set_string_list(field, &values);
        }

        Ok(Reconciled::Ready { dropped: gaps })
    }

    /// Server id of an attachment's owner, if it has one yet.
    pub async fn attachment_parent(
        &self,
        record: &AttachmentRecord,
    ) -> Result<Option<String>, AppError> {
        let Some(parent) = strategy_for(record.entity_class).parent else {
            return Ok(None);
        };
        let resolved = self
            .resolve_reference(parent.class, &record.parent_entity_id)
            .await?;
        if resolved.is_none() {
            tracing::debug!(
                target: "sync::reconcile",
                record_id = %record.id,
                parent = %record.parent_entity_id,
                "uploading without parent id; owner not synced yet"
            );
        }
        Ok(resolved)
    }
}
