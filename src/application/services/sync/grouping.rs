use crate::domain::entities::{AttachmentRecord, OperationRecord};
use crate::domain::value_objects::RecordId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// What the grouping step needs to know about a queued record.
pub trait Replayable {
    fn record_id(&self) -> &RecordId;
    fn enqueued_at(&self) -> DateTime<Utc>;
    /// Id shared by a create and everything that depends on it.
    fn group_key(&self) -> Option<&RecordId>;
    fn mints_id(&self) -> bool;
}

impl Replayable for OperationRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn enqueued_at(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn group_key(&self) -> Option<&RecordId> {
        if self.action.is_create() {
            Some(&self.id)
        } else {
            self.depends_on.as_ref()
        }
    }

    fn mints_id(&self) -> bool {
        self.action.is_create()
    }
}

impl Replayable for AttachmentRecord {
    fn record_id(&self) -> &RecordId {
        &self.id
    }

    fn enqueued_at(&self) -> DateTime<Utc> {
        self.timestamp
    }

    // Uploads are independent of each other; parent resolution happens at send time.
    fn group_key(&self) -> Option<&RecordId> {
        None
    }

    fn mints_id(&self) -> bool {
        true
    }
}

/// Records replayed together, create first.
#[derive(Debug, Clone)]
pub struct ReplayUnit<T> {
    pub key: Option<RecordId>,
    pub records: Vec<T>,
}

impl<T: Replayable> ReplayUnit<T> {
    fn earliest(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(Replayable::enqueued_at).min()
    }

    pub fn has_create(&self) -> bool {
        self.records.iter().any(Replayable::mints_id)
    }
}

/// Splits a class's queue into replay units.
///
/// Records sharing a group key form one unit ordered create first, then by
/// enqueue time. Records without a key are units of their own. Units are
/// ordered by their earliest record so unrelated work stays FIFO. Both sorts
/// are stable, so ties keep the order the records were loaded in.
pub fn group_for_replay<T: Replayable>(records: Vec<T>) -> Vec<ReplayUnit<T>> {
    let mut keyed: HashMap<RecordId, usize> = HashMap::new();
    let mut units: Vec<ReplayUnit<T>> = Vec::new();

    for record in records {
        match record.group_key().cloned() {
            Some(key) => {
                if let Some(index) = keyed.get(&key) {
                    units[*index].records.push(record);
                } else {
                    keyed.insert(key.clone(), units.len());
                    units.push(ReplayUnit {
                        key: Some(key),
                        records: vec![record],
                    });
                }
            }
            None => units.push(ReplayUnit {
                key: None,
                records: vec![record],
            }),
        }
    }

    for unit in &mut units {
        unit.records.sort_by(|a, b| {
            b.mints_id()
                .cmp(&a.mints_id())
                .then_with(|| a.enqueued_at().cmp(&b.enqueued_at()))
        });
    }
    units.sort_by_key(|unit| unit.earliest());
    units
}
