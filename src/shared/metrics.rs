use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

const NEVER: i64 = 0;

/// Process-lifetime replay counters of one orchestrator.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    passes: AtomicU64,
    synced: AtomicU64,
    failed: AtomicU64,
    terminal: AtomicU64,
    last_synced_ms: AtomicI64,
    last_failed_ms: AtomicI64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub passes: u64,
    pub synced: u64,
    /// Every failed attempt, terminal ones included.
    pub failed: u64,
    pub terminal_failures: u64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_synced(&self) {
        self.synced.fetch_add(1, Ordering::Relaxed);
        self.last_synced_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_failed(&self, terminal: bool) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if terminal {
            self.terminal.fetch_add(1, Ordering::Relaxed);
        }
        self.last_failed_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            synced: self.synced.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            terminal_failures: self.terminal.load(Ordering::Relaxed),
            last_synced_at: millis_to_time(self.last_synced_ms.load(Ordering::Relaxed)),
            last_failed_at: millis_to_time(self.last_failed_ms.load(Ordering::Relaxed)),
        }
    }
}

fn millis_to_time(value: i64) -> Option<DateTime<Utc>> {
    if value == NEVER {
        return None;
    }
    Utc.timestamp_millis_opt(value).single()
}
