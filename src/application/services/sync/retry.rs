use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
struct RetrySlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

/// At most one delayed follow-up pass at a time.
///
/// The slot is released as soon as the timer fires, so the pass it starts
/// can schedule the next retry. `cancel` only stops a timer that has not
/// fired yet.
#[derive(Clone, Default)]
pub struct RetryScheduler {
    slot: Arc<Mutex<RetrySlot>>,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a retry is already waiting.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.handle.is_some() {
            return false;
        }

        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);

        slot.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.generation == generation {
                    slot.handle = None;
                }
            }
            task.await;
        }));

        tracing::debug!(
            target: "sync::orchestrator",
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );
        true
    }

    pub fn cancel(&self) -> bool {
        let handle = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.handle.take()
        };
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::debug!(target: "sync::orchestrator", "scheduled retry cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle
            .is_some()
    }
}
