pub mod grouping;
pub mod orchestrator;
pub mod reconciliation;
pub mod retry;
pub mod strategy;

pub use grouping::{group_for_replay, Replayable, ReplayUnit};
pub use orchestrator::SyncOrchestrator;
pub use reconciliation::{IdMap, Reconciled, Reconciler};
pub use retry::RetryScheduler;
pub use strategy::{strategy_for, ContextSpec, ParentReference, ReferenceList, SyncStrategy};
