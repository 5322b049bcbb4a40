//! Batch execution & reconciliation engine.
//!
//! Runs one batch through two strategies at once: an ordered sequential
//! run revealed item by item, and an async dispatch whose out-of-order
//! completions are reconciled by a cancellable polling loop. Metrics are
//! derived on demand from the accumulated state.

pub mod dispatch;
pub mod engine;
pub mod liveness;
pub mod metrics;
pub mod polling;
pub mod reconcile;
pub mod run;
pub mod sync_run;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{dispatch_async, ASYNC_FAILED_MESSAGE};
pub use engine::Engine;
pub use liveness::{GatewayHealth, HealthSnapshot, LivenessMonitor, LivenessStatus};
pub use metrics::{percentile, AsyncMetrics, Runtime, SyncMetrics};
pub use polling::{PollingHandle, PollingSession, POLL_FAILED_MESSAGE};
pub use reconcile::{Reconciler, TickOutcome};
pub use run::{BatchRun, BatchSnapshot};
pub use sync_run::{run_sync, SYNC_FAILED_MESSAGE};
pub use types::*;
