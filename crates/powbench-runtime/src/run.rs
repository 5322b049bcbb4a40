//! BatchRun: shared state for one batch across both strategies.
//!
//! The sync half and the async half each have their own lock and exactly
//! one writer task. Neither writer holds a lock across an `.await`. Every
//! time either half changes, [`BatchRun::supervise`] re-evaluates whether
//! the batch as a whole is still running.

use parking_lot::RwLock;
use powbench_core::BatchRequest;
use powbench_gateway::{Acknowledgment, SequentialResult, StatusUpdate};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::reconcile::{Reconciler, TickOutcome};
use crate::types::{CallbackRecord, SyncResult};

#[derive(Debug, Default)]
struct SyncHalf {
    results: Vec<SyncResult>,
    started_at: Option<Instant>,
    completed_at: Option<Instant>,
    complete: bool,
}

#[derive(Debug, Default)]
struct AsyncHalf {
    acks: Vec<Acknowledgment>,
    records: Vec<CallbackRecord>,
    started: bool,
    complete: bool,
}

/// Point-in-time copy of a batch for observers and the metrics aggregator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSnapshot {
    pub id: u64,
    pub request: BatchRequest,
    pub sync_results: Vec<SyncResult>,
    pub acks: Vec<Acknowledgment>,
    pub callbacks: Vec<CallbackRecord>,
    pub sync_complete: bool,
    pub async_started: bool,
    pub async_complete: bool,
    pub running: bool,
    /// Wall time from issuing the sequential call to the last reveal.
    pub sync_elapsed_ms: Option<f64>,
    pub error: Option<String>,
}

/// One batch: a SyncResult collection and a CallbackRecord collection
/// sharing the cycle space 1..=N.
#[derive(Debug)]
pub struct BatchRun {
    id: u64,
    request: BatchRequest,
    sync: RwLock<SyncHalf>,
    async_half: RwLock<AsyncHalf>,
    error: RwLock<Option<String>>,
    running: watch::Sender<bool>,
}

impl BatchRun {
    /// Create a running batch with every sync item pending.
    pub fn new(id: u64, request: BatchRequest) -> Self {
        let results = request.work_items().iter().map(SyncResult::pending).collect();
        let (running, _) = watch::channel(true);
        Self {
            id,
            request,
            sync: RwLock::new(SyncHalf {
                results,
                ..SyncHalf::default()
            }),
            async_half: RwLock::new(AsyncHalf::default()),
            error: RwLock::new(None),
            running,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &BatchRequest {
        &self.request
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Wait until both halves are terminal (or the batch was abandoned).
    pub async fn finished(&self) {
        let mut rx = self.running.subscribe();
        // The sender lives as long as `self`, so this only ends on `false`.
        let _ = rx.wait_for(|running| !*running).await;
    }

    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    /// Record the user-visible message for this batch. Latest failure wins.
    pub(crate) fn set_error(&self, message: impl Into<String>) {
        *self.error.write() = Some(message.into());
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        let sync = self.sync.read();
        let async_half = self.async_half.read();
        let sync_elapsed_ms = match (sync.started_at, sync.completed_at) {
            (Some(start), Some(end)) => Some(end.duration_since(start).as_micros() as f64 / 1000.0),
            _ => None,
        };
        BatchSnapshot {
            id: self.id,
            request: self.request.clone(),
            sync_results: sync.results.clone(),
            acks: async_half.acks.clone(),
            callbacks: async_half.records.clone(),
            sync_complete: sync.complete,
            async_started: async_half.started,
            async_complete: async_half.complete,
            running: self.is_running(),
            sync_elapsed_ms,
            error: self.error(),
        }
    }

    // ---------------------------------------------------------------
    // Supervision
    // ---------------------------------------------------------------

    /// Flip the running flag off once both halves are terminal.
    fn supervise(&self) {
        let sync_done = self.sync.read().complete;
        let async_done = self.async_half.read().complete;
        if sync_done && async_done && self.is_running() {
            self.running.send_replace(false);
            info!("Batch {} finished", self.id);
        }
    }

    /// Stop counting the batch as running without completing its halves.
    pub(crate) fn abandon(&self) {
        if self.is_running() {
            self.running.send_replace(false);
            info!("Batch {} abandoned", self.id);
        }
    }

    // ---------------------------------------------------------------
    // Sync half (written only by the sync controller)
    // ---------------------------------------------------------------

    pub(crate) fn sync_begin(&self) {
        self.sync.write().started_at = Some(Instant::now());
    }

    /// Apply one revealed result to the item with the same cycle.
    pub(crate) fn sync_reveal(&self, result: &SequentialResult) -> bool {
        let mut sync = self.sync.write();
        match sync.results.iter_mut().find(|r| r.cycle == result.cycle) {
            Some(slot) => {
                slot.reveal(result);
                true
            }
            None => {
                warn!("Batch {}: sequential result for unknown cycle {}", self.id, result.cycle);
                false
            }
        }
    }

    /// Fail every item that is not yet terminal. Returns how many changed.
    pub(crate) fn sync_fail_pending(&self) -> usize {
        let mut sync = self.sync.write();
        let mut failed = 0;
        for result in sync.results.iter_mut().filter(|r| !r.status.is_terminal()) {
            result.fail();
            failed += 1;
        }
        failed
    }

    /// Fail every item, discarding anything already revealed.
    pub(crate) fn sync_fail_all(&self) {
        let mut sync = self.sync.write();
        for result in sync.results.iter_mut() {
            result.fail();
        }
    }

    pub(crate) fn sync_finish(&self) {
        {
            let mut sync = self.sync.write();
            sync.completed_at = Some(Instant::now());
            sync.complete = true;
        }
        self.supervise();
    }

    // ---------------------------------------------------------------
    // Async half (written by the dispatch tracker, then the polling loop)
    // ---------------------------------------------------------------

    /// Install acknowledgments and their fresh callback records atomically.
    pub(crate) fn async_accept(&self, acks: Vec<Acknowledgment>, records: Vec<CallbackRecord>) {
        {
            let mut half = self.async_half.write();
            half.acks = acks;
            half.records = records;
            half.started = true;
            half.complete = false;
        }
    }

    /// Mark the async half finished (drained, failed, or nothing to poll).
    pub(crate) fn async_finish(&self) {
        self.async_half.write().complete = true;
        self.supervise();
    }

    /// Merge one status response under the async lock.
    pub(crate) fn async_apply(&self, reconciler: &mut Reconciler, updates: &[StatusUpdate]) -> TickOutcome {
        let outcome = {
            let mut half = self.async_half.write();
            reconciler.apply(&mut half.records, updates)
        };
        if outcome.drained {
            self.async_finish();
        }
        outcome
    }

    pub fn sync_complete(&self) -> bool {
        self.sync.read().complete
    }

    pub fn async_complete(&self) -> bool {
        self.async_half.read().complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powbench_core::HashAlgorithm;
    use powbench_gateway::ItemStatus;

    fn run(n: usize) -> BatchRun {
        let seeds = (0..n).map(|i| format!("s{}", i)).collect();
        BatchRun::new(1, BatchRequest::new(seeds, 1, HashAlgorithm::Sha256).unwrap())
    }

    #[test]
    fn test_new_run_has_pending_sync_items() {
        let run = run(3);
        let snap = run.snapshot();
        assert!(snap.running);
        assert_eq!(snap.sync_results.len(), 3);
        assert!(snap.sync_results.iter().all(|r| r.status == ItemStatus::Running));
        assert!(snap.callbacks.is_empty());
        assert_eq!(snap.sync_elapsed_ms, None);
    }

    #[test]
    fn test_running_until_both_halves_finish() {
        let run = run(2);
        run.sync_begin();
        run.sync_fail_all();
        run.sync_finish();
        assert!(run.is_running());

        run.async_finish();
        assert!(!run.is_running());
        assert!(run.snapshot().sync_elapsed_ms.is_some());
    }

    #[test]
    fn test_fail_pending_keeps_revealed() {
        let run = run(2);
        run.sync_reveal(&SequentialResult {
            cycle: 1,
            seed: "s0".into(),
            status: ItemStatus::Done,
            latency_ms: Some(3.0),
            hash: None,
            nonce: None,
            timing: Default::default(),
        });
        assert_eq!(run.sync_fail_pending(), 1);
        let snap = run.snapshot();
        assert_eq!(snap.sync_results[0].status, ItemStatus::Done);
        assert_eq!(snap.sync_results[1].status, ItemStatus::Failed);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(run(1).snapshot()).unwrap();
        assert_eq!(json["syncResults"][0]["status"], "running");
        assert_eq!(json["asyncComplete"], false);
        assert!(json["syncElapsedMs"].is_null());
    }

    #[tokio::test]
    async fn test_finished_resolves_after_abandon() {
        let run = std::sync::Arc::new(run(1));
        let waiter = {
            let run = run.clone();
            tokio::spawn(async move { run.finished().await })
        };
        run.abandon();
        waiter.await.unwrap();
        assert!(!run.is_running());
    }
}
