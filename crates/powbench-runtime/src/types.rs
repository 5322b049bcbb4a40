//! Per-item state for both halves of a batch.

use powbench_core::WorkItem;
use powbench_gateway::{Acknowledgment, ItemStatus, SequentialResult, StatusUpdate, Timing};
use serde::Serialize;

/// Ordered-strategy result for one work item, keyed by `cycle`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub cycle: u32,
    pub seed: String,
    pub status: ItemStatus,
    pub latency_ms: Option<f64>,
    pub hash: Option<String>,
    #[serde(flatten)]
    pub timing: Timing,
}

impl SyncResult {
    /// Placeholder shown while the sequential call is in flight.
    pub fn pending(item: &WorkItem) -> Self {
        Self {
            cycle: item.cycle,
            seed: item.seed.clone(),
            status: ItemStatus::Running,
            latency_ms: None,
            hash: None,
            timing: Timing::default(),
        }
    }

    /// Replace everything but identity with what the backend returned.
    pub fn reveal(&mut self, result: &SequentialResult) {
        self.status = match result.status {
            ItemStatus::Done => ItemStatus::Done,
            // The ordered run has no intermediate states once a result exists.
            _ => ItemStatus::Failed,
        };
        self.latency_ms = result.latency_ms;
        self.hash = result.hash.clone();
        self.timing = result.timing.clone();
    }

    /// Mark failed and forget any timing learned so far.
    pub fn fail(&mut self) {
        self.status = ItemStatus::Failed;
        self.latency_ms = None;
        self.timing = Timing::default();
    }
}

/// Async-strategy state for one acknowledged item, keyed by `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRecord {
    pub request_id: String,
    pub cycle: u32,
    pub status: ItemStatus,
    pub attempts: u32,
    pub callback_time_ms: Option<f64>,
    pub hash: Option<String>,
    #[serde(flatten)]
    pub timing: Timing,
}

impl CallbackRecord {
    /// Fresh record for an acknowledgment: queued, first attempt, no timing.
    pub fn from_ack(ack: &Acknowledgment) -> Self {
        Self {
            request_id: ack.request_id.clone(),
            cycle: ack.cycle,
            status: ItemStatus::Queued,
            attempts: 1,
            callback_time_ms: None,
            hash: None,
            timing: Timing::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge a polled update field by field; present values win.
    ///
    /// Identity (`request_id`, `cycle`) is never touched, and a record that
    /// already reached `done`/`failed` is left as is. Returns whether the
    /// update was applied.
    pub fn merge(&mut self, update: &StatusUpdate) -> bool {
        if self.is_terminal() {
            return false;
        }
        if let Some(status) = update.status {
            if status != ItemStatus::Unknown {
                self.status = status;
            }
        }
        if let Some(attempts) = update.attempts {
            self.attempts = attempts.max(1);
        }
        if update.callback_time_ms.is_some() {
            self.callback_time_ms = update.callback_time_ms;
        }
        if update.hash.is_some() {
            self.hash = update.hash.clone();
        }
        self.timing.merge_from(&update.timing);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CallbackRecord {
        CallbackRecord::from_ack(&Acknowledgment {
            cycle: 3,
            seed: "s".into(),
            request_id: "r-3".into(),
            ack_time_ms: 0.5,
        })
    }

    #[test]
    fn test_from_ack_defaults() {
        let rec = record();
        assert_eq!(rec.status, ItemStatus::Queued);
        assert_eq!(rec.attempts, 1);
        assert_eq!(rec.cycle, 3);
        assert_eq!(rec.timing, Timing::default());
        assert!(rec.hash.is_none());
    }

    #[test]
    fn test_merge_field_precedence() {
        let mut rec = record();
        let mut first = StatusUpdate::with_status("r-3", ItemStatus::Running);
        first.attempts = Some(2);
        first.timing.started_at_ms = Some(100);
        first.timing.enqueued_at_ms = Some(90);
        assert!(rec.merge(&first));

        // Status-only update must not erase timing learned earlier.
        let second = StatusUpdate::with_status("r-3", ItemStatus::Retrying);
        assert!(rec.merge(&second));
        assert_eq!(rec.status, ItemStatus::Retrying);
        assert_eq!(rec.attempts, 2);
        assert_eq!(rec.timing.started_at_ms, Some(100));
        assert_eq!(rec.timing.enqueued_at_ms, Some(90));

        // An update with no status keeps the current one.
        let mut third = StatusUpdate::with_status("r-3", ItemStatus::Running);
        third.status = None;
        third.hash = Some("beef".into());
        assert!(rec.merge(&third));
        assert_eq!(rec.status, ItemStatus::Retrying);
        assert_eq!(rec.hash.as_deref(), Some("beef"));
        assert_eq!(rec.request_id, "r-3");
        assert_eq!(rec.cycle, 3);
    }

    #[test]
    fn test_merge_unknown_status_ignored() {
        let mut rec = record();
        rec.merge(&StatusUpdate::with_status("r-3", ItemStatus::Unknown));
        assert_eq!(rec.status, ItemStatus::Queued);
    }

    #[test]
    fn test_terminal_record_not_reopened() {
        let mut rec = record();
        rec.merge(&StatusUpdate::with_status("r-3", ItemStatus::Done));
        assert!(!rec.merge(&StatusUpdate::with_status("r-3", ItemStatus::Running)));
        assert_eq!(rec.status, ItemStatus::Done);
    }

    #[test]
    fn test_sync_reveal_and_fail() {
        let item = WorkItem {
            cycle: 1,
            seed: "a".into(),
        };
        let mut result = SyncResult::pending(&item);
        assert_eq!(result.status, ItemStatus::Running);

        result.reveal(&SequentialResult {
            cycle: 1,
            seed: "a".into(),
            status: ItemStatus::Done,
            latency_ms: Some(12.0),
            hash: Some("aa".into()),
            nonce: Some(50_000),
            timing: Timing {
                started_at_ms: Some(5),
                ..Timing::default()
            },
        });
        assert_eq!(result.status, ItemStatus::Done);
        assert_eq!(result.latency_ms, Some(12.0));
        assert_eq!(result.timing.started_at_ms, Some(5));

        result.fail();
        assert_eq!(result.status, ItemStatus::Failed);
        assert_eq!(result.latency_ms, None);
        assert_eq!(result.timing, Timing::default());
    }
}
