//! Wire types matching the backend's JSON API surface.

use serde::{Deserialize, Serialize};

/// Per-item processing status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Queued,
    Running,
    Retrying,
    Done,
    Failed,
    /// Anything the backend sends that we do not recognise.
    #[serde(other)]
    Unknown,
}

impl ItemStatus {
    /// `done` and `failed` admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Queued => write!(f, "queued"),
            ItemStatus::Running => write!(f, "running"),
            ItemStatus::Retrying => write!(f, "retrying"),
            ItemStatus::Done => write!(f, "done"),
            ItemStatus::Failed => write!(f, "failed"),
            ItemStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Timing breakdown attached to sync results and async status updates.
///
/// Durations are milliseconds; `*_at_ms` fields are Unix epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub wall_time_ms: Option<f64>,
    #[serde(default)]
    pub queue_time_ms: Option<f64>,
    #[serde(default)]
    pub total_time_ms: Option<f64>,
    #[serde(default)]
    pub enqueued_at_ms: Option<i64>,
    #[serde(default)]
    pub started_at_ms: Option<i64>,
    #[serde(default)]
    pub completed_at_ms: Option<i64>,
}

impl Timing {
    /// Field-by-field merge: a value from `incoming` wins only when present.
    pub fn merge_from(&mut self, incoming: &Timing) {
        fn take<T: Copy>(slot: &mut Option<T>, incoming: Option<T>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }
        take(&mut self.processing_time_ms, incoming.processing_time_ms);
        take(&mut self.wall_time_ms, incoming.wall_time_ms);
        take(&mut self.queue_time_ms, incoming.queue_time_ms);
        take(&mut self.total_time_ms, incoming.total_time_ms);
        take(&mut self.enqueued_at_ms, incoming.enqueued_at_ms);
        take(&mut self.started_at_ms, incoming.started_at_ms);
        take(&mut self.completed_at_ms, incoming.completed_at_ms);
    }
}

// ---------------------------------------------------------------
// POST /api/sync
// ---------------------------------------------------------------

/// One entry of the sequential response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialResult {
    pub cycle: u32,
    pub seed: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(flatten)]
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialResponse {
    pub results: Vec<SequentialResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ms: Option<f64>,
}

// ---------------------------------------------------------------
// POST /api/async
// ---------------------------------------------------------------

/// Immediate acknowledgment that an item was queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    pub cycle: u32,
    pub seed: String,
    pub request_id: String,
    pub ack_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncSubmitResponse {
    pub acks: Vec<Acknowledgment>,
}

// ---------------------------------------------------------------
// POST /api/async/status
// ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub request_ids: Vec<String>,
}

/// Polled status of one async item. Every field but the id may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub request_id: String,
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub callback_time_ms: Option<f64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(flatten)]
    pub timing: Timing,
}

impl StatusUpdate {
    /// A bare update carrying only an id and a status.
    pub fn with_status(request_id: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            request_id: request_id.into(),
            status: Some(status),
            attempts: None,
            callback_time_ms: None,
            hash: None,
            seed: None,
            timing: Timing::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.map_or(false, |s| s.is_terminal())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub results: Vec<StatusUpdate>,
}

// ---------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}
