//! Metrics derived on demand from a batch snapshot. Nothing here is stored.

use powbench_gateway::ItemStatus;
use serde::Serialize;

use crate::run::BatchSnapshot;

/// Nearest-rank percentile: sort ascending, take index `ceil(p/100 * n) - 1`.
pub fn percentile(p: f64, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Sum of `values`; `+0.0` when empty.
fn total(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc + v)
}

/// Run time of one half. `Elapsed` is wall clock over a finished run;
/// `Cumulative` sums per-item times while it is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "ms", rename_all = "lowercase")]
pub enum Runtime {
    Elapsed(f64),
    Cumulative(f64),
}

impl Runtime {
    pub fn label(&self) -> &'static str {
        match self {
            Runtime::Elapsed(_) => "Elapsed",
            Runtime::Cumulative(_) => "Cumulative",
        }
    }

    pub fn ms(&self) -> f64 {
        match self {
            Runtime::Elapsed(ms) | Runtime::Cumulative(ms) => *ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetrics {
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    /// Fraction of items that reached a terminal status.
    pub progress: f64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub runtime: Runtime,
}

impl SyncMetrics {
    pub fn from_snapshot(snapshot: &BatchSnapshot) -> Self {
        let results = &snapshot.sync_results;
        let done = results.iter().filter(|r| r.status == ItemStatus::Done).count();
        let failed = results.iter().filter(|r| r.status == ItemStatus::Failed).count();
        // Every row with a latency counts, failed rows included.
        let latencies: Vec<f64> = results.iter().filter_map(|r| r.latency_ms).collect();

        let runtime = match (snapshot.sync_complete, snapshot.sync_elapsed_ms) {
            (true, Some(ms)) => Runtime::Elapsed(ms),
            _ => Runtime::Cumulative(total(&latencies)),
        };

        Self {
            total: results.len(),
            done,
            failed,
            progress: if results.is_empty() {
                0.0
            } else {
                (done + failed) as f64 / results.len() as f64
            },
            p50_ms: percentile(50.0, &latencies),
            p95_ms: percentile(95.0, &latencies),
            p99_ms: percentile(99.0, &latencies),
            runtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncMetrics {
    pub acknowledged: usize,
    pub done: usize,
    pub failed: usize,
    pub retrying: usize,
    pub avg_ack_ms: Option<f64>,
    pub p50_callback_ms: Option<f64>,
    pub p95_callback_ms: Option<f64>,
    pub p99_callback_ms: Option<f64>,
    /// Sum of `attempts - 1` over every record.
    pub total_retries: u32,
    pub runtime: Runtime,
}

impl AsyncMetrics {
    pub fn from_snapshot(snapshot: &BatchSnapshot) -> Self {
        let records = &snapshot.callbacks;
        let count = |status: ItemStatus| records.iter().filter(|r| r.status == status).count();
        let callback_times: Vec<f64> = records.iter().filter_map(|r| r.callback_time_ms).collect();

        let avg_ack_ms = if snapshot.acks.is_empty() {
            None
        } else {
            let ack_times: Vec<f64> = snapshot.acks.iter().map(|a| a.ack_time_ms).collect();
            Some(total(&ack_times) / ack_times.len() as f64)
        };

        let first_start = records.iter().filter_map(|r| r.timing.started_at_ms).min();
        let last_completion = records.iter().filter_map(|r| r.timing.completed_at_ms).max();
        let runtime = match (snapshot.async_complete, first_start, last_completion) {
            (true, Some(start), Some(end)) => Runtime::Elapsed((end - start).max(0) as f64),
            _ => Runtime::Cumulative(total(&callback_times)),
        };

        Self {
            acknowledged: snapshot.acks.len(),
            done: count(ItemStatus::Done),
            failed: count(ItemStatus::Failed),
            retrying: count(ItemStatus::Retrying),
            avg_ack_ms,
            p50_callback_ms: percentile(50.0, &callback_times),
            p95_callback_ms: percentile(95.0, &callback_times),
            p99_callback_ms: percentile(99.0, &callback_times),
            total_retries: records.iter().map(|r| r.attempts.saturating_sub(1)).sum(),
            runtime,
        }
    }
}
