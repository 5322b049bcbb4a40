//! Scripted in-process gateway for engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use powbench_core::{BatchRequest, Error, HashAlgorithm, Result};
use powbench_gateway::{
    Acknowledgment, AsyncSubmitResponse, Gateway, ItemStatus, LivenessResponse, SequentialResponse,
    SequentialResult, StatusResponse, StatusUpdate, Timing,
};

type Scripted<T> = Mutex<VecDeque<std::result::Result<T, String>>>;

/// Replays queued responses. `Err(msg)` entries come back as `Error::Gateway`.
pub(crate) struct ScriptedGateway {
    sequential: Scripted<SequentialResponse>,
    submits: Scripted<AsyncSubmitResponse>,
    polls: Scripted<StatusResponse>,
    poll_log: Mutex<Vec<Vec<String>>>,
    poll_delay: Mutex<Duration>,
    liveness_delay: Mutex<Duration>,
    sequential_calls: AtomicUsize,
    online: AtomicBool,
}

fn next<T>(queue: &Scripted<T>, what: &str) -> Option<Result<T>> {
    queue
        .lock()
        .pop_front()
        .map(|r| r.map_err(|msg| Error::Gateway(format!("{}: {}", what, msg))))
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            sequential: Mutex::new(VecDeque::new()),
            submits: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
            poll_log: Mutex::new(Vec::new()),
            poll_delay: Mutex::new(Duration::ZERO),
            liveness_delay: Mutex::new(Duration::ZERO),
            sequential_calls: AtomicUsize::new(0),
            online: AtomicBool::new(true),
        }
    }

    pub fn push_sequential(&self, response: std::result::Result<SequentialResponse, String>) {
        self.sequential.lock().push_back(response);
    }

    pub fn push_submit(&self, response: std::result::Result<AsyncSubmitResponse, String>) {
        self.submits.lock().push_back(response);
    }

    pub fn push_poll(&self, response: std::result::Result<StatusResponse, String>) {
        self.polls.lock().push_back(response);
    }

    /// Every poll waits this long before answering.
    pub fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.lock() = delay;
    }

    /// Every liveness check waits this long before answering.
    pub fn set_liveness_delay(&self, delay: Duration) {
        *self.liveness_delay.lock() = delay;
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn sequential_calls(&self) -> usize {
        self.sequential_calls.load(Ordering::SeqCst)
    }

    /// Identifier lists passed to each poll, in call order.
    pub fn polls(&self) -> Vec<Vec<String>> {
        self.poll_log.lock().clone()
    }
}

impl Gateway for ScriptedGateway {
    fn process_sequential<'a>(
        &'a self,
        _request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<SequentialResponse>> {
        Box::pin(async move {
            self.sequential_calls.fetch_add(1, Ordering::SeqCst);
            next(&self.sequential, "sync")
                .unwrap_or_else(|| Err(Error::Gateway("sync: nothing scripted".into())))
        })
    }

    fn submit_async<'a>(
        &'a self,
        _request: &'a BatchRequest,
    ) -> BoxFuture<'a, Result<AsyncSubmitResponse>> {
        Box::pin(async move {
            next(&self.submits, "async")
                .unwrap_or_else(|| Err(Error::Gateway("async: nothing scripted".into())))
        })
    }

    fn poll_status<'a>(&'a self, request_ids: &'a [String]) -> BoxFuture<'a, Result<StatusResponse>> {
        Box::pin(async move {
            self.poll_log.lock().push(request_ids.to_vec());
            let delay = *self.poll_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            next(&self.polls, "status").unwrap_or_else(|| Ok(StatusResponse { results: Vec::new() }))
        })
    }

    fn liveness(&self) -> BoxFuture<'_, Result<LivenessResponse>> {
        Box::pin(async move {
            let delay = *self.liveness_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.online.load(Ordering::SeqCst) {
                Ok(LivenessResponse {
                    status: "ok".into(),
                    service: Some("scripted".into()),
                    timestamp: None,
                })
            } else {
                Err(Error::Http("connection refused".into()))
            }
        })
    }

    fn endpoint(&self) -> &str {
        "http://scripted.test"
    }
}

pub(crate) fn batch(seeds: &[&str]) -> BatchRequest {
    BatchRequest::new(
        seeds.iter().map(|s| s.to_string()).collect(),
        1,
        HashAlgorithm::Sha256,
    )
    .unwrap()
}

pub(crate) fn sequential_done(seeds: &[&str]) -> SequentialResponse {
    let results = seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| SequentialResult {
            cycle: i as u32 + 1,
            seed: seed.to_string(),
            status: ItemStatus::Done,
            latency_ms: Some(10.0 * (i as f64 + 1.0)),
            hash: Some(format!("hash-{}", seed)),
            nonce: Some(50_000),
            timing: Timing::default(),
        })
        .collect();
    SequentialResponse {
        results,
        total_ms: None,
    }
}

/// One ack per seed with request ids `id-<cycle>`.
pub(crate) fn acks(seeds: &[&str]) -> AsyncSubmitResponse {
    let acks = seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| Acknowledgment {
            cycle: i as u32 + 1,
            seed: seed.to_string(),
            request_id: format!("id-{}", i + 1),
            ack_time_ms: 2.0,
        })
        .collect();
    AsyncSubmitResponse { acks }
}

pub(crate) fn statuses(updates: &[(&str, ItemStatus)]) -> StatusResponse {
    StatusResponse {
        results: updates
            .iter()
            .map(|(id, status)| StatusUpdate::with_status(*id, *status))
            .collect(),
    }
}
