//! Engine: entry point that gates, starts and tears down batches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use powbench_core::{BatchRequest, Error, PowBenchConfig, Result};
use powbench_gateway::{Gateway, HttpGateway};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dispatch::dispatch_async;
use crate::liveness::{GatewayHealth, LivenessMonitor};
use crate::polling::PollingSession;
use crate::run::BatchRun;
use crate::sync_run::run_sync;

/// Tasks and scope of the batch currently owned by the engine.
struct ActiveBatch {
    run: Arc<BatchRun>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveBatch {
    async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Batch {} task ended abnormally: {}", self.run.id(), e);
            }
        }
        self.run.abandon();
    }
}

/// Runs one batch at a time through both strategies.
pub struct Engine {
    gateway: Arc<dyn Gateway>,
    config: PowBenchConfig,
    health: Arc<GatewayHealth>,
    monitor: LivenessMonitor,
    active: Mutex<Option<ActiveBatch>>,
    current: RwLock<Option<Arc<BatchRun>>>,
    next_id: AtomicU64,
}

impl Engine {
    pub fn new(gateway: Arc<dyn Gateway>, config: PowBenchConfig) -> Self {
        let health = Arc::new(GatewayHealth::new());
        let monitor = LivenessMonitor::new(gateway.clone(), health.clone(), config.liveness_interval);
        Self {
            gateway,
            config,
            health,
            monitor,
            active: Mutex::new(None),
            current: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Engine over the HTTP gateway described by `config`.
    pub fn from_config(config: PowBenchConfig) -> Result<Self> {
        let gateway = HttpGateway::from_config(&config)?;
        Ok(Self::new(Arc::new(gateway), config))
    }

    pub fn config(&self) -> &PowBenchConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        self.gateway.endpoint()
    }

    pub fn health(&self) -> &Arc<GatewayHealth> {
        &self.health
    }

    pub fn monitor(&self) -> &LivenessMonitor {
        &self.monitor
    }

    /// Start the background liveness monitor.
    pub fn start_liveness(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.monitor.spawn(shutdown)
    }

    /// The most recently started batch, finished or not.
    pub fn current_run(&self) -> Option<Arc<BatchRun>> {
        self.current.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.current_run().map_or(false, |run| run.is_running())
    }

    /// Start a batch on both strategies.
    ///
    /// Refused with `BatchInProgress` while the previous batch is running,
    /// and with `Offline` when a fresh liveness check fails. The check runs
    /// without holding the active-batch lock, so `teardown` is never blocked
    /// behind it.
    pub async fn start_batch(&self, request: BatchRequest) -> Result<Arc<BatchRun>> {
        Self::refuse_if_running(self.active.lock().await.as_ref())?;

        if !self.monitor.check().await {
            return Err(Error::Offline(self.gateway.endpoint().to_string()));
        }

        let mut active = self.active.lock().await;
        Self::refuse_if_running(active.as_ref())?;
        if let Some(previous) = active.take() {
            previous.shutdown().await;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let run = Arc::new(BatchRun::new(id, request));
        let cancel = CancellationToken::new();
        info!(
            "Starting batch {}: {} items, difficulty {}, {}",
            id,
            run.request().len(),
            run.request().difficulty,
            run.request().algorithm.label()
        );

        let sync_task = {
            let (gateway, run, cancel) = (self.gateway.clone(), run.clone(), cancel.clone());
            let reveal_delay = self.config.reveal_delay;
            tokio::spawn(async move {
                run_sync(gateway.as_ref(), &run, reveal_delay, &cancel).await;
            })
        };

        let async_task = {
            let (gateway, run, cancel) = (self.gateway.clone(), run.clone(), cancel.clone());
            let health = self.health.clone();
            let period = self.config.poll_interval;
            tokio::spawn(async move {
                let reconciler = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    reconciler = dispatch_async(gateway.as_ref(), &run, &health) => reconciler,
                };
                if let Some(reconciler) = reconciler {
                    let mut handle = PollingSession::new(gateway, run, reconciler, period, health).spawn(&cancel);
                    handle.wait().await;
                }
            })
        };

        *active = Some(ActiveBatch {
            run: run.clone(),
            cancel,
            tasks: vec![sync_task, async_task],
        });
        *self.current.write() = Some(run.clone());
        Ok(run)
    }

    fn refuse_if_running(active: Option<&ActiveBatch>) -> Result<()> {
        match active {
            Some(previous) if previous.run.is_running() => {
                warn!("Batch {} still running; refusing new batch", previous.run.id());
                Err(Error::BatchInProgress)
            }
            _ => Ok(()),
        }
    }

    /// Cancel every timer and task of the current batch and wait for them.
    /// Safe to call repeatedly.
    pub async fn teardown(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            info!("Tearing down batch {}", previous.run.id());
            previous.shutdown().await;
        }
    }
}
