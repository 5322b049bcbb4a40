//! Polling reconciliation loop.
//!
//! One session per in-flight async batch. The session task owns the
//! [`Reconciler`] outright, so nothing else can touch the outstanding set.
//! Ticks never overlap: the next poll is only scheduled after the previous
//! response has been merged.

use std::sync::Arc;
use std::time::Duration;

use powbench_gateway::Gateway;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::liveness::GatewayHealth;
use crate::reconcile::Reconciler;
use crate::run::BatchRun;

pub const POLL_FAILED_MESSAGE: &str = "Failed to poll async status from the backend.";

pub struct PollingSession {
    gateway: Arc<dyn Gateway>,
    run: Arc<BatchRun>,
    reconciler: Reconciler,
    period: Duration,
    health: Arc<GatewayHealth>,
}

impl PollingSession {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        run: Arc<BatchRun>,
        reconciler: Reconciler,
        period: Duration,
        health: Arc<GatewayHealth>,
    ) -> Self {
        Self {
            gateway,
            run,
            reconciler,
            period,
            health,
        }
    }

    /// Start polling. The first poll fires one `period` from now.
    ///
    /// The session stops on its own once drained, and is cancelled when
    /// either `parent` or the returned handle is cancelled.
    pub fn spawn(self, parent: &CancellationToken) -> PollingHandle {
        let token = parent.child_token();
        let join = tokio::spawn(self.drive(token.clone()));
        PollingHandle {
            cancel: token,
            join: Some(join),
        }
    }

    async fn drive(mut self, token: CancellationToken) {
        let batch = self.run.id();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        while !self.reconciler.is_idle() {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let ids = self.reconciler.outstanding().to_vec();
            let response = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                response = self.gateway.poll_status(&ids) => response,
            };
            // The scope may have been torn down while the response was in flight.
            if token.is_cancelled() {
                debug!("Batch {}: discarding status response after cancellation", batch);
                break;
            }
            ticks += 1;

            match response {
                Ok(response) => {
                    let outcome = self.run.async_apply(&mut self.reconciler, &response.results);
                    debug!(
                        "Batch {} tick {}: merged={} discarded={} settled={} outstanding={}",
                        batch,
                        ticks,
                        outcome.merged,
                        outcome.discarded,
                        outcome.settled.len(),
                        self.reconciler.outstanding().len()
                    );
                    if outcome.drained {
                        info!("Batch {}: all callbacks settled after {} polls", batch, ticks);
                    }
                }
                Err(e) => {
                    let dropped = self.reconciler.abort();
                    error!(
                        "Batch {}: status poll failed, abandoning {} outstanding: {}",
                        batch, dropped, e
                    );
                    self.run.set_error(POLL_FAILED_MESSAGE);
                    self.health.mark_offline();
                    self.run.async_finish();
                }
            }
        }

        if !self.reconciler.is_idle() {
            info!(
                "Batch {}: polling cancelled with {} outstanding",
                batch,
                self.reconciler.outstanding().len()
            );
        }
    }
}

/// Owner of a running session. Cancelling is idempotent, and dropping the
/// handle cancels the session.
#[derive(Debug)]
pub struct PollingHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollingHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Wait for the session task to exit, whether drained or cancelled.
    pub async fn wait(&mut self) {
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                error!("Polling task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
