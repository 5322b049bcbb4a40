//! Gateway liveness: shared health state plus the periodic check task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use powbench_gateway::Gateway;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    Checking,
    Online,
    Offline,
}

impl std::fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LivenessStatus::Checking => write!(f, "checking"),
            LivenessStatus::Online => write!(f, "online"),
            LivenessStatus::Offline => write!(f, "offline"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: LivenessStatus,
    /// Round-trip time of the last successful check.
    pub latency_ms: Option<f64>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Process-wide reachability flag. Written by the monitor and by any
/// component that observes a gateway failure; read before starting a batch.
#[derive(Debug)]
pub struct GatewayHealth {
    state: RwLock<HealthSnapshot>,
}

impl Default for GatewayHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayHealth {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HealthSnapshot {
                status: LivenessStatus::Checking,
                latency_ms: None,
                checked_at: None,
            }),
        }
    }

    pub fn mark_online(&self, latency_ms: f64) {
        let mut state = self.state.write();
        if state.status != LivenessStatus::Online {
            info!("Gateway online ({:.1} ms)", latency_ms);
        }
        state.status = LivenessStatus::Online;
        state.latency_ms = Some(latency_ms);
        state.checked_at = Some(Utc::now());
    }

    pub fn mark_offline(&self) {
        let mut state = self.state.write();
        if state.status != LivenessStatus::Offline {
            warn!("Gateway marked offline");
        }
        state.status = LivenessStatus::Offline;
        state.latency_ms = None;
        state.checked_at = Some(Utc::now());
    }

    pub fn status(&self) -> LivenessStatus {
        self.state.read().status
    }

    pub fn is_offline(&self) -> bool {
        self.status() == LivenessStatus::Offline
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.state.read().clone()
    }
}

/// Periodic reachability check, independent of any batch.
#[derive(Clone)]
pub struct LivenessMonitor {
    gateway: Arc<dyn Gateway>,
    health: Arc<GatewayHealth>,
    interval: Duration,
}

impl LivenessMonitor {
    pub fn new(gateway: Arc<dyn Gateway>, health: Arc<GatewayHealth>, interval: Duration) -> Self {
        Self {
            gateway,
            health,
            interval,
        }
    }

    pub fn health(&self) -> &Arc<GatewayHealth> {
        &self.health
    }

    /// Check once and record the outcome. Returns whether the gateway answered.
    pub async fn check(&self) -> bool {
        let started = Instant::now();
        match self.gateway.liveness().await {
            Ok(response) => {
                let latency_ms = started.elapsed().as_micros() as f64 / 1000.0;
                debug!("Liveness {} answered '{}'", self.gateway.endpoint(), response.status);
                self.health.mark_online(latency_ms);
                true
            }
            Err(e) => {
                warn!("Liveness check of {} failed: {}", self.gateway.endpoint(), e);
                self.health.mark_offline();
                false
            }
        }
    }

    /// Check immediately, then every `interval` until `shutdown` fires.
    pub fn spawn(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = monitor.check() => {}
                        }
                    }
                }
            }

            info!("Liveness monitor stopped");
        })
    }
}
