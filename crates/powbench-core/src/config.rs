//! Configuration for the engine and the gateway client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Delay between progressive reveals of synchronous results.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(300);
/// Period of the async status poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(800);
/// Period of the background liveness check.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(15);
/// The sequential call blocks until every item is hashed, so this is generous.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Top-level PowBench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowBenchConfig {
    /// Base URL of the processing backend (e.g., `http://localhost:8000`).
    pub api_base: String,
    /// Per-request timeout for gateway calls.
    pub request_timeout: Duration,
    pub reveal_delay: Duration,
    pub poll_interval: Duration,
    pub liveness_interval: Duration,
}

impl Default for PowBenchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }
}

impl PowBenchConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("POWBENCH_API_BASE") {
            config.api_base = base;
        }

        if let Ok(raw) = std::env::var("POWBENCH_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("POWBENCH_REQUEST_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let base = self.api_base.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be non-zero".into()));
        }
        if self.liveness_interval.is_zero() {
            return Err(Error::Config("liveness_interval must be non-zero".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request_timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// API base without a trailing slash, ready for path concatenation.
    pub fn api_base(&self) -> &str {
        self.api_base.trim().trim_end_matches('/')
    }
}
