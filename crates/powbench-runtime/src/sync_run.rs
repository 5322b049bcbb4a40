//! Synchronous run controller: one blocking call, revealed item by item.

use std::time::Duration;

use powbench_gateway::Gateway;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::run::BatchRun;

pub const SYNC_FAILED_MESSAGE: &str = "Sync request failed.";

/// Drive the ordered half of `run` to a terminal state.
///
/// Issues exactly one sequential call. Results are revealed one cycle at a
/// time with `reveal_delay` between consecutive reveals and none after the
/// last. On failure every item is marked failed; on cancellation every
/// unrevealed item is. Never returns an error: the outcome is recorded on
/// `run`, and the sync half always finishes.
pub async fn run_sync(
    gateway: &dyn Gateway,
    run: &BatchRun,
    reveal_delay: Duration,
    cancel: &CancellationToken,
) {
    run.sync_begin();
    info!("Batch {}: sequential run of {} items", run.id(), run.request().len());

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Batch {}: sequential run cancelled before response", run.id());
            finish_cancelled(run);
            return;
        }
        response = gateway.process_sequential(run.request()) => response,
    };

    match response {
        Ok(response) => {
            let total = response.results.len();
            for (i, result) in response.results.iter().enumerate() {
                run.sync_reveal(result);
                if i + 1 < total {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("Batch {}: reveal cancelled after cycle {}", run.id(), result.cycle);
                            finish_cancelled(run);
                            return;
                        }
                        _ = tokio::time::sleep(reveal_delay) => {}
                    }
                }
            }

            let missing = run.sync_fail_pending();
            if missing > 0 {
                warn!(
                    "Batch {}: sequential response omitted {} items; marked failed",
                    run.id(),
                    missing
                );
            }
        }
        Err(e) => {
            error!("Batch {}: sequential request failed: {}", run.id(), e);
            run.sync_fail_all();
            run.set_error(SYNC_FAILED_MESSAGE);
        }
    }

    run.sync_finish();
}

/// Close the sync half on teardown: unrevealed items end as failed.
fn finish_cancelled(run: &BatchRun) {
    let unrevealed = run.sync_fail_pending();
    info!("Batch {}: sequential run cancelled, {} items not revealed", run.id(), unrevealed);
    run.sync_finish();
}
