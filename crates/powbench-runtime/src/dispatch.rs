//! Asynchronous dispatch tracker.

use powbench_gateway::Gateway;
use tracing::{error, info, warn};

use crate::liveness::GatewayHealth;
use crate::reconcile::Reconciler;
use crate::run::BatchRun;
use crate::types::CallbackRecord;

pub const ASYNC_FAILED_MESSAGE: &str = "Async request failed. Ensure the backend is running.";

/// Submit the batch to the async operation and seed the outstanding set.
///
/// Returns the reconciler to hand to the polling loop, or `None` when there
/// is nothing to poll. In that case the async half is already complete.
pub async fn dispatch_async(gateway: &dyn Gateway, run: &BatchRun, health: &GatewayHealth) -> Option<Reconciler> {
    match gateway.submit_async(run.request()).await {
        Ok(response) => {
            let mut acks = response.acks;
            acks.sort_by_key(|a| a.cycle);
            let mut records: Vec<CallbackRecord> = Vec::with_capacity(acks.len());
            for ack in &acks {
                if records.iter().any(|r| r.request_id == ack.request_id) {
                    warn!("Batch {}: duplicate acknowledgment {}", run.id(), ack.request_id);
                    continue;
                }
                records.push(CallbackRecord::from_ack(ack));
            }
            if acks.len() != run.request().len() {
                warn!(
                    "Batch {}: {} acknowledgments for {} items",
                    run.id(),
                    acks.len(),
                    run.request().len()
                );
            }

            let reconciler = Reconciler::new(records.iter().map(|r| r.request_id.clone()));
            info!("Batch {}: {} items acknowledged", run.id(), reconciler.outstanding().len());
            run.async_accept(acks, records);

            if reconciler.is_idle() {
                run.async_finish();
                None
            } else {
                Some(reconciler)
            }
        }
        Err(e) => {
            error!("Batch {}: async submission failed: {}", run.id(), e);
            run.set_error(ASYNC_FAILED_MESSAGE);
            health.mark_offline();
            run.async_finish();
            None
        }
    }
}
