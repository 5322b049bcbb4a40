//! Reconciliation of polled status updates against the acknowledged batch.
//!
//! [`Reconciler`] owns the outstanding identifier set. It is the only thing
//! that removes identifiers from it, and it does so purely from the status
//! the backend returned. The polling loop drives it once per tick.

use std::collections::HashSet;

use powbench_gateway::StatusUpdate;
use tracing::debug;

use crate::types::CallbackRecord;

/// What a single tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Updates merged into a known record.
    pub merged: usize,
    /// Updates for identifiers this batch never acknowledged.
    pub discarded: usize,
    /// Identifiers removed from the outstanding set on this tick.
    pub settled: Vec<String>,
    /// True when this tick removed the last outstanding identifier.
    pub drained: bool,
}

/// Outstanding identifier set for one async batch.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    outstanding: Vec<String>,
}

impl Reconciler {
    /// Seed the outstanding set. Duplicates collapse to one entry; order is kept.
    pub fn new<I, S>(request_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let outstanding = request_ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        Self { outstanding }
    }

    pub fn outstanding(&self) -> &[String] {
        &self.outstanding
    }

    /// Idle means nothing left to poll.
    pub fn is_idle(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Apply one status response.
    ///
    /// `records` is merged field by field and re-sorted by cycle. Terminal
    /// updates clear their identifier from the outstanding set whether or
    /// not the merge itself changed anything.
    pub fn apply(&mut self, records: &mut [CallbackRecord], updates: &[StatusUpdate]) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.is_idle() {
            return outcome;
        }

        for update in updates {
            match records.iter_mut().find(|r| r.request_id == update.request_id) {
                Some(record) => {
                    if record.merge(update) {
                        outcome.merged += 1;
                    }
                }
                None => {
                    debug!("Discarding status for unknown request {}", update.request_id);
                    outcome.discarded += 1;
                }
            }
        }
        records.sort_by_key(|r| r.cycle);

        let terminal: HashSet<&str> = updates
            .iter()
            .filter(|u| u.is_terminal())
            .map(|u| u.request_id.as_str())
            .collect();
        if !terminal.is_empty() {
            let before = self.outstanding.len();
            let mut settled = Vec::new();
            self.outstanding.retain(|id| {
                if terminal.contains(id.as_str()) {
                    settled.push(id.clone());
                    false
                } else {
                    true
                }
            });
            outcome.settled = settled;
            outcome.drained = before > 0 && self.outstanding.is_empty();
        }

        outcome
    }

    /// Drop every outstanding identifier (session-fatal poll failure).
    pub fn abort(&mut self) -> usize {
        let dropped = self.outstanding.len();
        self.outstanding.clear();
        dropped
    }
}
