//! Reconciliation: the periodic backlog drain.
//!
//! Notification-driven enqueue handles fresh jobs opportunistically but
//! never retries a job that found no capacity, so liveness depends on this
//! loop. Each cycle drains one backlog category (queued first, then error)
//! from a single first page; bounded work per tick, relying on the schedule
//! for eventual drain.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::admission::{AdmissionController, AdmissionError, AdmitOutcome};
use crate::job::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Size of the backlog page fetched this cycle
    pub scanned: usize,
    /// Jobs successfully started this cycle
    pub processed: usize,
}

/// Run one reconciliation cycle: fetch the first page of backlog and admit
/// in index order until the page is exhausted or capacity runs out.
pub async fn run_cycle(
    controller: &AdmissionController,
    page_size: usize,
) -> Result<ReconcileStats, AdmissionError> {
    let store = controller.store();

    // Only one category is drained per cycle, queued before error.
    let mut page = store
        .scan_by_status(JobStatus::Queued, page_size, true, None)
        .await?;
    if page.items.is_empty() {
        page = store
            .scan_by_status(JobStatus::Error, page_size, true, None)
            .await?;
    }

    let mut stats = ReconcileStats {
        scanned: page.items.len(),
        processed: 0,
    };

    for job in &page.items {
        match controller.admit_one(job).await? {
            AdmitOutcome::Started => stats.processed += 1,
            AdmitOutcome::NoCapacity => break,
            // The failed start already released its slot; capacity remains
            // for the rest of the page.
            AdmitOutcome::Failed => continue,
        }
    }

    info!(scanned = stats.scanned, processed = stats.processed, "reconcile cycle finished");
    Ok(stats)
}

/// Drive `run_cycle` on a fixed interval until shutdown is signalled.
/// Cycle errors are logged and the loop keeps ticking.
pub async fn run_scheduler(
    controller: Arc<AdmissionController>,
    interval: Duration,
    page_size: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(&controller, page_size).await {
                    warn!(error = %e, "reconcile cycle failed");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("reconcile scheduler stopping");
                    return;
                }
            }
        }
    }
}
