//! Lifecycle notification handling.
//!
//! Delivered events name the pipeline that finished and its terminal status.
//! An ingest completion enqueues the job for analysis; an analysis outcome
//! releases the job's slot. Anything unrecognizable is silently ignored:
//! the notification bus carries payloads this service has no interest in.

use serde::Deserialize;
use tracing::debug;

use crate::admission::{AdmissionController, AdmissionError, AnalysisOutcome, EnqueueOutcome};

const INGEST_MARKER: &str = "-ingest";
const ANALYSIS_MARKER: &str = "-analysis";
const STATUS_COMPLETED: &str = "COMPLETED";
const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub state_machine: String,
    pub status: String,
    pub uuid: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// What the handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Ingest finished; job admitted or parked as queued.
    Enqueued(EnqueueOutcome),
    /// Analysis finished; slot released, terminal status recorded.
    Completed,
    /// Analysis errored; slot released, error recorded.
    Errored,
    /// Not a recognizable lifecycle event for this queue.
    Ignored,
}

/// Parse a raw notification payload. Unparseable payloads are `None`, never
/// an error.
pub fn parse_event(raw: &[u8]) -> Option<LifecycleEvent> {
    serde_json::from_slice(raw).ok()
}

/// Route a parsed lifecycle event through the admission controller.
pub async fn handle_event(
    controller: &AdmissionController,
    event: &LifecycleEvent,
) -> Result<NotifyOutcome, AdmissionError> {
    if event.state_machine.contains(INGEST_MARKER) && event.status == STATUS_COMPLETED {
        let outcome = controller.enqueue(&event.uuid).await?;
        return Ok(NotifyOutcome::Enqueued(outcome));
    }

    if event.state_machine.contains(ANALYSIS_MARKER) {
        if event.status == STATUS_COMPLETED {
            controller
                .complete(&event.uuid, AnalysisOutcome::Completed)
                .await?;
            return Ok(NotifyOutcome::Completed);
        }
        if event.status == STATUS_ERROR {
            let message = event
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            controller
                .complete(&event.uuid, AnalysisOutcome::Error(message))
                .await?;
            return Ok(NotifyOutcome::Errored);
        }
    }

    debug!(state_machine = %event.state_machine, status = %event.status, "ignoring event");
    Ok(NotifyOutcome::Ignored)
}

/// Handle a raw payload end to end: malformed bytes are a no-op.
pub async fn handle_raw(
    controller: &AdmissionController,
    raw: &[u8],
) -> Result<NotifyOutcome, AdmissionError> {
    match parse_event(raw) {
        Some(event) => handle_event(controller, &event).await,
        None => Ok(NotifyOutcome::Ignored),
    }
}
