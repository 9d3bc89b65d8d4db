//! Admission controller: the only code allowed to touch the capacity
//! counter or transition a job's status.
//!
//! Lifecycle driven here:
//!
//! - `enqueue`: queued when no slot is free, started when the slot and the
//!   downstream call both succeed, error (slot released) when the downstream
//!   call fails.
//! - `complete`: terminal transition out of started, releasing the slot.
//! - `admit_one`: backlog variant of `enqueue` used by reconciliation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::counter::SlotGrant;
use crate::invoker::{AnalysisInvoker, InvokeError};
use crate::job::{now_ms, JobPatch, JobRecord, JobStatus};
use crate::store::{QueueStore, StoreError};

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Result of admitting a fresh job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// No free slot; the job waits in the backlog.
    Queued,
    /// Slot reserved and downstream processing started.
    Started { execution_arn: String },
}

/// Result of an admission attempt for a backlog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    Started,
    /// Capacity exhausted; further attempts are futile this cycle.
    NoCapacity,
    /// Downstream start failed; slot released, record left in the backlog.
    Failed,
}

/// Terminal outcome delivered for a started job.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed,
    Error(String),
}

pub struct AdmissionController {
    store: Arc<QueueStore>,
    invoker: Arc<dyn AnalysisInvoker>,
}

impl AdmissionController {
    pub fn new(store: Arc<QueueStore>, invoker: Arc<dyn AnalysisInvoker>) -> Self {
        Self { store, invoker }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    /// Admit a fresh job: reserve a slot and start downstream processing,
    /// or park the job as queued when capacity is exhausted.
    ///
    /// On downstream failure the reserved slot is released best-effort, the
    /// job is recorded as `error`, and the original failure propagates.
    pub async fn enqueue(&self, uuid: &str) -> Result<EnqueueOutcome, AdmissionError> {
        let now = now_ms();
        match self.store.acquire_slot().await? {
            SlotGrant::OutOfRange => {
                self.store
                    .upsert_job(
                        uuid,
                        JobPatch {
                            status: Some(JobStatus::Queued),
                            timestamp: Some(now),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(uuid = %uuid, "no free slot, job queued");
                Ok(EnqueueOutcome::Queued)
            }
            SlotGrant::Granted(count) => match self.invoker.start_analysis(uuid).await {
                Ok(execution) => {
                    self.store
                        .upsert_job(
                            uuid,
                            JobPatch {
                                status: Some(JobStatus::Started),
                                timestamp: Some(now),
                                execution_arn: Some(execution.execution_arn.clone()),
                                ..Default::default()
                            },
                        )
                        .await?;
                    info!(uuid = %uuid, count, execution_arn = %execution.execution_arn, "job started");
                    Ok(EnqueueOutcome::Started {
                        execution_arn: execution.execution_arn,
                    })
                }
                Err(e) => {
                    self.release_best_effort(uuid).await;
                    // Record the failure so reconciliation can retry later,
                    // without letting a record-write failure mask the
                    // original downstream error.
                    if let Err(store_err) = self
                        .store
                        .upsert_job(
                            uuid,
                            JobPatch {
                                status: Some(JobStatus::Error),
                                timestamp: Some(now),
                                error_message: Some(e.to_string()),
                                ..Default::default()
                            },
                        )
                        .await
                    {
                        warn!(uuid = %uuid, error = %store_err, "failed to record error status");
                    }
                    Err(AdmissionError::Invoke(e))
                }
            },
        }
    }

    /// Record the terminal outcome for a started job and release its slot.
    ///
    /// Precondition: the job was previously admitted to `started`. This is
    /// trusted, not re-validated; a release for a job that never held a slot
    /// is an upstream logic error.
    pub async fn complete(
        &self,
        uuid: &str,
        outcome: AnalysisOutcome,
    ) -> Result<JobRecord, AdmissionError> {
        match self.store.release_slot().await? {
            SlotGrant::Granted(count) => info!(uuid = %uuid, count, "slot released"),
            SlotGrant::OutOfRange => {
                warn!(uuid = %uuid, "release found counter already at its floor")
            }
        }

        let patch = match outcome {
            AnalysisOutcome::Completed => JobPatch {
                status: Some(JobStatus::Completed),
                end_time: Some(now_ms()),
                ..Default::default()
            },
            AnalysisOutcome::Error(message) => JobPatch {
                status: Some(JobStatus::Error),
                end_time: Some(now_ms()),
                error_message: Some(message),
                ..Default::default()
            },
        };
        Ok(self.store.upsert_job(uuid, patch).await?)
    }

    /// Admission attempt for an already-materialized backlog record. Unlike
    /// `enqueue` this never rewrites the enqueue timestamp, and a downstream
    /// failure leaves the record untouched for the next cycle.
    pub async fn admit_one(&self, job: &JobRecord) -> Result<AdmitOutcome, AdmissionError> {
        match self.store.acquire_slot().await? {
            SlotGrant::OutOfRange => Ok(AdmitOutcome::NoCapacity),
            SlotGrant::Granted(_) => match self.invoker.start_analysis(&job.uuid).await {
                Ok(execution) => {
                    self.store
                        .upsert_job(
                            &job.uuid,
                            JobPatch {
                                status: Some(JobStatus::Started),
                                execution_arn: Some(execution.execution_arn),
                                ..Default::default()
                            },
                        )
                        .await?;
                    info!(uuid = %job.uuid, "backlog job started");
                    Ok(AdmitOutcome::Started)
                }
                Err(e) => {
                    warn!(uuid = %job.uuid, error = %e, "downstream start failed for backlog job");
                    self.release_best_effort(&job.uuid).await;
                    Ok(AdmitOutcome::Failed)
                }
            },
        }
    }

    // Best-effort unwind of a reserved slot. Its own failure is logged and
    // swallowed: the periodic drain absorbs the bounded accounting drift,
    // and escalating here would mask the failure that triggered the unwind.
    async fn release_best_effort(&self, uuid: &str) {
        match self.store.release_slot().await {
            Ok(SlotGrant::Granted(_)) => {}
            Ok(SlotGrant::OutOfRange) => {
                warn!(uuid = %uuid, "unwind release found counter already at its floor");
            }
            Err(e) => {
                warn!(uuid = %uuid, error = %e, "failed to release slot during unwind");
            }
        }
    }
}
