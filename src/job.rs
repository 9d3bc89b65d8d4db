use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Job lifecycle status.
///
/// A job holds a reserved capacity slot iff it is `Started`. `Queued` and
/// `Error` jobs are backlog, eligible for a future admission attempt;
/// `Completed` is fully terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Started,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted job record, keyed by uuid. Wire form matches the stored JSON
/// (camelCase field names).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub uuid: String,
    pub status: JobStatus,
    /// Enqueue time, epoch millis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Terminal time, epoch millis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    /// Opaque execution handle from the downstream service, present once started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobRecord {
    pub fn new(uuid: &str, status: JobStatus) -> Self {
        Self {
            uuid: uuid.to_string(),
            status,
            timestamp: None,
            end_time: None,
            execution_arn: None,
            error_message: None,
        }
    }
}

/// Field updates merged into a job record by `QueueStore::upsert_job`.
/// Fields left `None` are preserved on the existing record.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub timestamp: Option<i64>,
    pub end_time: Option<i64>,
    pub execution_arn: Option<String>,
    pub error_message: Option<String>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(&self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(ts) = self.timestamp {
            record.timestamp = Some(ts);
        }
        if let Some(end) = self.end_time {
            record.end_time = Some(end);
        }
        if let Some(ref arn) = self.execution_arn {
            record.execution_arn = Some(arn.clone());
        }
        if let Some(ref msg) = self.error_message {
            record.error_message = Some(msg.clone());
        }
    }
}

/// Current wall-clock time as epoch millis
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
