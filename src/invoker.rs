//! Downstream analysis service client.
//!
//! Admission only needs one call: start processing for a job id and get back
//! an opaque execution handle. The trait keeps the admission controller
//! testable without a live service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("downstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("downstream returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("downstream response missing execution handle: {0}")]
    Malformed(String),
}

/// Opaque handle for a started downstream execution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedExecution {
    pub execution_arn: String,
}

#[async_trait]
pub trait AnalysisInvoker: Send + Sync {
    /// Start downstream processing for the given job id. Non-2xx and
    /// transport failures are hard failures; retry happens, if at all, at
    /// the next reconciliation cycle.
    async fn start_analysis(&self, uuid: &str) -> Result<StartedExecution, InvokeError>;
}

/// Analysis options forwarded to the downstream service. Opaque to the
/// queue itself; defaults mirror the service's expected request shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    pub celeb: bool,
    pub face: bool,
    pub face_match: bool,
    pub label: bool,
    pub moderation: bool,
    pub person: bool,
    pub text: bool,
    pub transcript: bool,
    pub entity: bool,
    pub keyphrase: bool,
    pub sentiment: bool,
    pub topic: bool,
    pub document: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            celeb: true,
            face: false,
            face_match: false,
            label: false,
            moderation: false,
            person: false,
            text: false,
            transcript: false,
            entity: false,
            keyphrase: false,
            sentiment: false,
            topic: false,
            document: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    uuid: &'a str,
    input: StartInput,
}

#[derive(Debug, Serialize)]
struct StartInput {
    #[serde(rename = "aiOptions")]
    ai_options: AnalysisOptions,
}

/// HTTP implementation against the analysis service's REST surface.
pub struct HttpInvoker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInvoker {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AnalysisInvoker for HttpInvoker {
    async fn start_analysis(&self, uuid: &str) -> Result<StartedExecution, InvokeError> {
        let url = format!("{}/analysis", self.endpoint);
        let body = StartRequest {
            uuid,
            input: StartInput {
                ai_options: AnalysisOptions::default(),
            },
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let code = response.status();
        if !code.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InvokeError::Status {
                code: code.as_u16(),
                message,
            });
        }

        response
            .json::<StartedExecution>()
            .await
            .map_err(|e| InvokeError::Malformed(e.to_string()))
    }
}
