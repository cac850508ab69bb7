//! Remote zero-shot classifier client.
//!
//! Sends a bounded slice of extracted text plus the candidate label set to a
//! hosted inference endpoint. One call is exactly one network attempt; retry
//! policy lives in [`super::retry`] so it stays independently testable.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::{ClassifierConfig, LabelFormat};

/// A classification request: bounded text plus the candidate label set.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub text: String,
    pub labels: Vec<String>,
}

/// Raw decoded payload from the remote endpoint.
///
/// Parallel label/score sequences, unordered by score. Fields the endpoint
/// omits decode to empty sequences so callers still see whatever partial
/// structure was recoverable; the orchestrator decides how to degrade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteClassification {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub scores: Vec<f64>,
}

/// Failure categories for the remote classifier call.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Capacity signal from the endpoint (503/429). Retrying would compound
    /// load on a struggling dependency.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// Network or HTTP failure that may succeed on retry.
    #[error("transient classifier failure: {0}")]
    Transient(String),

    /// 2xx response whose body does not decode to the expected shape.
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),

    /// The retry budget was consumed without a successful attempt.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ClassifierError>,
    },
}

impl ClassifierError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifierError::Transient(_))
    }

    /// Short category name for logs.
    pub fn category(&self) -> &'static str {
        match self {
            ClassifierError::Unavailable(_) => "unavailable",
            ClassifierError::Transient(_) => "transient",
            ClassifierError::MalformedResponse(_) => "malformed_response",
            ClassifierError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}

/// A single attempt against the remote classifier.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RemoteClassification, ClassifierError>;
}

/// HTTP client for a hosted zero-shot classification endpoint.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    api_token: String,
    label_format: LabelFormat,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            label_format: config.label_format,
        }
    }

    fn request_body(&self, request: &ClassificationRequest) -> serde_json::Value {
        let candidate_labels = match self.label_format {
            LabelFormat::Array => json!(request.labels),
            LabelFormat::Delimited => json!(request.labels.join(", ")),
        };
        json!({
            "inputs": request.text,
            "parameters": { "candidate_labels": candidate_labels },
        })
    }
}

#[async_trait]
impl RemoteClassifier for HttpClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RemoteClassification, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| ClassifierError::Transient(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ClassifierError::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Transient(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let decoded: RemoteClassification = resp
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        debug!(
            labels = decoded.labels.len(),
            scores = decoded.scores.len(),
            "classifier response decoded"
        );
        Ok(decoded)
    }
}
