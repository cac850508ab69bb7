//! Document classification with graded degradation.
//!
//! The orchestrator here never fails: every remote failure mode is absorbed
//! into a structurally valid [`ClassificationResult`]. Classification is a
//! non-essential enrichment of the archival workflow, so a failed or degraded
//! classification must never block storage of the underlying document.

mod client;
mod retry;

pub use client::{
    ClassificationRequest, ClassifierError, HttpClassifier, RemoteClassification, RemoteClassifier,
};
pub use retry::RetryPolicy;

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::config::ClassifierConfig;

/// Ordered, immutable candidate categories. Loaded once at startup and
/// shared process-wide.
#[derive(Debug, Clone)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Outcome grade of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    /// Remote call succeeded with a well-formed response.
    Success,
    /// Remote classifier unreachable or out of capacity; sentinel substituted.
    FallbackUsed,
    /// Response shape was unusable; sentinel substituted.
    ParseError,
}

/// A labeled, confidence-scored classification outcome.
///
/// Invariants: `label` is never empty, `confidence` is never negative, and a
/// non-success status always carries the fallback sentinel with 0.0.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f64,
    pub status: ClassificationStatus,
}

/// Classification orchestrator: remote call behind the retry governor, with
/// fallback when the call cannot produce a trustworthy result.
pub struct ClassificationService {
    client: Arc<dyn RemoteClassifier>,
    retry: RetryPolicy,
    labels: LabelSet,
    fallback_label: String,
    max_text_chars: usize,
}

impl ClassificationService {
    pub fn new(client: Arc<dyn RemoteClassifier>, config: &ClassifierConfig) -> Self {
        Self {
            client,
            retry: RetryPolicy::new(config.retry.clone()),
            labels: LabelSet::new(config.labels.clone()),
            fallback_label: config.fallback_label.clone(),
            max_text_chars: config.max_text_chars,
        }
    }

    /// Classify extracted document text. Total: every failure mode comes
    /// back as a degraded result, never an error.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let request = ClassificationRequest {
            text: truncate(text, self.max_text_chars).to_string(),
            labels: self.labels.as_slice().to_vec(),
        };

        match self.retry.execute(|| self.client.classify(&request)).await {
            Ok(response) => self.select_label(&response),
            Err(
                err @ (ClassifierError::Unavailable(_)
                | ClassifierError::Transient(_)
                | ClassifierError::RetriesExhausted { .. }),
            ) => {
                warn!(category = err.category(), error = %err, "classification degraded to fallback");
                self.degraded(ClassificationStatus::FallbackUsed)
            }
            Err(err) => {
                warn!(category = err.category(), error = %err, "classifier response unusable");
                self.degraded(ClassificationStatus::ParseError)
            }
        }
    }

    fn select_label(&self, response: &RemoteClassification) -> ClassificationResult {
        if response.labels.is_empty() || response.labels.len() != response.scores.len() {
            warn!(
                labels = response.labels.len(),
                scores = response.scores.len(),
                "classifier response has unusable label/score sequences"
            );
            return self.degraded(ClassificationStatus::ParseError);
        }

        // First maximal score wins; strict comparison keeps the earliest
        // index on ties.
        let mut best = 0;
        for (i, score) in response.scores.iter().enumerate() {
            if *score > response.scores[best] {
                best = i;
            }
        }

        ClassificationResult {
            label: response.labels[best].clone(),
            confidence: round4(response.scores[best].max(0.0)),
            status: ClassificationStatus::Success,
        }
    }

    fn degraded(&self, status: ClassificationStatus) -> ClassificationResult {
        ClassificationResult {
            label: self.fallback_label.clone(),
            confidence: 0.0,
            status,
        }
    }
}

/// Truncate to at most `max` bytes at a UTF-8 boundary, keeping the prefix.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
