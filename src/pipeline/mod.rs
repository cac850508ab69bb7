//! Document processing pipeline.
//!
//! Sequences validation → extraction → classification → storage for one
//! uploaded document. Classification is a non-essential enrichment: a
//! degraded classification never aborts the pipeline, while extraction and
//! storage failures are fatal to the request.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::classifier::{ClassificationResult, ClassificationService};
use crate::config::ACCEPTED_EXTENSIONS;
use crate::ocr::{ExtractionError, TextExtractor};
use crate::storage::{document_key, ObjectStore, StorageError};

/// Errors that abort processing of a single document.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Disallowed file extension; no I/O was performed.
    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    /// OCR failure. Fatal: extracted text is required input downstream and
    /// is not recoverable by retry.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Upload failure. Fatal: durability cannot be silently degraded.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Response record for a fully processed document.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub patient_id: String,
    pub classification: ClassificationResult,
    pub storage_location: String,
}

/// Per-request processing pipeline over injected collaborators.
pub struct DocumentPipeline {
    extractor: Arc<dyn TextExtractor>,
    classifier: Arc<ClassificationService>,
    store: Arc<dyn ObjectStore>,
}

impl DocumentPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        classifier: Arc<ClassificationService>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            store,
        }
    }

    /// Whether the filename carries an accepted extension.
    pub fn is_accepted_filename(filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_lowercase();
                ACCEPTED_EXTENSIONS.iter().any(|accepted| *accepted == e)
            })
            .unwrap_or(false)
    }

    /// Process one uploaded document end to end.
    ///
    /// Stages run strictly in sequence. Once classification returns, storage
    /// is always attempted; only a storage failure can abort from there.
    pub async fn process(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        patient_id: &str,
    ) -> Result<ProcessedDocument, ProcessingError> {
        if !Self::is_accepted_filename(filename) {
            return Err(ProcessingError::InvalidFileType(filename.to_string()));
        }

        let text = self.extractor.extract(&bytes, filename).await?;

        // Total call: remote failures come back as degraded results and
        // never block archival.
        let classification = self.classifier.classify(&text).await;

        let key = document_key(patient_id, &classification.label, filename);
        let storage_location = self.store.put(&key, bytes).await?;

        info!(
            patient_id,
            label = %classification.label,
            status = ?classification.status,
            "document processed"
        );

        Ok(ProcessedDocument {
            patient_id: patient_id.to_string(),
            classification,
            storage_location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::classifier::{
        ClassificationRequest, ClassificationStatus, ClassifierError, RemoteClassification,
        RemoteClassifier,
    };
    use crate::config::{ClassifierConfig, LabelFormat, RetryConfig};

    struct StubExtractor {
        calls: AtomicUsize,
        result: Option<String>,
    }

    impl StubExtractor {
        fn text(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: Some(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result: None,
            }
        }
    }

    #[async_trait]
    impl TextExtractor for StubExtractor {
        async fn extract(&self, _bytes: &[u8], _filename: &str) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Some(text) => Ok(text.clone()),
                None => Err(ExtractionError::ExtractionFailed("unreadable scan".into())),
            }
        }
    }

    struct StubStore {
        calls: AtomicUsize,
        keys: Mutex<Vec<String>>,
        fail: bool,
    }

    impl StubStore {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                keys: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl ObjectStore for StubStore {
        async fn put(&self, key: &str, _bytes: Vec<u8>) -> Result<String, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::Upload("bucket unreachable".into()));
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(format!("https://spaces.test/maternity/{}", key))
        }
    }

    struct FixedClassifier(Result<RemoteClassification, ()>);

    #[async_trait]
    impl RemoteClassifier for FixedClassifier {
        async fn classify(
            &self,
            _request: &ClassificationRequest,
        ) -> Result<RemoteClassification, ClassifierError> {
            match &self.0 {
                Ok(response) => Ok(response.clone()),
                Err(()) => Err(ClassifierError::Unavailable("HTTP 503".into())),
            }
        }
    }

    fn classifier_config() -> ClassifierConfig {
        ClassifierConfig {
            endpoint: "https://classifier.test".to_string(),
            api_token: "token".to_string(),
            labels: vec![
                "ultrasound report".to_string(),
                "blood test results".to_string(),
            ],
            fallback_label: "unclassified document".to_string(),
            max_text_chars: 5000,
            request_timeout: Duration::from_secs(30),
            label_format: LabelFormat::Array,
            retry: RetryConfig {
                max_attempts: 2,
                base: Duration::from_millis(1),
                min_wait: Duration::from_millis(1),
                max_wait: Duration::from_millis(5),
            },
        }
    }

    fn pipeline_with(
        extractor: Arc<StubExtractor>,
        remote: FixedClassifier,
        store: Arc<StubStore>,
    ) -> DocumentPipeline {
        let classifier = Arc::new(ClassificationService::new(
            Arc::new(remote),
            &classifier_config(),
        ));
        DocumentPipeline::new(extractor, classifier, store)
    }

    fn healthy_remote() -> FixedClassifier {
        FixedClassifier(Ok(RemoteClassification {
            labels: vec![
                "ultrasound report".to_string(),
                "blood test results".to_string(),
            ],
            scores: vec![0.91, 0.05],
        }))
    }

    #[test]
    fn test_accepted_extensions() {
        assert!(DocumentPipeline::is_accepted_filename("scan.pdf"));
        assert!(DocumentPipeline::is_accepted_filename("scan.PNG"));
        assert!(DocumentPipeline::is_accepted_filename("photo.jpeg"));
        assert!(!DocumentPipeline::is_accepted_filename("report.docx"));
        assert!(!DocumentPipeline::is_accepted_filename("noextension"));
    }

    #[tokio::test]
    async fn test_invalid_extension_fails_before_any_io() {
        let extractor = Arc::new(StubExtractor::text("ignored"));
        let store = Arc::new(StubStore::new());
        let pipeline = pipeline_with(extractor.clone(), healthy_remote(), store.clone());

        let result = pipeline
            .process(b"bytes".to_vec(), "report.docx", "p-1")
            .await;

        assert!(matches!(result, Err(ProcessingError::InvalidFileType(_))));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_processing_stores_under_normalized_label() {
        let extractor = Arc::new(StubExtractor::text("ultrasound at 20 weeks"));
        let store = Arc::new(StubStore::new());
        let pipeline = pipeline_with(extractor, healthy_remote(), store.clone());

        let processed = pipeline
            .process(b"bytes".to_vec(), "scan.pdf", "p-42")
            .await
            .unwrap();

        assert_eq!(processed.patient_id, "p-42");
        assert_eq!(processed.classification.label, "ultrasound report");
        assert_eq!(processed.classification.confidence, 0.91);
        assert_eq!(
            store.keys.lock().unwrap().as_slice(),
            ["patients/p-42/ultrasound_report/scan.pdf"]
        );
        assert!(processed.storage_location.ends_with("scan.pdf"));
    }

    #[tokio::test]
    async fn test_degraded_classification_still_stores_document() {
        let extractor = Arc::new(StubExtractor::text("some text"));
        let store = Arc::new(StubStore::new());
        let pipeline = pipeline_with(extractor, FixedClassifier(Err(())), store.clone());

        let processed = pipeline
            .process(b"bytes".to_vec(), "scan.jpg", "p-7")
            .await
            .unwrap();

        assert_eq!(
            processed.classification.status,
            ClassificationStatus::FallbackUsed
        );
        assert_eq!(processed.classification.label, "unclassified document");
        assert_eq!(
            store.keys.lock().unwrap().as_slice(),
            ["patients/p-7/unclassified_document/scan.jpg"]
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal_and_skips_storage() {
        let extractor = Arc::new(StubExtractor::failing());
        let store = Arc::new(StubStore::new());
        let pipeline = pipeline_with(extractor, healthy_remote(), store.clone());

        let result = pipeline.process(b"bytes".to_vec(), "scan.png", "p-1").await;

        assert!(matches!(result, Err(ProcessingError::Extraction(_))));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_surfaced() {
        let extractor = Arc::new(StubExtractor::text("text"));
        let store = Arc::new(StubStore::failing());
        let pipeline = pipeline_with(extractor, healthy_remote(), store);

        let result = pipeline.process(b"bytes".to_vec(), "scan.png", "p-1").await;
        assert!(matches!(result, Err(ProcessingError::Storage(_))));
    }
}
