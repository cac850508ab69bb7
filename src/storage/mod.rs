//! Object storage for archived documents.
//!
//! Documents land in an S3-compatible bucket (DigitalOcean Spaces in
//! production) under a key derived from patient, classification label, and
//! original filename. Submitting the same triple twice overwrites the
//! object; there is no versioning.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use thiserror::Error;
use tracing::debug;

use crate::config::StorageConfig;

/// Errors that can occur while archiving document bytes.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
}

/// Collaborator interface for archiving document bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, returning a location reference.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
}

/// Lowercase a classification label and replace spaces with underscores so
/// it can be used as a key segment.
pub fn normalize_label(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

/// Key layout: `patients/{patient_id}/{normalized_label}/{filename}`.
pub fn document_key(patient_id: &str, label: &str, filename: &str) -> String {
    format!(
        "patients/{}/{}/{}",
        patient_id,
        normalize_label(label),
        filename
    )
}

/// S3-compatible object store client.
pub struct SpacesStore {
    client: aws_sdk_s3::Client,
    endpoint: String,
    bucket: String,
}

impl SpacesStore {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "materna",
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            endpoint: config.endpoint.clone(),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for SpacesStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        debug!(key, bucket = %self.bucket, "document stored");
        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Blood Test Results"), "blood_test_results");
        assert_eq!(normalize_label("ultrasound report"), "ultrasound_report");
        assert_eq!(normalize_label("unclassified document"), "unclassified_document");
    }

    #[test]
    fn test_document_key_layout() {
        let key = document_key("p-123", "ultrasound report", "scan.pdf");
        assert_eq!(key, "patients/p-123/ultrasound_report/scan.pdf");
    }

    #[test]
    fn test_document_key_is_deterministic() {
        // Same triple twice produces the same key (overwrite, not duplication).
        let first = document_key("p-1", "urine analysis", "a.png");
        let second = document_key("p-1", "urine analysis", "a.png");
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_triples_do_not_collide() {
        let a = document_key("p-1", "urine analysis", "a.png");
        let b = document_key("p-2", "urine analysis", "a.png");
        let c = document_key("p-1", "blood test results", "a.png");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
