//! Runtime configuration for the materna service.
//!
//! Everything is resolved once at startup via [`Settings::from_env`] and
//! handed to components explicitly. Nothing below the binary boundary reads
//! the process environment. Missing required values are a startup error,
//! not a silent default.

use std::time::Duration;

use anyhow::{bail, Context};

/// Default candidate labels for maternity document classification.
pub const DEFAULT_LABELS: [&str; 4] = [
    "ultrasound report",
    "blood test results",
    "urine analysis",
    "prenatal screening",
];

/// Label substituted when classification cannot produce a trustworthy result.
pub const DEFAULT_FALLBACK_LABEL: &str = "unclassified document";

/// File extensions accepted for upload.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// Wire shape of `candidate_labels` in the classification request.
///
/// Endpoint versions differ: some expect a JSON array, others a single
/// comma-delimited string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelFormat {
    /// `"candidate_labels": ["a", "b"]`
    #[default]
    Array,
    /// `"candidate_labels": "a, b"`
    Delimited,
}

impl LabelFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "array" => Some(Self::Array),
            "delimited" | "string" => Some(Self::Delimited),
            _ => None,
        }
    }
}

/// Retry policy knobs for the remote classifier call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempt budget, including the first attempt.
    pub max_attempts: u32,
    /// Exponential base wait.
    pub base: Duration,
    /// Lower clamp on the wait between attempts.
    pub min_wait: Duration,
    /// Upper clamp on the wait between attempts.
    pub max_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(1),
            min_wait: Duration::from_secs(4),
            max_wait: Duration::from_secs(10),
        }
    }
}

/// Remote classifier endpoint configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Inference endpoint URL.
    pub endpoint: String,
    /// Bearer credential for the endpoint.
    pub api_token: String,
    /// Ordered candidate label set.
    pub labels: Vec<String>,
    /// Fallback sentinel label.
    pub fallback_label: String,
    /// Hard cap on text length sent per request.
    pub max_text_chars: usize,
    /// Per-attempt network timeout.
    pub request_timeout: Duration,
    /// Wire shape for `candidate_labels`.
    pub label_format: LabelFormat,
    pub retry: RetryConfig,
}

/// S3-compatible object store configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub classifier: ClassifierConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

fn require(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {}", name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn var_parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated label list, dropping empty entries.
fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// Supported env vars:
    /// - `CLASSIFIER_ENDPOINT` (required): inference endpoint URL
    /// - `CLASSIFIER_API_TOKEN` (required): bearer credential
    /// - `CLASSIFIER_LABELS`: comma-separated candidate labels
    /// - `CLASSIFIER_FALLBACK_LABEL`: fallback sentinel
    /// - `CLASSIFIER_MAX_TEXT_CHARS`: text cap per request
    /// - `CLASSIFIER_TIMEOUT_SECS`: per-attempt network timeout
    /// - `CLASSIFIER_LABEL_FORMAT`: "array" or "delimited"
    /// - `CLASSIFIER_MAX_ATTEMPTS`: retry budget
    /// - `SPACES_ENDPOINT` (required): object store endpoint URL
    /// - `SPACES_ACCESS_KEY` / `SPACES_SECRET_KEY` (required): credentials
    /// - `SPACES_BUCKET` (required): bucket name
    /// - `SPACES_REGION`: region name
    /// - `SERVER_HOST` / `SERVER_PORT`: bind address
    pub fn from_env() -> anyhow::Result<Self> {
        let labels = match std::env::var("CLASSIFIER_LABELS") {
            Ok(raw) => {
                let labels = parse_labels(&raw);
                if labels.is_empty() {
                    bail!("CLASSIFIER_LABELS is set but contains no labels");
                }
                labels
            }
            Err(_) => DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        };

        let label_format = match std::env::var("CLASSIFIER_LABEL_FORMAT") {
            Ok(raw) => LabelFormat::parse(&raw)
                .ok_or_else(|| anyhow::anyhow!("invalid CLASSIFIER_LABEL_FORMAT: {}", raw))?,
            Err(_) => LabelFormat::default(),
        };

        let classifier = ClassifierConfig {
            endpoint: require("CLASSIFIER_ENDPOINT")?,
            api_token: require("CLASSIFIER_API_TOKEN")?,
            labels,
            fallback_label: var_or("CLASSIFIER_FALLBACK_LABEL", DEFAULT_FALLBACK_LABEL),
            max_text_chars: var_parsed("CLASSIFIER_MAX_TEXT_CHARS", 5000)?,
            request_timeout: Duration::from_secs(var_parsed("CLASSIFIER_TIMEOUT_SECS", 30)?),
            label_format,
            retry: RetryConfig {
                max_attempts: var_parsed("CLASSIFIER_MAX_ATTEMPTS", 3)?,
                ..RetryConfig::default()
            },
        };

        let storage = StorageConfig {
            endpoint: require("SPACES_ENDPOINT")?,
            access_key: require("SPACES_ACCESS_KEY")?,
            secret_key: require("SPACES_SECRET_KEY")?,
            bucket: require("SPACES_BUCKET")?,
            region: var_or("SPACES_REGION", "us-east-1"),
        };

        let server = ServerConfig {
            host: var_or("SERVER_HOST", "0.0.0.0"),
            port: var_parsed("SERVER_PORT", 8000)?,
        };

        Ok(Self {
            classifier,
            storage,
            server,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        let labels = parse_labels("ultrasound report, blood test results,urine analysis");
        assert_eq!(
            labels,
            vec!["ultrasound report", "blood test results", "urine analysis"]
        );
    }

    #[test]
    fn test_parse_labels_drops_empty_entries() {
        let labels = parse_labels("a,, b ,");
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn test_label_format_parse() {
        assert_eq!(LabelFormat::parse("array"), Some(LabelFormat::Array));
        assert_eq!(LabelFormat::parse("Delimited"), Some(LabelFormat::Delimited));
        assert_eq!(LabelFormat::parse("string"), Some(LabelFormat::Delimited));
        assert_eq!(LabelFormat::parse("csv"), None);
    }

    #[test]
    fn test_retry_defaults_match_wait_bounds() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert!(retry.min_wait <= retry.max_wait);
        assert!(retry.base <= retry.min_wait);
    }
}
