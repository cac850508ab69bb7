//! Materna - maternity document classification and archival service.
//!
//! Accepts scanned medical documents over HTTP, extracts their text with
//! OCR, classifies them against a fixed maternity label set via a remote
//! zero-shot inference endpoint, and archives the original bytes in
//! S3-compatible object storage under a key derived from the classification.

mod classifier;
mod config;
mod ocr;
mod pipeline;
mod server;
mod storage;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "materna=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = config::Settings::from_env()?;
    server::serve(&settings).await
}
