//! HTTP surface for document classification uploads.
//!
//! Exposes the multipart `POST /classify` endpoint plus liveness routes,
//! wiring the OCR, classifier, and object-store collaborators into a
//! per-request pipeline.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::classifier::{ClassificationService, HttpClassifier};
use crate::config::Settings;
use crate::ocr::{TesseractExtractor, TextExtractor};
use crate::pipeline::DocumentPipeline;
use crate::storage::{ObjectStore, SpacesStore};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocumentPipeline>,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let client = Arc::new(HttpClassifier::new(&settings.classifier));
        let classifier = Arc::new(ClassificationService::new(client, &settings.classifier));
        let extractor: Arc<dyn TextExtractor> = Arc::new(TesseractExtractor::new());
        let store: Arc<dyn ObjectStore> = Arc::new(SpacesStore::new(&settings.storage));

        Self {
            pipeline: Arc::new(DocumentPipeline::new(extractor, classifier, store)),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let state = AppState::new(settings);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
