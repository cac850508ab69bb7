//! Request handlers for the classification service.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::pipeline::ProcessingError;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Materna Document Classifier - Up and running" }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "materna" }))
}

/// Accept a multipart upload (`file`, `patient_id`) and run the pipeline.
///
/// Degraded classification is reported inside a 200 response via
/// `classification.status`; only validation, extraction, and storage
/// failures map to HTTP errors.
pub async fn classify_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut patient_id: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((filename, bytes.to_vec())),
                    Err(e) => return bad_request(&format!("unreadable file field: {}", e)),
                }
            }
            Some("patient_id") => match field.text().await {
                Ok(text) => patient_id = Some(text),
                Err(e) => return bad_request(&format!("unreadable patient_id field: {}", e)),
            },
            _ => {}
        }
    }

    let Some((filename, bytes)) = file else {
        return bad_request("missing file field");
    };
    let Some(patient_id) = patient_id.filter(|p| !p.trim().is_empty()) else {
        return bad_request("missing patient_id field");
    };

    match state.pipeline.process(bytes, &filename, &patient_id).await {
        Ok(processed) => (
            StatusCode::OK,
            Json(json!({
                "patient_id": processed.patient_id,
                "classification": processed.classification,
                "storage_location": processed.storage_location,
                "status": "processed",
            })),
        )
            .into_response(),
        Err(ProcessingError::InvalidFileType(name)) => bad_request(&format!(
            "Invalid file type: {}. Only PDF/JPEG/PNG allowed",
            name
        )),
        Err(err) => {
            // Internal detail stays in the logs; callers get a redacted message.
            error!(error = %err, patient_id = %patient_id, "document processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Document processing failed" })),
            )
                .into_response()
        }
    }
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}
