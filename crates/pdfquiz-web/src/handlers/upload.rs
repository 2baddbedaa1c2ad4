use axum::Extension;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::sync::Arc;

use pdfquiz_core::extract_non_empty;

use crate::session::SessionId;
use crate::state::AppState;
use crate::template;
use crate::upload::{self, UploadError};

pub async fn upload_form() -> Html<String> {
    template::render_upload(None)
}

pub async fn upload_submit(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let Ok(multipart) = multipart else {
        return template::render_upload(Some(&UploadError::NoFilePart.to_string()))
            .into_response();
    };

    match extract_upload(&state, multipart).await {
        Ok(text) => {
            state
                .sessions
                .update(&session.0, |s| s.extracted_text = Some(text));
            Redirect::to("/apikey-entry").into_response()
        }
        Err(message) => template::render_upload(Some(&message)).into_response(),
    }
}

/// Validate the upload, write it to a temp dir, and extract its text.
/// The temp dir is removed before returning, on success or failure.
async fn extract_upload(state: &AppState, multipart: Multipart) -> Result<String, String> {
    let upload = upload::parse_multipart(multipart)
        .await
        .map_err(|e| e.to_string())?;

    let temp_dir =
        tempfile::tempdir().map_err(|e| format!("Error processing file: {}", e))?;
    let pdf_path = temp_dir.path().join(&upload.filename);
    tokio::fs::write(&pdf_path, &upload.data)
        .await
        .map_err(|e| format!("Error processing file: {}", e))?;

    // MuPDF is blocking
    let backend = Arc::clone(&state.pdf_backend);
    let result =
        tokio::task::spawn_blocking(move || extract_non_empty(backend.as_ref(), &pdf_path)).await;
    drop(temp_dir);

    let text = result
        .map_err(|e| format!("Error processing file: {}", e))?
        .map_err(|e| {
            tracing::warn!(file = %upload.filename, error = %e, "PDF extraction failed");
            format!("Error processing file: {}", e)
        })?;

    tracing::info!(file = %upload.filename, chars = text.len(), "extracted PDF text");
    Ok(text)
}
