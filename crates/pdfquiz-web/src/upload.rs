use axum::extract::Multipart;
use axum::http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Form field carrying the PDF.
pub const FILE_FIELD: &str = "pdf_file";

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

/// Why an upload was rejected. The display text is shown to the user.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("No file part in the request.")]
    NoFilePart,
    #[error("No file selected.")]
    NoFileSelected,
    #[error("File type not allowed. Please upload a PDF.")]
    NotAllowed,
    #[error("File has a .pdf extension but doesn't appear to be a valid PDF.")]
    InvalidPdf,
    #[error("File is too large.")]
    TooLarge,
    #[error("Failed to read upload: {0}")]
    Read(String),
}

/// A validated PDF upload.
#[derive(Debug)]
pub struct UploadedPdf {
    /// Sanitised filename, safe to join onto a directory.
    pub filename: String,
    pub data: Vec<u8>,
}

/// Pull the PDF out of a multipart form, ignoring other fields.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadedPdf, UploadError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() == Some(FILE_FIELD) {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field.bytes().await.map_err(read_error)?.to_vec();
            upload = Some((filename, data));
        } else {
            let _ = field.bytes().await;
        }
    }

    let (filename, data) = upload.ok_or(UploadError::NoFilePart)?;
    validate(&filename, data)
}

fn read_error(e: axum::extract::multipart::MultipartError) -> UploadError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::Read(e.body_text())
    }
}

/// Check name and content of an uploaded file.
pub fn validate(filename: &str, data: Vec<u8>) -> Result<UploadedPdf, UploadError> {
    if filename.trim().is_empty() {
        return Err(UploadError::NoFileSelected);
    }
    if !allowed_file(filename) {
        return Err(UploadError::NotAllowed);
    }
    if !data.starts_with(b"%PDF-") {
        return Err(UploadError::InvalidPdf);
    }
    Ok(UploadedPdf {
        filename: secure_filename(filename),
        data,
    })
}

/// Only `.pdf` files (any case) are accepted.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}

/// Reduce a client-supplied filename to a safe basename.
pub fn secure_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches(['.', '_']);
    if cleaned.is_empty() || !allowed_file(cleaned) {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}
