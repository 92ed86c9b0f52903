//! Axum route handler for Word export.

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::export::docx::markdown_to_docx;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub content: String,
    pub filename: String,
}

/// `attachment` disposition with an RFC 5987 encoded UTF-8 file name.
fn content_disposition(filename: &str) -> String {
    let stem = match filename.trim().trim_end_matches(".docx") {
        "" => "report",
        stem => stem,
    };
    format!(
        "attachment; filename=\"report.docx\"; filename*=UTF-8''{}.docx",
        urlencoding::encode(stem)
    )
}

/// POST /api/report/export
///
/// Converts Markdown content to a Word document download.
pub async fn handle_export(Json(request): Json<ExportRequest>) -> Result<Response, AppError> {
    let bytes = markdown_to_docx(&request.content).map_err(|e| AppError::Export(e.to_string()))?;
    info!("Exported {} bytes for {}", bytes.len(), request.filename);

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&request.filename)),
        ],
        bytes,
    )
        .into_response())
}
