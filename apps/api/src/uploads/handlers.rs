//! Axum route handlers for data and example uploads.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::example::ExampleFile;
use crate::models::ProjectQuery;
use crate::report::initializer::seed_project;
use crate::state::AppState;
use crate::storage::examples::{check_extension, DATA_EXTENSIONS, EXAMPLE_EXTENSIONS};
use crate::storage::resolve_project_id;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Multipart form: a `file` part and an optional `project_id` text part.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteExampleResponse {
    pub success: bool,
    pub message: String,
    pub project_id: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
}

/// Reads the upload form. A missing `file` part is a validation error.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut project_id = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().trim().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((filename, bytes));
            }
            Some("project_id") => {
                project_id = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing file field".to_string()))?;
    if filename.is_empty() {
        return Err(AppError::Validation("Uploaded file has no name".to_string()));
    }

    Ok(Upload {
        filename,
        bytes,
        project_id,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/upload/data
///
/// Stores a CSV data file for later report generation.
pub async fn handle_upload_data(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    check_extension(&upload.filename, DATA_EXTENSIONS)?;
    let project_id = resolve_project_id(upload.project_id.as_deref());

    let file_id = state
        .store
        .save_data_file(project_id, &upload.filename, &upload.bytes)
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        file_id,
        filename: upload.filename,
    }))
}

/// POST /api/upload/example
///
/// Stores an example report. A project without chapters is seeded from it
/// instead: chapters and templates are derived from the document.
pub async fn handle_upload_example(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    check_extension(&upload.filename, EXAMPLE_EXTENSIONS)?;
    let project_id = resolve_project_id(upload.project_id.as_deref());

    let file_id = if state.store.chapters(project_id).await?.is_empty() {
        info!("Project {project_id} has no chapters; seeding from {}", upload.filename);
        seed_project(
            &state.store,
            state.llm.as_ref(),
            project_id,
            &upload.filename,
            &upload.bytes,
        )
        .await?
        .example_file_id
    } else {
        state
            .store
            .add_example(project_id, &upload.filename, &upload.bytes)
            .await?
            .id
    };

    Ok(Json(UploadResponse {
        success: true,
        file_id,
        filename: upload.filename,
    }))
}

/// GET /api/upload/examples
pub async fn handle_list_examples(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<ExampleFile>>, AppError> {
    let project_id = resolve_project_id(query.project_id.as_deref());
    Ok(Json(state.store.list_examples(project_id).await?))
}

/// DELETE /api/upload/example/:file_id
pub async fn handle_delete_example(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<DeleteExampleResponse>, AppError> {
    let project_id = resolve_project_id(query.project_id.as_deref());
    state.store.remove_example(project_id, &file_id).await?;

    Ok(Json(DeleteExampleResponse {
        success: true,
        message: "Example file deleted successfully".to_string(),
        project_id: project_id.to_string(),
    }))
}
