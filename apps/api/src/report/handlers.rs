//! Axum route handlers for the Report API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::report::data_summary::summarize_text;
use crate::report::generator::{generate_chapter, ChapterRequest, GeneratedChapter};
use crate::state::AppState;
use crate::storage::resolve_project_id;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub project_id: Option<String>,
    pub chapter: String,
    pub data_file_id: String,
    #[serde(default, alias = "example_files")]
    pub example_file_ids: Vec<String>,
    pub template_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateWithTextRequest {
    pub project_id: Option<String>,
    pub chapter: String,
    pub data_text: String,
    #[serde(default)]
    pub example_file_ids: Vec<String>,
    pub template_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub success: bool,
    pub chapter: String,
    pub content: String,
    pub template_id: String,
    pub template_name: String,
}

impl GenerateReportResponse {
    fn new(chapter: String, generated: GeneratedChapter) -> Self {
        Self {
            success: true,
            chapter,
            content: generated.content,
            template_id: generated.template_id,
            template_name: generated.template_name,
        }
    }
}

fn require_chapter(chapter: &str) -> Result<&str, AppError> {
    match chapter.trim() {
        "" => Err(AppError::Validation("chapter cannot be empty".to_string())),
        chapter => Ok(chapter),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/report/generate
///
/// Generates a chapter from a previously uploaded CSV data file.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateReportRequest>,
) -> Result<Json<GenerateReportResponse>, AppError> {
    let chapter = require_chapter(&request.chapter)?;
    let project_id = resolve_project_id(request.project_id.as_deref());

    let bytes = state
        .store
        .read_data_file(project_id, request.data_file_id.trim())
        .await?;
    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::Validation("Data file is not valid UTF-8".to_string()))?;
    let data_summary = summarize_text(text.trim_start_matches('\u{feff}'));

    let generated = generate_chapter(
        &state.store,
        state.llm.as_ref(),
        ChapterRequest {
            project_id,
            chapter,
            example_file_ids: &request.example_file_ids,
            template_id: request.template_id.as_deref(),
        },
        &data_summary,
    )
    .await?;

    Ok(Json(GenerateReportResponse::new(chapter.to_string(), generated)))
}

/// POST /api/report/generate-with-text
///
/// Generates a chapter from pasted text (Markdown table, TSV, CSV or prose).
pub async fn handle_generate_with_text(
    State(state): State<AppState>,
    Json(request): Json<GenerateWithTextRequest>,
) -> Result<Json<GenerateReportResponse>, AppError> {
    let chapter = require_chapter(&request.chapter)?;
    if request.data_text.trim().is_empty() {
        return Err(AppError::Validation("data_text cannot be empty".to_string()));
    }
    let project_id = resolve_project_id(request.project_id.as_deref());
    let data_summary = summarize_text(&request.data_text);

    let generated = generate_chapter(
        &state.store,
        state.llm.as_ref(),
        ChapterRequest {
            project_id,
            chapter,
            example_file_ids: &request.example_file_ids,
            template_id: request.template_id.as_deref(),
        },
        &data_summary,
    )
    .await?;

    Ok(Json(GenerateReportResponse::new(chapter.to_string(), generated)))
}
