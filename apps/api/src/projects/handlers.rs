//! Axum route handlers for the Project API.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::project::{Chapter, ChapterData, Project};
use crate::report::initializer::{seed_project, SeedResult};
use crate::state::AppState;
use crate::uploads::handlers::read_upload;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProjectNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteProjectResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveChapterDataRequest {
    #[serde(default)]
    pub input_data: String,
    pub generated_content: Option<String>,
}

/// Optional narrowing of clear-generated to one chapter, by body or query.
#[derive(Debug, Default, Deserialize)]
pub struct ClearGeneratedRequest {
    pub chapter_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearGeneratedResponse {
    pub success: bool,
    pub project_id: String,
    pub cleared_chapters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    #[serde(flatten)]
    pub result: SeedResult,
    pub project: Project,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/projects
pub async fn handle_list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.store.list_projects().await?))
}

/// POST /api/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    Json(request): Json<ProjectNameRequest>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(state.store.create_project(&request.name).await?))
}

/// GET /api/projects/:id
pub async fn handle_get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(state.store.get_project(&project_id).await?))
}

/// PUT /api/projects/:id
pub async fn handle_rename_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(request): Json<ProjectNameRequest>,
) -> Result<Json<Project>, AppError> {
    let project = state
        .store
        .update_project(&project_id, Some(&request.name))
        .await?;
    Ok(Json(project))
}

/// DELETE /api/projects/:id
///
/// The default project cannot be deleted.
pub async fn handle_delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<DeleteProjectResponse>, AppError> {
    state.store.delete_project(&project_id).await?;
    Ok(Json(DeleteProjectResponse {
        success: true,
        id: project_id,
    }))
}

/// GET /api/projects/:id/chapters
pub async fn handle_get_chapters(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Chapter>>, AppError> {
    Ok(Json(state.store.chapters(&project_id).await?))
}

/// PUT /api/projects/:id/chapters
pub async fn handle_save_chapters(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(chapters): Json<Vec<Chapter>>,
) -> Result<Json<Vec<Chapter>>, AppError> {
    Ok(Json(state.store.save_chapters(&project_id, chapters).await?))
}

/// GET /api/projects/:id/chapters/:chapter_id/data
pub async fn handle_get_chapter_data(
    State(state): State<AppState>,
    Path((project_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<ChapterData>, AppError> {
    Ok(Json(state.store.chapter_data(&project_id, &chapter_id).await?))
}

/// POST /api/projects/:id/chapters/:chapter_id/data
///
/// Saves the chapter's input; generated content is replaced only when sent.
pub async fn handle_save_chapter_data(
    State(state): State<AppState>,
    Path((project_id, chapter_id)): Path<(String, String)>,
    Json(request): Json<SaveChapterDataRequest>,
) -> Result<Json<ChapterData>, AppError> {
    let data = state
        .store
        .save_chapter_data(
            &project_id,
            &chapter_id,
            request.input_data,
            request.generated_content,
        )
        .await?;
    Ok(Json(data))
}

/// POST /api/projects/:id/clear-generated
///
/// Empties generated content and keeps input data. Narrowed to one chapter
/// by `chapter_id` in the query or body.
pub async fn handle_clear_generated(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<ClearGeneratedRequest>,
    body: Option<Json<ClearGeneratedRequest>>,
) -> Result<Json<ClearGeneratedResponse>, AppError> {
    let chapter_id = body
        .and_then(|Json(b)| b.chapter_id)
        .or(query.chapter_id)
        .filter(|id| !id.trim().is_empty());

    let cleared_chapters = state
        .store
        .clear_generated_content(&project_id, chapter_id.as_deref())
        .await?;

    Ok(Json(ClearGeneratedResponse {
        success: true,
        project_id,
        cleared_chapters,
    }))
}

/// POST /api/projects/:id/seed
///
/// Rebuilds the project's chapters and templates from one reference report.
pub async fn handle_seed_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SeedResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let result = seed_project(
        &state.store,
        state.llm.as_ref(),
        &project_id,
        &upload.filename,
        &upload.bytes,
    )
    .await?;
    let project = state.store.get_project(&project_id).await?;

    Ok(Json(SeedResponse { result, project }))
}
