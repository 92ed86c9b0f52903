//! Axum route handlers for the Prompt Template API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::template::{NewTemplate, PromptTemplate, TemplatePatch};
use crate::models::ProjectQuery;
use crate::prompts::defaults::display_name;
use crate::prompts::generator::generate_from_examples;
use crate::state::AppState;
use crate::storage::resolve_project_id;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub project_id: Option<String>,
    pub chapter: String,
    pub name: String,
    pub system_prompt: String,
    pub user_prompt_template: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub patch: TemplatePatch,
}

#[derive(Debug, Serialize)]
pub struct DeleteTemplateResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePromptRequest {
    pub project_id: Option<String>,
    pub chapter: String,
    pub chapter_title: Option<String>,
    #[serde(default)]
    pub example_file_ids: Vec<String>,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct GeneratePromptResponse {
    pub success: bool,
    pub chapter: String,
    pub system_prompt: String,
    pub user_prompt_template: String,
    pub analyzed_examples: usize,
    /// Present when the request asked for the result to be saved.
    pub template: Option<PromptTemplate>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/prompts/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<PromptTemplate>>, AppError> {
    let project_id = resolve_project_id(query.project_id.as_deref());
    Ok(Json(state.store.list_templates(project_id).await?))
}

/// GET /api/prompts/templates/chapter/:chapter
pub async fn handle_chapter_templates(
    State(state): State<AppState>,
    Path(chapter): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<PromptTemplate>>, AppError> {
    let project_id = resolve_project_id(query.project_id.as_deref());
    Ok(Json(state.store.chapter_templates(project_id, &chapter).await?))
}

/// GET /api/prompts/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<PromptTemplate>, AppError> {
    let project_id = resolve_project_id(query.project_id.as_deref());
    Ok(Json(state.store.template(project_id, &template_id).await?))
}

/// POST /api/prompts/templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<PromptTemplate>, AppError> {
    let project_id = resolve_project_id(request.project_id.as_deref());
    let template = state
        .store
        .create_template(
            project_id,
            NewTemplate {
                chapter: request.chapter,
                name: request.name,
                system_prompt: request.system_prompt,
                user_prompt_template: request.user_prompt_template,
                is_default: request.is_default,
            },
        )
        .await?;
    Ok(Json(template))
}

/// PUT /api/prompts/templates/:id
pub async fn handle_update_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<PromptTemplate>, AppError> {
    let project_id = resolve_project_id(request.project_id.as_deref());
    let template = state
        .store
        .update_template(project_id, &template_id, request.patch)
        .await?;
    Ok(Json(template))
}

/// DELETE /api/prompts/templates/:id
///
/// 400 when it is the last template of its chapter.
pub async fn handle_delete_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<DeleteTemplateResponse>, AppError> {
    let project_id = resolve_project_id(query.project_id.as_deref());
    state.store.delete_template(project_id, &template_id).await?;
    Ok(Json(DeleteTemplateResponse {
        success: true,
        message: "Template deleted successfully".to_string(),
    }))
}

/// POST /api/prompts/generate
///
/// Analyses example documents and drafts a template for the chapter.
/// With `save: true` the draft becomes the chapter's default template.
pub async fn handle_generate_prompt(
    State(state): State<AppState>,
    Json(request): Json<GeneratePromptRequest>,
) -> Result<Json<GeneratePromptResponse>, AppError> {
    let chapter = request.chapter.trim();
    if chapter.is_empty() {
        return Err(AppError::Validation("chapter cannot be empty".to_string()));
    }
    let project_id = resolve_project_id(request.project_id.as_deref());

    let analyzed = generate_from_examples(
        &state.store,
        state.llm.as_ref(),
        project_id,
        chapter,
        request.chapter_title.as_deref(),
        &request.example_file_ids,
    )
    .await?;
    let prompt = analyzed.prompt;

    let template = if request.save {
        let title = match request.chapter_title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => state.store.find_chapter(project_id, chapter).await?.title,
        };
        let saved = state
            .store
            .create_template(
                project_id,
                NewTemplate {
                    chapter: chapter.to_string(),
                    name: format!("AI 生成 - {}", display_name(&title)),
                    system_prompt: prompt.system_prompt.clone(),
                    user_prompt_template: prompt.user_prompt_template.clone(),
                    is_default: true,
                },
            )
            .await?;
        info!("Saved generated template {} for {chapter}", saved.id);
        Some(saved)
    } else {
        None
    };

    Ok(Json(GeneratePromptResponse {
        success: true,
        chapter: chapter.to_string(),
        system_prompt: prompt.system_prompt,
        user_prompt_template: prompt.user_prompt_template,
        analyzed_examples: analyzed.analyzed_examples,
        template,
    }))
}
