//! Chapter generation: orchestrates the report pipeline for one chapter.
//!
//! Flow: select template → collect example excerpts → fill placeholders →
//!       LLM generate → fix Markdown → persist as the chapter's content.

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::{fill_placeholders, EXAMPLES_HEADING};
use crate::llm_client::{ChatModel, Sampling};
use crate::models::template::PromptTemplate;
use crate::report::excerpts::{collect_excerpts, format_excerpts, ExcerptTarget};
use crate::report::postprocess::fix_markdown_tables;
use crate::storage::{ProjectStore, StorageError, DEFAULT_PROJECT_ID};

/// What to generate.
#[derive(Debug, Clone, Copy)]
pub struct ChapterRequest<'a> {
    pub project_id: &'a str,
    pub chapter: &'a str,
    pub example_file_ids: &'a [String],
    pub template_id: Option<&'a str>,
}

/// Generated Markdown and the template that produced it.
#[derive(Debug, Clone)]
pub struct GeneratedChapter {
    pub content: String,
    pub template_id: String,
    pub template_name: String,
}

/// Explicit template id (also looked up in the default project), else the
/// chapter's default template.
async fn select_template(
    store: &ProjectStore,
    project_id: &str,
    chapter: &str,
    template_id: Option<&str>,
) -> Result<PromptTemplate, AppError> {
    match template_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => match store.template(project_id, id).await {
            Ok(template) => Ok(template),
            Err(StorageError::NotFound(_)) if project_id != DEFAULT_PROJECT_ID => {
                Ok(store.template(DEFAULT_PROJECT_ID, id).await?)
            }
            Err(e) => Err(e.into()),
        },
        None => store
            .default_template(project_id, chapter)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No prompt template found for chapter {chapter}"))
            }),
    }
}

/// Builds the `{examples_text}` value: a headed excerpt block, or nothing.
fn examples_text(excerpts: &[String]) -> String {
    if excerpts.is_empty() {
        String::new()
    } else {
        format!("\n\n{EXAMPLES_HEADING}\n\n{}", format_excerpts(excerpts))
    }
}

/// Generates one chapter from a prepared data summary and stores the result
/// as the chapter's generated content.
pub async fn generate_chapter(
    store: &ProjectStore,
    llm: &dyn ChatModel,
    request: ChapterRequest<'_>,
    data_summary: &str,
) -> Result<GeneratedChapter, AppError> {
    let ChapterRequest {
        project_id,
        chapter,
        example_file_ids,
        template_id,
    } = request;

    // Step 1: Template
    let template = select_template(store, project_id, chapter, template_id).await?;
    info!(
        "Generating {chapter} in project {project_id} with template {} ({})",
        template.id, template.name
    );

    // Step 2: Example excerpts
    let chapters = store.chapters(project_id).await?;
    let target = ExcerptTarget::for_chapter(&chapters, chapter);
    let excerpts = collect_excerpts(store, project_id, example_file_ids, target).await?;
    info!(
        "Using {} example excerpt(s) of {} requested",
        excerpts.len(),
        example_file_ids.len()
    );

    // Step 3: Prompt assembly and LLM call
    let user_prompt = fill_placeholders(
        &template.user_prompt_template,
        data_summary,
        &examples_text(&excerpts),
    );
    let raw = llm
        .complete(&template.system_prompt, &user_prompt, Sampling::REPORT)
        .await?;

    // Step 4: Clean up and persist
    let content = fix_markdown_tables(&raw);
    store
        .save_generated_content(project_id, chapter, content.clone())
        .await?;
    info!("Generated {} chars for {chapter}", content.len());

    Ok(GeneratedChapter {
        content,
        template_id: template.id,
        template_name: template.name,
    })
}
