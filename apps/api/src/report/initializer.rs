//! Project seeding: one reference report becomes the project's chapters,
//! templates and only example.
//!
//! All LLM work happens before anything is written, so a failed seed leaves
//! the project untouched.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::ChatModel;
use crate::models::project::Chapter;
use crate::models::template::{PromptTemplate, TemplateSet};
use crate::prompts::generator::generate_template_from_contents;
use crate::report::chapter_parser::{self, clean_repeated_title};
use crate::report::documents::extract_text;
use crate::storage::examples::{check_extension, EXAMPLE_EXTENSIONS};
use crate::storage::ProjectStore;

#[derive(Debug, Clone, Serialize)]
pub struct SeedResult {
    pub success: bool,
    pub project_id: String,
    pub chapters: Vec<Chapter>,
    pub templates_generated: usize,
    pub example_file_id: String,
    pub filename: String,
}

/// Parses `bytes` into chapters, drafts a template per chapter, then replaces
/// the project's examples, chapters and templates.
pub async fn seed_project(
    store: &ProjectStore,
    llm: &dyn ChatModel,
    project_id: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<SeedResult, AppError> {
    check_extension(filename, EXAMPLE_EXTENSIONS)?;
    if bytes.is_empty() {
        return Err(AppError::Validation("上传的文件为空".to_string()));
    }
    store.get_project(project_id).await?;

    let text = extract_text(bytes, filename)?;
    let parsed = chapter_parser::parse(&text);
    if parsed.is_empty() {
        return Err(AppError::Validation(
            "未在文档中识别到章节，请检查文档格式".to_string(),
        ));
    }
    info!(
        "Seeding project {project_id} from {filename}: {} chapter(s)",
        parsed.len()
    );

    let mut chapters = Vec::with_capacity(parsed.len());
    let mut templates = TemplateSet::new();

    for (index, section) in parsed.iter().enumerate() {
        let number = index + 1;
        let chapter_id = format!("chapter_{number}");
        let title = match clean_repeated_title(section.title.trim()) {
            "" => format!("章节{number}"),
            title => title.to_string(),
        };

        let content = if section.content.trim().is_empty() {
            title.clone()
        } else {
            section.content.clone()
        };
        let prompt = generate_template_from_contents(llm, &[content], &title).await?;
        info!("Drafted template for {chapter_id} ({title})");

        let now = Utc::now();
        templates.insert(
            chapter_id.clone(),
            vec![PromptTemplate {
                id: Uuid::new_v4().to_string(),
                name: format!("AI 生成 - {title}"),
                chapter: chapter_id.clone(),
                system_prompt: prompt.system_prompt,
                user_prompt_template: prompt.user_prompt_template,
                is_default: true,
                created_at: now,
                updated_at: now,
            }],
        );
        chapters.push(Chapter {
            id: chapter_id,
            title,
            order: index as u32,
        });
    }

    let example = store.replace_examples(project_id, filename, bytes).await?;
    let chapters = store.save_chapters(project_id, chapters).await?;
    store.replace_templates(project_id, &templates).await?;
    store.update_project(project_id, None).await?;

    info!(
        "Seeded project {project_id}: {} chapters, example {}",
        chapters.len(),
        example.id
    );

    Ok(SeedResult {
        success: true,
        project_id: project_id.to_string(),
        chapters,
        templates_generated: templates.len(),
        example_file_id: example.id,
        filename: filename.to_string(),
    })
}
