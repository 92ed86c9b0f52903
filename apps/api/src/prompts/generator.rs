//! Template authoring: example chapters in, system/user prompt pair out.
//!
//! Flow: collect excerpts for the chapter → style-analysis LLM call →
//!       extract JSON → make sure both report placeholders are present.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{DATA_SUMMARY_PLACEHOLDER, EXAMPLES_TEXT_PLACEHOLDER};
use crate::llm_client::{extract_json_object, ChatModel, LlmError, Sampling};
use crate::prompts::authoring::{analysis_prompt, ANALYSIS_SYSTEM};
use crate::prompts::defaults::display_name;
use crate::report::excerpts::{collect_excerpts, format_excerpts, ExcerptTarget};
use crate::storage::ProjectStore;

/// Prompt pair produced by the analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPrompt {
    pub system_prompt: String,
    pub user_prompt_template: String,
}

/// A generated prompt plus how many example chapters fed it.
#[derive(Debug, Clone)]
pub struct AnalyzedPrompt {
    pub prompt: GeneratedPrompt,
    pub analyzed_examples: usize,
}

impl GeneratedPrompt {
    /// Appends whichever report placeholder the model left out.
    fn ensure_placeholders(mut self) -> Self {
        for placeholder in [DATA_SUMMARY_PLACEHOLDER, EXAMPLES_TEXT_PLACEHOLDER] {
            if !self.user_prompt_template.contains(placeholder) {
                self.user_prompt_template.push_str("\n\n");
                self.user_prompt_template.push_str(placeholder);
            }
        }
        self
    }
}

/// Asks the model for a template matching the style of `contents`.
pub async fn generate_template_from_contents(
    llm: &dyn ChatModel,
    contents: &[String],
    chapter_name: &str,
) -> Result<GeneratedPrompt, LlmError> {
    let user = analysis_prompt(chapter_name, &format_excerpts(contents));
    let reply = llm.complete(ANALYSIS_SYSTEM, &user, Sampling::AUTHORING).await?;

    let json = extract_json_object(&reply)?;
    let prompt: GeneratedPrompt = serde_json::from_str(json)?;
    if prompt.system_prompt.trim().is_empty() || prompt.user_prompt_template.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }

    Ok(prompt.ensure_placeholders())
}

/// Generates a template for `chapter_id` from the project's example documents.
/// An empty `example_ids` means every example of the project.
pub async fn generate_from_examples(
    store: &ProjectStore,
    llm: &dyn ChatModel,
    project_id: &str,
    chapter_id: &str,
    chapter_title: Option<&str>,
    example_ids: &[String],
) -> Result<AnalyzedPrompt, AppError> {
    let example_ids = if example_ids.is_empty() {
        let all: Vec<String> = store
            .list_examples(project_id)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        info!("Using all {} examples of project {project_id}", all.len());
        all
    } else {
        example_ids.to_vec()
    };
    if example_ids.is_empty() {
        return Err(AppError::Validation(
            "No example documents available".to_string(),
        ));
    }

    let chapters = store.chapters(project_id).await?;
    let mut target = ExcerptTarget::for_chapter(&chapters, chapter_id);
    if let Some(title) = chapter_title.map(str::trim).filter(|t| !t.is_empty()) {
        target.title = Some(title);
    }

    let contents = collect_excerpts(store, project_id, &example_ids, target).await?;
    if contents.is_empty() {
        warn!("No chapter content extracted for {chapter_id} in project {project_id}");
        return Err(AppError::Validation(
            "Failed to extract any chapter content from the provided examples".to_string(),
        ));
    }

    let chapter_name = target.title.map(display_name).unwrap_or(chapter_id);
    info!(
        "Generating template for {chapter_id} from {} example(s)",
        contents.len()
    );
    let prompt = generate_template_from_contents(llm, &contents, chapter_name).await?;

    Ok(AnalyzedPrompt {
        prompt,
        analyzed_examples: contents.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::test_support::StubModel;
    use crate::storage::test_support::temp_store;
    use crate::storage::DEFAULT_PROJECT_ID;

    const REPLY: &str = "分析如下：\n```json\n{\"system_prompt\": \"你是分析师\", \"user_prompt_template\": \"请撰写：{data_summary}\"}\n```";

    #[tokio::test]
    async fn test_missing_placeholder_is_appended() {
        let llm = StubModel::replying(REPLY);
        let prompt = generate_template_from_contents(&llm, &["正文".to_string()], "基本情况")
            .await
            .unwrap();
        assert_eq!(prompt.system_prompt, "你是分析师");
        assert_eq!(prompt.user_prompt_template, "请撰写：{data_summary}\n\n{examples_text}");

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, ANALYSIS_SYSTEM);
        assert!(calls[0].user.contains("### 示例 1\n\n正文"));
        assert!((calls[0].temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_reply_without_required_fields_is_an_error() {
        let llm = StubModel::replying("{\"system_prompt\": \"只有一半\"}");
        let err = generate_template_from_contents(&llm, &["正文".to_string()], "章节")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));

        let llm = StubModel::replying("抱歉，无法生成");
        let err = generate_template_from_contents(&llm, &["正文".to_string()], "章节")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NoJson));
    }

    #[tokio::test]
    async fn test_generate_from_all_examples_uses_matching_chapter() {
        let (_dir, store) = temp_store().await;
        let report = "一、全区社会治理基本情况\n本月受理事件1200件。\n二、高频社会治理问题隐患分析研判\n噪音投诉较多。";
        store
            .add_example(DEFAULT_PROJECT_ID, "九月.md", report.as_bytes())
            .await
            .unwrap();

        let llm = StubModel::replying(REPLY);
        let result = generate_from_examples(&store, &llm, DEFAULT_PROJECT_ID, "chapter_2", None, &[])
            .await
            .unwrap();
        assert_eq!(result.analyzed_examples, 1);

        let user = &llm.calls()[0].user;
        assert!(user.contains("\"高频社会治理问题隐患分析研判\"章节"));
        assert!(user.contains("噪音投诉较多。"));
        assert!(!user.contains("本月受理事件"));
    }

    #[tokio::test]
    async fn test_generate_without_examples_is_rejected() {
        let (_dir, store) = temp_store().await;
        let llm = StubModel::replying(REPLY);
        let err = generate_from_examples(&store, &llm, DEFAULT_PROJECT_ID, "chapter_1", None, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(llm.calls().is_empty());
    }
}
