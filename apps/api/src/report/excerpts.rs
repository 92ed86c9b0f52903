//! Picks the part of each example document that matches a chapter.

use tracing::{debug, warn};

use crate::llm_client::prompts::{excerpt_label, EXCERPT_SEPARATOR};
use crate::models::project::Chapter;
use crate::report::chapter_parser::{self, strip_ordinal, ParsedChapter};
use crate::report::documents::read_document;
use crate::storage::{ProjectStore, StorageError};

/// Which chapter of an example document is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcerptTarget<'a> {
    pub title: Option<&'a str>,
    pub index: Option<usize>,
}

impl<'a> ExcerptTarget<'a> {
    /// Targets `chapter_id` by its title and position in `chapters`.
    pub fn for_chapter(chapters: &'a [Chapter], chapter_id: &str) -> Self {
        match chapters.iter().position(|c| c.id == chapter_id) {
            Some(index) => Self {
                title: Some(chapters[index].title.as_str()),
                index: Some(index),
            },
            None => Self::default(),
        }
    }
}

fn same_title(a: &str, b: &str) -> bool {
    let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    squash(a) == squash(b) || squash(strip_ordinal(a)) == squash(strip_ordinal(b))
}

/// Content of the wanted chapter: by title, else by position, else the
/// whole document.
pub fn select_excerpt<'a>(
    document: &'a str,
    parsed: &'a [ParsedChapter],
    target: ExcerptTarget<'_>,
) -> &'a str {
    let non_empty = |c: &&ParsedChapter| !c.content.is_empty();

    if let Some(title) = target.title {
        if let Some(found) = parsed.iter().filter(non_empty).find(|c| same_title(&c.title, title)) {
            return &found.content;
        }
    }
    if let Some(found) = target.index.and_then(|i| parsed.get(i)).filter(non_empty) {
        return &found.content;
    }
    document.trim()
}

/// Reads the given examples and returns one excerpt per readable document.
/// Missing or unreadable documents are skipped.
pub async fn collect_excerpts(
    store: &ProjectStore,
    project_id: &str,
    example_ids: &[String],
    target: ExcerptTarget<'_>,
) -> Result<Vec<String>, StorageError> {
    let mut excerpts = Vec::new();

    for id in example_ids {
        let (example, path) = match store.example(project_id, id).await {
            Ok(found) => found,
            Err(StorageError::NotFound(msg)) => {
                warn!("Skipping example: {msg}");
                continue;
            }
            Err(e) => return Err(e),
        };

        let text = match read_document(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping example {} ({}): {e}", example.id, example.name);
                continue;
            }
        };

        let parsed = chapter_parser::parse(&text);
        let excerpt = select_excerpt(&text, &parsed, target);
        debug!(
            example = %example.name,
            chapters = parsed.len(),
            excerpt_len = excerpt.len(),
            "Selected example excerpt"
        );
        if !excerpt.is_empty() {
            excerpts.push(excerpt.to_string());
        }
    }

    Ok(excerpts)
}

/// `### 示例 N` blocks separated by horizontal rules.
pub fn format_excerpts(excerpts: &[String]) -> String {
    excerpts
        .iter()
        .enumerate()
        .map(|(i, content)| format!("{}\n\n{content}", excerpt_label(i + 1)))
        .collect::<Vec<_>>()
        .join(EXCERPT_SEPARATOR)
}
