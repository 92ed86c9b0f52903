// Shared prompt fragments used by more than one service.
// Each feature module keeps its own prompts.rs for the rest.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Placeholder replaced with the tabular data summary.
pub const DATA_SUMMARY_PLACEHOLDER: &str = "{data_summary}";

/// Placeholder replaced with example excerpts (or nothing).
pub const EXAMPLES_TEXT_PLACEHOLDER: &str = "{examples_text}";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(data_summary|examples_text)\}").expect("valid regex"));

/// Heading that introduces the example excerpts inside a user prompt.
pub const EXAMPLES_HEADING: &str = "# 参考示例";

/// Separator between excerpts taken from different example documents.
pub const EXCERPT_SEPARATOR: &str = "\n\n---\n\n";

/// Labels one excerpt: `### 示例 N`.
pub fn excerpt_label(index: usize) -> String {
    format!("### 示例 {index}")
}

/// Fills both placeholders of a user prompt template.
///
/// Substitution is a single pass over the template, so placeholder text
/// inside the inserted values is kept verbatim. Unknown `{…}` sequences are
/// left untouched.
pub fn fill_placeholders(template: &str, data_summary: &str, examples_text: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[0] {
            DATA_SUMMARY_PLACEHOLDER => data_summary,
            _ => examples_text,
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_placeholders_keeps_unknown_braces() {
        let filled = fill_placeholders(
            "数据:{data_summary}\n{\"k\": 1}\n{examples_text}",
            "ROWS",
            "",
        );
        assert_eq!(filled, "数据:ROWS\n{\"k\": 1}\n");
    }

    #[test]
    fn test_fill_placeholders_replaces_every_occurrence() {
        let filled = fill_placeholders("{data_summary}|{data_summary}", "x", "");
        assert_eq!(filled, "x|x");
    }

    #[test]
    fn test_placeholder_text_inside_data_is_not_expanded() {
        let filled = fill_placeholders(
            "数据:{data_summary}\n示例:{examples_text}",
            "备注 {examples_text}",
            "EX",
        );
        assert_eq!(filled, "数据:备注 {examples_text}\n示例:EX");
    }
}
