use std::sync::LazyLock;

use regex::Regex;

static LINE_BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>\s*").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?[a-z][a-z0-9]*(?:\s[^>]*)?/?>").expect("valid regex"));
static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|\s*:?-{3,}:?\s*\|").expect("valid regex"));

/// Cleans model output before it is stored: `<br>` becomes a space, other
/// HTML tags are dropped, and table rows glued onto one line are split apart.
pub fn fix_markdown_tables(content: &str) -> String {
    let content = LINE_BREAK_TAG.replace_all(content, " ");
    let content = HTML_TAG.replace_all(&content, "");

    content
        .split('\n')
        .map(|line| {
            if line.contains("||") && SEPARATOR_CELL.is_match(line) {
                line.replace("||", "|\n|")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
