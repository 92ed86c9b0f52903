//! Splits an example report into chapters by its headings.
//!
//! Four heading styles are recognised, strongest first: `第N章` style,
//! Chinese ordinals (`一、`), Markdown `#`..`###`, Arabic ordinals (`1.`).
//! Only the strongest style present in a document is used to split it, so a
//! numbered list inside a chapter never starts a new chapter.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Title used when a document has no recognisable headings.
pub const UNTITLED_CHAPTER: &str = "章节一";

/// Ordinal-style lines longer than this are body text, not headings.
const MAX_HEADING_CHARS: usize = 60;

static NUMBERED_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^第[一二三四五六七八九十百千万零〇0-9]+[章节篇部段]").expect("valid regex")
});
static CHINESE_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[一二三四五六七八九十]+[、.．]").expect("valid regex"));
static ARABIC_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,2}(?:、|[.．](?:[^0-9]|$))").expect("valid regex"));
static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid regex"));
static ORDINAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:第[一二三四五六七八九十百千万零〇0-9]+[章节篇部段]|[一二三四五六七八九十]+[、.．]|[0-9]{1,2}[、.．])\s*")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChapter {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitOn {
    NumberedChapter,
    ChineseOrdinal,
    Markdown(usize),
    ArabicOrdinal,
}

#[derive(Debug)]
struct Candidate {
    line: usize,
    title: String,
    numbered: bool,
    chinese: bool,
    arabic: bool,
    markdown_level: Option<usize>,
}

impl Candidate {
    fn matches(&self, split: SplitOn) -> bool {
        match split {
            SplitOn::NumberedChapter => self.numbered,
            SplitOn::ChineseOrdinal => self.chinese,
            SplitOn::Markdown(level) => self.markdown_level == Some(level),
            SplitOn::ArabicOrdinal => self.arabic,
        }
    }
}

/// Strips `**bold**` wrapping and surrounding whitespace.
fn strip_emphasis(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("**")
        .and_then(|t| t.strip_suffix("**"))
        .map(str::trim)
        .unwrap_or(text)
}

fn classify(line: usize, raw: &str) -> Option<Candidate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (markdown_level, text) = match MARKDOWN_HEADING.captures(trimmed) {
        Some(caps) => {
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            let text = caps.get(2).map_or("", |m| m.as_str());
            ((1..=3).contains(&level).then_some(level), text)
        }
        None => (None, trimmed),
    };

    let title = strip_emphasis(text);
    if title.is_empty() {
        return None;
    }
    let short = title.chars().count() <= MAX_HEADING_CHARS;

    let candidate = Candidate {
        line,
        title: clean_repeated_title(title).to_string(),
        numbered: short && NUMBERED_CHAPTER.is_match(title),
        chinese: short && CHINESE_ORDINAL.is_match(title),
        arabic: short && ARABIC_ORDINAL.is_match(title),
        markdown_level,
    };

    let is_heading = candidate.numbered
        || candidate.chinese
        || candidate.arabic
        || candidate.markdown_level.is_some();
    is_heading.then_some(candidate)
}

fn choose_split(candidates: &[Candidate]) -> Option<SplitOn> {
    if candidates.iter().any(|c| c.numbered) {
        return Some(SplitOn::NumberedChapter);
    }
    if candidates.iter().any(|c| c.chinese) {
        return Some(SplitOn::ChineseOrdinal);
    }

    let count_at = |level: usize| {
        candidates
            .iter()
            .filter(|c| c.markdown_level == Some(level))
            .count()
    };
    let levels: Vec<usize> = (1..=3).filter(|&level| count_at(level) > 0).collect();
    if let Some(&shallowest) = levels.first() {
        // A lone top-level heading is the document title.
        let level = match levels.get(1) {
            Some(&deeper) if count_at(shallowest) == 1 => deeper,
            _ => shallowest,
        };
        return Some(SplitOn::Markdown(level));
    }

    candidates
        .iter()
        .any(|c| c.arabic)
        .then_some(SplitOn::ArabicOrdinal)
}

/// Parses `text` into chapters. Text before the first heading is dropped;
/// repeated headings are merged keeping the first position and the longest
/// content.
pub fn parse(text: &str) -> Vec<ParsedChapter> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    let candidates: Vec<Candidate> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| classify(i, line))
        .collect();

    let Some(split) = choose_split(&candidates) else {
        return vec![ParsedChapter {
            title: UNTITLED_CHAPTER.to_string(),
            content: text.to_string(),
        }];
    };

    let headings: Vec<&Candidate> = candidates.iter().filter(|c| c.matches(split)).collect();
    let mut chapters: Vec<ParsedChapter> = Vec::with_capacity(headings.len());
    let mut by_title: HashMap<String, usize> = HashMap::new();

    for (i, heading) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map_or(lines.len(), |next| next.line);
        let content = lines[heading.line + 1..end].join("\n").trim().to_string();

        match by_title.get(&heading.title) {
            Some(&existing) => {
                let kept = &mut chapters[existing];
                if content.chars().count() > kept.content.chars().count() {
                    kept.content = content;
                }
            }
            None => {
                by_title.insert(heading.title.clone(), chapters.len());
                chapters.push(ParsedChapter {
                    title: heading.title.clone(),
                    content,
                });
            }
        }
    }

    chapters
}

/// Title without its leading ordinal (`一、`, `第二章`, `3.`).
pub fn strip_ordinal(title: &str) -> &str {
    let title = title.trim();
    ORDINAL_PREFIX
        .find(title)
        .map_or(title, |m| title[m.end()..].trim_start())
}

/// Collapses a title made of one segment repeated, e.g. `一、概况一、概况`.
pub fn clean_repeated_title(title: &str) -> &str {
    let chars: Vec<char> = title.chars().collect();
    let len = chars.len();

    for segment_len in 1..=len / 2 {
        if len % segment_len != 0 {
            continue;
        }
        let segment = &chars[..segment_len];
        if chars.chunks(segment_len).all(|chunk| chunk == segment) {
            let end = title
                .char_indices()
                .nth(segment_len)
                .map_or(title.len(), |(i, _)| i);
            return &title[..end];
        }
    }
    title
}
