//! Markdown → Word (.docx) conversion with the fixed report styling.

use std::io::Cursor;

use docx_rs::{
    BreakType, Docx, Paragraph, Run, RunFonts, Style, StyleType, Table, TableCell, TableRow,
};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::report::documents::DocumentError;

const BODY_FONT: &str = "仿宋";
const HEADING_FONT: &str = "黑体";
const LATIN_FONT: &str = "Times New Roman";

// Sizes are in half-points.
const BODY_SIZE: usize = 28;
const HEADING_SIZES: [usize; 3] = [44, 32, 30];

fn fonts(east_asia: &str) -> RunFonts {
    RunFonts::new()
        .east_asia(east_asia)
        .ascii(LATIN_FONT)
        .hi_ansi(LATIN_FONT)
}

fn heading_style(level: usize) -> Style {
    Style::new(&format!("Heading{level}"), StyleType::Paragraph)
        .name(&format!("Heading {level}"))
        .size(HEADING_SIZES[level - 1])
        .bold()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Body,
    Heading(usize),
}

enum Element {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Default)]
struct TableState {
    rows: Vec<TableRow>,
    cells: Vec<TableCell>,
    in_head: bool,
}

struct DocxWriter {
    elements: Vec<Element>,
    runs: Vec<Run>,
    block: BlockKind,
    strong: usize,
    emphasis: usize,
    /// Next number of each open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    item_prefix: Option<String>,
    table: Option<TableState>,
    code: Option<String>,
}

impl DocxWriter {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            runs: Vec::new(),
            block: BlockKind::Body,
            strong: 0,
            emphasis: 0,
            lists: Vec::new(),
            item_prefix: None,
            table: None,
            code: None,
        }
    }

    fn text_run(&self, text: &str) -> Run {
        let (run, heading) = match self.block {
            BlockKind::Heading(level) => (
                Run::new()
                    .add_text(text)
                    .fonts(fonts(HEADING_FONT))
                    .size(HEADING_SIZES[level - 1]),
                true,
            ),
            BlockKind::Body => (
                Run::new().add_text(text).fonts(fonts(BODY_FONT)).size(BODY_SIZE),
                false,
            ),
        };
        let header_cell = self.table.as_ref().is_some_and(|t| t.in_head);

        let run = if heading || header_cell || self.strong > 0 {
            run.bold()
        } else {
            run
        };
        if self.emphasis > 0 {
            run.italic()
        } else {
            run
        }
    }

    fn push_text(&mut self, text: &str) {
        let run = match self.item_prefix.take() {
            Some(prefix) => self.text_run(&format!("{prefix}{text}")),
            None => self.text_run(text),
        };
        self.runs.push(run);
    }

    fn paragraph(&mut self) -> Paragraph {
        if let Some(prefix) = self.item_prefix.take() {
            let run = self.text_run(&prefix);
            self.runs.push(run);
        }
        let paragraph = match self.block {
            BlockKind::Heading(level) => Paragraph::new().style(&format!("Heading{level}")),
            BlockKind::Body => Paragraph::new(),
        };
        self.runs
            .drain(..)
            .fold(paragraph, |paragraph, run| paragraph.add_run(run))
    }

    /// Emits the pending runs as a paragraph, if there are any.
    fn finish_paragraph(&mut self) {
        if self.runs.is_empty() && self.item_prefix.is_none() {
            return;
        }
        let paragraph = self.paragraph();
        self.elements.push(Element::Paragraph(paragraph));
    }

    fn start_item(&mut self) {
        self.finish_paragraph();
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(Some(next)) => {
                let marker = format!("{next}. ");
                *next += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        self.item_prefix = Some(format!("{}{marker}", "  ".repeat(depth)));
    }

    fn finish_cell(&mut self) {
        let paragraph = self.paragraph();
        if let Some(table) = self.table.as_mut() {
            table.cells.push(TableCell::new().add_paragraph(paragraph));
        }
    }

    fn finish_row(&mut self) {
        if let Some(table) = self.table.as_mut() {
            let cells = std::mem::take(&mut table.cells);
            if !cells.is_empty() {
                table.rows.push(TableRow::new(cells));
            }
        }
    }

    fn finish_code_block(&mut self) {
        let Some(code) = self.code.take() else {
            return;
        };
        for line in code.lines() {
            let run = self.text_run(line);
            self.elements
                .push(Element::Paragraph(Paragraph::new().add_run(run)));
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code.as_mut() {
                Some(code) => code.push_str(&text),
                None => self.push_text(&text),
            },
            Event::Code(text) => self.push_text(&text),
            Event::SoftBreak | Event::HardBreak => {
                if !self.runs.is_empty() {
                    self.runs
                        .push(Run::new().add_break(BreakType::TextWrapping));
                }
            }
            // Raw HTML, rules and footnotes have no Word counterpart here.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.finish_paragraph();
                self.block = BlockKind::Heading((level as usize).clamp(1, 3));
            }
            Tag::List(start) => {
                self.finish_paragraph();
                self.lists.push(start);
            }
            Tag::Item => self.start_item(),
            Tag::Table(_) => {
                self.finish_paragraph();
                self.table = Some(TableState::default());
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            Tag::CodeBlock(_) => {
                self.finish_paragraph();
                self.code = Some(String::new());
            }
            Tag::Strong => self.strong += 1,
            Tag::Emphasis => self.emphasis += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item => self.finish_paragraph(),
            TagEnd::Heading(_) => {
                self.finish_paragraph();
                self.block = BlockKind::Body;
            }
            TagEnd::List(_) => {
                self.finish_paragraph();
                self.lists.pop();
            }
            TagEnd::TableCell => self.finish_cell(),
            TagEnd::TableHead => {
                self.finish_row();
                if let Some(table) = self.table.as_mut() {
                    table.in_head = false;
                }
            }
            TagEnd::TableRow => self.finish_row(),
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    if !table.rows.is_empty() {
                        self.elements.push(Element::Table(Table::new(table.rows)));
                    }
                }
            }
            TagEnd::CodeBlock => self.finish_code_block(),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            _ => {}
        }
    }

    fn into_docx(mut self) -> Docx {
        self.finish_paragraph();
        let base = (1..=HEADING_SIZES.len()).fold(
            Docx::new()
                .default_fonts(fonts(BODY_FONT))
                .default_size(BODY_SIZE),
            |docx, level| docx.add_style(heading_style(level)),
        );
        self.elements
            .into_iter()
            .fold(base, |docx, element| match element {
                Element::Paragraph(p) => docx.add_paragraph(p),
                Element::Table(t) => docx.add_table(t),
            })
    }
}

/// Renders Markdown as a Word document and returns the packed bytes.
pub fn markdown_to_docx(markdown: &str) -> Result<Vec<u8>, DocumentError> {
    let mut writer = DocxWriter::new();
    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        writer.handle(event);
    }

    let mut buf = Cursor::new(Vec::new());
    writer
        .into_docx()
        .build()
        .pack(&mut buf)
        .map_err(|e| DocumentError::Docx(e.to_string()))?;
    Ok(buf.into_inner())
}
