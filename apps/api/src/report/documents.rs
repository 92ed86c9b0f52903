//! Text extraction from uploaded example documents.

use std::path::Path;

use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use thiserror::Error;

use crate::storage::examples::extension_of;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported document format: {0}")]
    Unsupported(String),

    #[error("Failed to read Word document: {0}")]
    Docx(String),

    #[error("Document {0} is not valid UTF-8 text")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts plain text (Markdown for tables) from a document's bytes.
/// The format is taken from `filename`'s extension.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, DocumentError> {
    match extension_of(filename).as_deref() {
        Some(".md" | ".markdown") => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| DocumentError::Encoding(filename.to_string()))?;
            Ok(text.trim_start_matches('\u{feff}').to_string())
        }
        Some(".docx") => extract_docx(bytes),
        Some(".doc") => Err(DocumentError::Unsupported(
            "legacy .doc files cannot be read; save the document as .docx".to_string(),
        )),
        Some(other) => Err(DocumentError::Unsupported(other.to_string())),
        None => Err(DocumentError::Unsupported(format!("{filename} has no extension"))),
    }
}

/// Reads a stored document from disk.
pub async fn read_document(path: &Path) -> Result<String, DocumentError> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_text(&bytes, &filename)
}

fn extract_docx(bytes: &[u8]) -> Result<String, DocumentError> {
    let docx = read_docx(bytes).map_err(|e| DocumentError::Docx(e.to_string()))?;

    let mut blocks: Vec<String> = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(para) => {
                let text = paragraph_text(para);
                if !text.trim().is_empty() {
                    blocks.push(text);
                }
            }
            DocumentChild::Table(table) => {
                let markdown = table_markdown(table);
                if !markdown.is_empty() {
                    blocks.push(markdown);
                }
            }
            _ => {}
        }
    }

    Ok(blocks.join("\n\n"))
}

fn paragraph_text(para: &Paragraph) -> String {
    para.children
        .iter()
        .filter_map(|pc| match pc {
            ParagraphChild::Run(run) => Some(
                run.children
                    .iter()
                    .filter_map(|rc| match rc {
                        RunChild::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect::<String>(),
            ),
            _ => None,
        })
        .collect()
}

/// Renders a Word table as a Markdown table; the first row is the header.
#[allow(irrefutable_let_patterns)]
fn table_markdown(table: &Table) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for row_child in &table.rows {
        let TableChild::TableRow(row) = row_child else {
            continue;
        };
        let mut cells = Vec::new();
        for cell_child in &row.cells {
            let TableRowChild::TableCell(cell) = cell_child else {
                continue;
            };
            let text = cell
                .children
                .iter()
                .filter_map(|content| match content {
                    TableCellContent::Paragraph(para) => Some(paragraph_text(para)),
                    _ => None,
                })
                .filter(|t| !t.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            cells.push(text.trim().replace('|', "\\|"));
        }
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, cells) in rows.iter().enumerate() {
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(cells.len())));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run, TableCell, TableRow};

    fn build_docx(docx: Docx) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_markdown_is_read_as_utf8_without_bom() {
        let bytes = "\u{feff}# 标题\n内容".as_bytes();
        assert_eq!(extract_text(bytes, "a.MD").unwrap(), "# 标题\n内容");
    }

    #[test]
    fn test_invalid_utf8_markdown_is_rejected() {
        assert!(matches!(
            extract_text(&[0xff, 0xfe, 0x00], "a.md"),
            Err(DocumentError::Encoding(_))
        ));
    }

    #[test]
    fn test_legacy_doc_is_unsupported() {
        assert!(matches!(
            extract_text(b"\xd0\xcf\x11\xe0", "old.doc"),
            Err(DocumentError::Unsupported(_))
        ));
    }

    #[test]
    fn test_docx_paragraphs_and_tables() {
        let docx = Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("一、概况")))
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("本月共受理"))
                    .add_run(Run::new().add_text("1200件。")),
            )
            .add_table(Table::new(vec![
                TableRow::new(vec![
                    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("类别"))),
                    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("数量"))),
                ]),
                TableRow::new(vec![
                    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("投诉"))),
                    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("30"))),
                ]),
            ]));

        let text = extract_text(&build_docx(docx), "report.docx").unwrap();
        assert!(text.starts_with("一、概况\n\n本月共受理1200件。"));
        assert!(text.contains("| 类别 | 数量 |\n| --- | --- |\n| 投诉 | 30 |"));
    }

    #[test]
    fn test_garbage_docx_is_reported() {
        assert!(matches!(
            extract_text(b"not a zip", "x.docx"),
            Err(DocumentError::Docx(_))
        ));
    }
}
