// Word export: Markdown chapters rendered as .docx with the report styling.

pub mod docx;
pub mod handlers;
