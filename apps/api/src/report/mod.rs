// Report generation: data summaries, example excerpts, chapter generation
// and project seeding. All LLM calls go through llm_client::ChatModel.

pub mod chapter_parser;
pub mod data_summary;
pub mod documents;
pub mod excerpts;
pub mod generator;
pub mod handlers;
pub mod initializer;
pub mod postprocess;
