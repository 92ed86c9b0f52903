// Prompt templates: built-in defaults, CRUD handlers and AI-assisted authoring.
// All LLM calls go through llm_client::ChatModel.

pub mod authoring;
pub mod defaults;
pub mod generator;
pub mod handlers;
