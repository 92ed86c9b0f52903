use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A system/user prompt pair for one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub chapter: String,
    pub system_prompt: String,
    pub user_prompt_template: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Templates grouped by chapter id, as stored in `prompts/templates.json`.
pub type TemplateSet = BTreeMap<String, Vec<PromptTemplate>>;

/// Fields accepted when creating a template.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub chapter: String,
    pub name: String,
    pub system_prompt: String,
    pub user_prompt_template: String,
    pub is_default: bool,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub system_prompt: Option<String>,
    pub user_prompt_template: Option<String>,
    pub is_default: Option<bool>,
}
