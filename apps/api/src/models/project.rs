use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub order: u32,
}

/// User input and generated Markdown for one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterData {
    pub chapter_id: String,
    #[serde(default)]
    pub input_data: String,
    #[serde(default)]
    pub generated_content: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChapterData {
    pub fn empty(chapter_id: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            input_data: String::new(),
            generated_content: String::new(),
            updated_at: None,
        }
    }
}

/// On-disk layout of a project's `data.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub project_id: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub chapters: BTreeMap<String, ChapterData>,
}

impl ProjectData {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            updated_at: Utc::now(),
            chapters: BTreeMap::new(),
        }
    }
}
