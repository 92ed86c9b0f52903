use chrono::Utc;

use crate::models::project::{ChapterData, ProjectData};
use crate::storage::{read_json, validate_id, write_json, ProjectPaths, ProjectStore, StorageError};

impl ProjectStore {
    async fn load_data(
        &self,
        paths: &ProjectPaths,
        project_id: &str,
    ) -> Result<ProjectData, StorageError> {
        Ok(read_json(&paths.data_file)
            .await?
            .unwrap_or_else(|| ProjectData::new(project_id)))
    }

    async fn save_data(&self, paths: &ProjectPaths, mut data: ProjectData) -> Result<(), StorageError> {
        data.updated_at = Utc::now();
        write_json(&paths.data_file, &data).await
    }

    /// Saved input and output of a chapter; an empty record if nothing was saved yet.
    pub async fn chapter_data(
        &self,
        project_id: &str,
        chapter_id: &str,
    ) -> Result<ChapterData, StorageError> {
        validate_id(chapter_id, "chapter")?;
        let paths = self.project_paths(project_id).await?;
        let data = self.load_data(&paths, project_id).await?;
        Ok(data
            .chapters
            .get(chapter_id)
            .cloned()
            .unwrap_or_else(|| ChapterData::empty(chapter_id)))
    }

    /// Stores the chapter's input; `generated_content` is only replaced when given.
    pub async fn save_chapter_data(
        &self,
        project_id: &str,
        chapter_id: &str,
        input_data: String,
        generated_content: Option<String>,
    ) -> Result<ChapterData, StorageError> {
        self.update_chapter(project_id, chapter_id, |entry| {
            entry.input_data = input_data;
            if let Some(content) = generated_content {
                entry.generated_content = content;
            }
        })
        .await
    }

    pub async fn save_generated_content(
        &self,
        project_id: &str,
        chapter_id: &str,
        generated_content: String,
    ) -> Result<ChapterData, StorageError> {
        self.update_chapter(project_id, chapter_id, |entry| {
            entry.generated_content = generated_content;
        })
        .await
    }

    async fn update_chapter(
        &self,
        project_id: &str,
        chapter_id: &str,
        apply: impl FnOnce(&mut ChapterData),
    ) -> Result<ChapterData, StorageError> {
        validate_id(chapter_id, "chapter")?;
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut data = self.load_data(&paths, project_id).await?;
        let entry = data
            .chapters
            .entry(chapter_id.to_string())
            .or_insert_with(|| ChapterData::empty(chapter_id));
        apply(entry);
        entry.updated_at = Some(Utc::now());
        let saved = entry.clone();

        self.save_data(&paths, data).await?;
        Ok(saved)
    }

    /// Empties generated content (of one chapter, or all) while keeping input data.
    /// Returns the ids of chapters that actually had content.
    pub async fn clear_generated_content(
        &self,
        project_id: &str,
        chapter_id: Option<&str>,
    ) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut data = self.load_data(&paths, project_id).await?;
        let now = Utc::now();
        let mut cleared = Vec::new();

        for (id, entry) in data.chapters.iter_mut() {
            if chapter_id.is_some_and(|only| only != id) {
                continue;
            }
            if !entry.generated_content.is_empty() {
                entry.generated_content.clear();
                entry.updated_at = Some(now);
                cleared.push(id.clone());
            }
        }

        if !cleared.is_empty() {
            self.save_data(&paths, data).await?;
        }
        Ok(cleared)
    }
}
