use std::collections::HashSet;
use std::io::ErrorKind;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::models::project::{Chapter, Project};
use crate::prompts::defaults::default_chapters;
use crate::report::chapter_parser::clean_repeated_title;
use crate::storage::{
    read_json, validate_id, write_json, ProjectPaths, ProjectStore, StorageError,
    DEFAULT_PROJECT_ID, DEFAULT_PROJECT_NAME,
};

impl ProjectStore {
    async fn load_index(&self) -> Result<Vec<Project>, StorageError> {
        Ok(read_json(&self.index_file()).await?.unwrap_or_default())
    }

    async fn save_index(&self, projects: &[Project]) -> Result<(), StorageError> {
        write_json(&self.index_file(), projects).await
    }

    /// Caller holds the write lock.
    pub(super) async fn ensure_default_project(&self) -> Result<(), StorageError> {
        let mut projects = self.load_index().await?;
        if !projects.iter().any(|p| p.id == DEFAULT_PROJECT_ID) {
            projects.insert(0, Project::new(DEFAULT_PROJECT_ID, DEFAULT_PROJECT_NAME));
            self.save_index(&projects).await?;
            info!("Created default project");
        }

        let paths = self.create_project_dirs(DEFAULT_PROJECT_ID).await?;
        if read_json::<Vec<Chapter>>(&paths.chapters_file).await?.is_none() {
            write_json(&paths.chapters_file, &default_chapters()).await?;
        }
        Ok(())
    }

    async fn create_project_dirs(&self, project_id: &str) -> Result<ProjectPaths, StorageError> {
        let paths = self.paths(project_id)?;
        for dir in [&paths.examples_dir, &paths.uploads_dir, &paths.prompts_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(paths)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, StorageError> {
        self.load_index().await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, StorageError> {
        validate_id(project_id, "project")?;
        self.load_index()
            .await?
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| StorageError::NotFound(format!("Project not found: {project_id}")))
    }

    /// Paths of an existing project.
    pub async fn project_paths(&self, project_id: &str) -> Result<ProjectPaths, StorageError> {
        self.get_project(project_id).await?;
        self.paths(project_id)
    }

    pub async fn create_project(&self, name: &str) -> Result<Project, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::Invalid("Project name is required".to_string()));
        }

        let _guard = self.lock().await;
        let project = Project::new(Uuid::new_v4().to_string(), name);

        let mut projects = self.load_index().await?;
        projects.push(project.clone());
        self.save_index(&projects).await?;
        self.create_project_dirs(&project.id).await?;

        info!("Created project {} ({})", project.id, project.name);
        Ok(project)
    }

    /// Updates the name (when given) and bumps `updated_at`.
    pub async fn update_project(
        &self,
        project_id: &str,
        name: Option<&str>,
    ) -> Result<Project, StorageError> {
        let name = match name.map(str::trim) {
            Some("") => {
                return Err(StorageError::Invalid("Project name is required".to_string()));
            }
            other => other,
        };
        validate_id(project_id, "project")?;

        let _guard = self.lock().await;
        let mut projects = self.load_index().await?;
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| StorageError::NotFound(format!("Project not found: {project_id}")))?;

        if let Some(name) = name {
            project.name = name.to_string();
        }
        project.updated_at = Utc::now();
        let updated = project.clone();

        self.save_index(&projects).await?;
        Ok(updated)
    }

    /// Removes the project from the index and deletes its directory.
    pub async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        validate_id(project_id, "project")?;
        if project_id == DEFAULT_PROJECT_ID {
            return Err(StorageError::Invalid(
                "The default project cannot be deleted".to_string(),
            ));
        }

        let _guard = self.lock().await;
        let mut projects = self.load_index().await?;
        let before = projects.len();
        projects.retain(|p| p.id != project_id);
        if projects.len() == before {
            return Err(StorageError::NotFound(format!(
                "Project not found: {project_id}"
            )));
        }
        self.save_index(&projects).await?;

        let root = self.paths(project_id)?.root;
        match tokio::fs::remove_dir_all(&root).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!("Deleted project {project_id}");
        Ok(())
    }

    /// Chapters of a project, sorted by `order`.
    pub async fn chapters(&self, project_id: &str) -> Result<Vec<Chapter>, StorageError> {
        let paths = self.project_paths(project_id).await?;
        let mut chapters = match read_json::<Vec<Chapter>>(&paths.chapters_file).await? {
            Some(chapters) => chapters,
            None if project_id == DEFAULT_PROJECT_ID => default_chapters(),
            None => Vec::new(),
        };
        chapters.sort_by_key(|c| c.order);
        Ok(chapters)
    }

    pub async fn find_chapter(
        &self,
        project_id: &str,
        chapter_id: &str,
    ) -> Result<Chapter, StorageError> {
        self.chapters(project_id)
            .await?
            .into_iter()
            .find(|c| c.id == chapter_id)
            .ok_or_else(|| {
                StorageError::NotFound(format!(
                    "Chapter {chapter_id} not found in project {project_id}"
                ))
            })
    }

    /// Replaces the chapter list. Ids must be unique; repeated titles are collapsed.
    pub async fn save_chapters(
        &self,
        project_id: &str,
        chapters: Vec<Chapter>,
    ) -> Result<Vec<Chapter>, StorageError> {
        let mut seen = HashSet::new();
        for chapter in &chapters {
            validate_id(&chapter.id, "chapter")?;
            if !seen.insert(chapter.id.as_str()) {
                return Err(StorageError::Invalid(format!(
                    "Duplicate chapter id: {}",
                    chapter.id
                )));
            }
        }

        let mut chapters: Vec<Chapter> = chapters
            .into_iter()
            .map(|c| Chapter {
                title: clean_repeated_title(c.title.trim()).to_string(),
                ..c
            })
            .collect();
        chapters.sort_by_key(|c| c.order);

        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        write_json(&paths.chapters_file, &chapters).await?;
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::test_support::temp_store;
    use crate::storage::{StorageError, DEFAULT_PROJECT_ID};

    use super::*;

    #[tokio::test]
    async fn test_open_creates_default_project_with_chapters() {
        let (_dir, store) = temp_store().await;
        let projects = store.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, DEFAULT_PROJECT_ID);

        let chapters = store.chapters(DEFAULT_PROJECT_ID).await.unwrap();
        assert_eq!(chapters.len(), 4);
        assert_eq!(chapters[0].id, "chapter_1");
    }

    #[tokio::test]
    async fn test_reopen_keeps_existing_projects() {
        let (dir, store) = temp_store().await;
        let created = store.create_project("二月月报").await.unwrap();

        let reopened = ProjectStore::open(dir.path().join("projects")).await.unwrap();
        let ids: Vec<String> = reopened
            .list_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![DEFAULT_PROJECT_ID.to_string(), created.id]);
    }

    #[tokio::test]
    async fn test_create_list_delete_round_trip() {
        let (_dir, store) = temp_store().await;
        let project = store.create_project("  三月月报 ").await.unwrap();
        assert_eq!(project.name, "三月月报");

        let listed = store.list_projects().await.unwrap();
        assert!(listed.iter().any(|p| p.id == project.id));
        assert!(store.paths(&project.id).unwrap().examples_dir.exists());

        store.delete_project(&project.id).await.unwrap();
        let listed = store.list_projects().await.unwrap();
        assert!(!listed.iter().any(|p| p.id == project.id));
        assert!(!store.paths(&project.id).unwrap().root.exists());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.create_project("   ").await,
            Err(StorageError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_default_project_cannot_be_deleted() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.delete_project(DEFAULT_PROJECT_ID).await,
            Err(StorageError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_project_is_not_found() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.delete_project("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_project_renames_and_bumps_timestamp() {
        let (_dir, store) = temp_store().await;
        let project = store.create_project("旧名称").await.unwrap();
        let updated = store
            .update_project(&project.id, Some("新名称"))
            .await
            .unwrap();
        assert_eq!(updated.name, "新名称");
        assert!(updated.updated_at >= project.updated_at);
        assert_eq!(store.get_project(&project.id).await.unwrap().name, "新名称");
    }

    #[tokio::test]
    async fn test_new_project_starts_without_chapters() {
        let (_dir, store) = temp_store().await;
        let project = store.create_project("空项目").await.unwrap();
        assert!(store.chapters(&project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_chapters_sorts_cleans_and_rejects_duplicates() {
        let (_dir, store) = temp_store().await;
        let project = store.create_project("章节").await.unwrap();

        let saved = store
            .save_chapters(
                &project.id,
                vec![
                    Chapter {
                        id: "chapter_2".into(),
                        title: "二、分析".into(),
                        order: 1,
                    },
                    Chapter {
                        id: "chapter_1".into(),
                        title: "一、概况一、概况".into(),
                        order: 0,
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(saved[0].id, "chapter_1");
        assert_eq!(saved[0].title, "一、概况");

        let dup = store
            .save_chapters(
                &project.id,
                vec![
                    Chapter {
                        id: "c".into(),
                        title: "a".into(),
                        order: 0,
                    },
                    Chapter {
                        id: "c".into(),
                        title: "b".into(),
                        order: 1,
                    },
                ],
            )
            .await;
        assert!(matches!(dup, Err(StorageError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_find_chapter_unknown_is_not_found() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.find_chapter(DEFAULT_PROJECT_ID, "chapter_9").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
