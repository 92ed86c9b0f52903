use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::models::template::{NewTemplate, PromptTemplate, TemplatePatch, TemplateSet};
use crate::prompts::defaults::{canonical_template, canonical_template_id, default_template_set, DEFAULT_CHAPTERS};
use crate::storage::{
    read_json, validate_id, write_json, ProjectPaths, ProjectStore, StorageError, DEFAULT_PROJECT_ID,
};

fn template_not_found(template_id: &str) -> StorageError {
    StorageError::NotFound(format!("Template not found: {template_id}"))
}

/// Puts missing built-in templates of the default project back.
/// Returns whether anything changed.
fn restore_canonical_templates(set: &mut TemplateSet) -> bool {
    let mut changed = false;
    for (chapter, _) in DEFAULT_CHAPTERS {
        let Some(mut canonical) = canonical_template(chapter) else {
            continue;
        };
        let list = set.entry(chapter.to_string()).or_default();
        if list.iter().any(|t| t.id == canonical.id) {
            continue;
        }
        canonical.is_default = !list.iter().any(|t| t.is_default);
        list.insert(0, canonical);
        changed = true;
    }
    changed
}

impl ProjectStore {
    /// Caller holds the write lock.
    async fn load_templates_locked(
        &self,
        paths: &ProjectPaths,
        project_id: &str,
    ) -> Result<TemplateSet, StorageError> {
        let is_default_project = project_id == DEFAULT_PROJECT_ID;

        let Some(mut set) = read_json::<TemplateSet>(&paths.templates_file).await? else {
            let initial = if is_default_project {
                default_template_set()
            } else {
                TemplateSet::new()
            };
            write_json(&paths.templates_file, &initial).await?;
            return Ok(initial);
        };

        if is_default_project && restore_canonical_templates(&mut set) {
            info!("Restored built-in templates of the default project");
            write_json(&paths.templates_file, &set).await?;
        }
        Ok(set)
    }

    /// All templates of a project grouped by chapter.
    pub async fn templates(&self, project_id: &str) -> Result<TemplateSet, StorageError> {
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        self.load_templates_locked(&paths, project_id).await
    }

    pub async fn list_templates(&self, project_id: &str) -> Result<Vec<PromptTemplate>, StorageError> {
        Ok(self
            .templates(project_id)
            .await?
            .into_values()
            .flatten()
            .collect())
    }

    pub async fn chapter_templates(
        &self,
        project_id: &str,
        chapter: &str,
    ) -> Result<Vec<PromptTemplate>, StorageError> {
        Ok(self
            .templates(project_id)
            .await?
            .remove(chapter)
            .unwrap_or_default())
    }

    pub async fn template(
        &self,
        project_id: &str,
        template_id: &str,
    ) -> Result<PromptTemplate, StorageError> {
        self.list_templates(project_id)
            .await?
            .into_iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| template_not_found(template_id))
    }

    /// The chapter's default template, else its first one. Projects without
    /// templates for the chapter fall back to the default project's.
    pub async fn default_template(
        &self,
        project_id: &str,
        chapter: &str,
    ) -> Result<Option<PromptTemplate>, StorageError> {
        let mut templates = self.chapter_templates(project_id, chapter).await?;
        if templates.is_empty() && project_id != DEFAULT_PROJECT_ID {
            templates = self.chapter_templates(DEFAULT_PROJECT_ID, chapter).await?;
        }

        let position = templates.iter().position(|t| t.is_default).unwrap_or(0);
        Ok((position < templates.len()).then(|| templates.swap_remove(position)))
    }

    /// Adds a template to an existing chapter of the project.
    pub async fn create_template(
        &self,
        project_id: &str,
        new: NewTemplate,
    ) -> Result<PromptTemplate, StorageError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(StorageError::Invalid("Template name is required".to_string()));
        }
        self.find_chapter(project_id, &new.chapter).await?;
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut set = self.load_templates_locked(&paths, project_id).await?;
        let now = Utc::now();
        let template = PromptTemplate {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            chapter: new.chapter.clone(),
            system_prompt: new.system_prompt,
            user_prompt_template: new.user_prompt_template,
            is_default: new.is_default,
            created_at: now,
            updated_at: now,
        };

        let list = set.entry(new.chapter).or_default();
        if template.is_default {
            list.iter_mut().for_each(|t| t.is_default = false);
        }
        list.push(template.clone());
        write_json(&paths.templates_file, &set).await?;

        info!(
            "Created template {} for {} in project {project_id}",
            template.id, template.chapter
        );
        Ok(template)
    }

    pub async fn update_template(
        &self,
        project_id: &str,
        template_id: &str,
        patch: TemplatePatch,
    ) -> Result<PromptTemplate, StorageError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(StorageError::Invalid("Template name is required".to_string()));
        }
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut set = self.load_templates_locked(&paths, project_id).await?;
        let list = set
            .values_mut()
            .find(|list| list.iter().any(|t| t.id == template_id))
            .ok_or_else(|| template_not_found(template_id))?;

        if patch.is_default == Some(true) {
            list.iter_mut().for_each(|t| t.is_default = false);
        }
        let template = list
            .iter_mut()
            .find(|t| t.id == template_id)
            .ok_or_else(|| template_not_found(template_id))?;

        if let Some(name) = patch.name {
            template.name = name.trim().to_string();
        }
        if let Some(system_prompt) = patch.system_prompt {
            template.system_prompt = system_prompt;
        }
        if let Some(user_prompt_template) = patch.user_prompt_template {
            template.user_prompt_template = user_prompt_template;
        }
        if let Some(is_default) = patch.is_default {
            template.is_default = is_default;
        }
        template.updated_at = Utc::now();
        let updated = template.clone();

        write_json(&paths.templates_file, &set).await?;
        Ok(updated)
    }

    /// Deletes a template. The last template of a chapter cannot be deleted;
    /// removing the default promotes the first remaining template.
    pub async fn delete_template(&self, project_id: &str, template_id: &str) -> Result<(), StorageError> {
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut set = self.load_templates_locked(&paths, project_id).await?;
        let list = set
            .values_mut()
            .find(|list| list.iter().any(|t| t.id == template_id))
            .ok_or_else(|| template_not_found(template_id))?;

        if list.len() == 1 {
            return Err(StorageError::Invalid(
                "Cannot delete the only template of a chapter".to_string(),
            ));
        }

        let index = list
            .iter()
            .position(|t| t.id == template_id)
            .ok_or_else(|| template_not_found(template_id))?;
        let removed = list.remove(index);
        if removed.is_default {
            if let Some(first) = list.first_mut() {
                first.is_default = true;
            }
        }

        write_json(&paths.templates_file, &set).await?;
        info!("Deleted template {template_id} from project {project_id}");
        Ok(())
    }

    /// Replaces every template of the project.
    pub async fn replace_templates(&self, project_id: &str, set: &TemplateSet) -> Result<(), StorageError> {
        for chapter in set.keys() {
            validate_id(chapter, "chapter")?;
        }
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        write_json(&paths.templates_file, set).await
    }
}
