use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::models::example::ExampleFile;
use crate::storage::{
    read_json, validate_id, write_atomic, write_json, ProjectPaths, ProjectStore, StorageError,
};

/// Extensions accepted for example documents.
pub const EXAMPLE_EXTENSIONS: &[&str] = &[".md", ".markdown", ".docx", ".doc"];

/// Extensions accepted for uploaded data files.
pub const DATA_EXTENSIONS: &[&str] = &[".csv"];

/// Lower-cased extension including the dot, e.g. `.docx`.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

/// Returns the file's extension if it is one of `allowed`.
pub fn check_extension(filename: &str, allowed: &[&str]) -> Result<String, StorageError> {
    match extension_of(filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(StorageError::Invalid(format!(
            "Unsupported file type for {filename:?}; allowed: {}",
            allowed.join(", ")
        ))),
    }
}

fn require_content(filename: &str, bytes: &[u8]) -> Result<(), StorageError> {
    if bytes.is_empty() {
        return Err(StorageError::Invalid(format!("File {filename:?} is empty")));
    }
    Ok(())
}

impl ProjectStore {
    /// Caller holds the write lock. A missing index is rebuilt from the
    /// documents found in the examples directory.
    async fn load_examples_locked(
        &self,
        paths: &ProjectPaths,
        project_id: &str,
    ) -> Result<Vec<ExampleFile>, StorageError> {
        if let Some(examples) = read_json(&paths.example_index_file).await? {
            return Ok(examples);
        }
        let rebuilt = scan_examples_dir(&paths.examples_dir).await?;
        if !rebuilt.is_empty() {
            info!(
                "Rebuilt example index for project {project_id} ({} files)",
                rebuilt.len()
            );
            write_json(&paths.example_index_file, &rebuilt).await?;
        }
        Ok(rebuilt)
    }

    /// Example index of a project.
    pub async fn list_examples(&self, project_id: &str) -> Result<Vec<ExampleFile>, StorageError> {
        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        self.load_examples_locked(&paths, project_id).await
    }

    /// Stores an example document under a fresh id and registers it.
    pub async fn add_example(
        &self,
        project_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ExampleFile, StorageError> {
        let ext = check_extension(filename, EXAMPLE_EXTENSIONS)?;
        require_content(filename, bytes)?;

        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut examples = self.load_examples_locked(&paths, project_id).await?;
        let example = ExampleFile {
            id: Uuid::new_v4().to_string(),
            name: filename.to_string(),
        };
        write_atomic(&paths.examples_dir.join(format!("{}{ext}", example.id)), bytes).await?;

        examples.push(example.clone());
        write_json(&paths.example_index_file, &examples).await?;

        info!("Stored example {} ({}) in project {project_id}", example.id, example.name);
        Ok(example)
    }

    /// Stores `filename` as the project's only example. The new body and index
    /// are written before the old bodies are removed.
    pub async fn replace_examples(
        &self,
        project_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ExampleFile, StorageError> {
        let ext = check_extension(filename, EXAMPLE_EXTENSIONS)?;
        require_content(filename, bytes)?;

        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let existing = self.load_examples_locked(&paths, project_id).await?;

        let example = ExampleFile {
            id: Uuid::new_v4().to_string(),
            name: filename.to_string(),
        };
        write_atomic(&paths.examples_dir.join(format!("{}{ext}", example.id)), bytes).await?;
        write_json(&paths.example_index_file, &vec![example.clone()]).await?;

        for old in &existing {
            if let Some(path) = find_example_body(&paths, &old.id).await {
                if let Err(e) = remove_if_exists(&path).await {
                    warn!("Failed to remove replaced example {}: {e}", path.display());
                }
            }
        }
        Ok(example)
    }

    /// Removes an example from the index and deletes its body.
    pub async fn remove_example(&self, project_id: &str, file_id: &str) -> Result<(), StorageError> {
        validate_id(file_id, "file")?;

        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let mut examples = self.load_examples_locked(&paths, project_id).await?;
        let before = examples.len();
        examples.retain(|e| e.id != file_id);
        let body = find_example_body(&paths, file_id).await;

        if examples.len() == before && body.is_none() {
            return Err(StorageError::NotFound(format!(
                "Example file not found: {file_id}"
            )));
        }

        write_json(&paths.example_index_file, &examples).await?;
        if let Some(path) = body {
            remove_if_exists(&path).await?;
        }
        info!("Deleted example {file_id} from project {project_id}");
        Ok(())
    }

    /// Metadata and body path of one example.
    pub async fn example(
        &self,
        project_id: &str,
        file_id: &str,
    ) -> Result<(ExampleFile, PathBuf), StorageError> {
        validate_id(file_id, "file")?;
        let paths = self.project_paths(project_id).await?;
        let not_found = || StorageError::NotFound(format!("Example file not found: {file_id}"));

        let example = self
            .list_examples(project_id)
            .await?
            .into_iter()
            .find(|e| e.id == file_id)
            .ok_or_else(not_found)?;
        let path = find_example_body(&paths, file_id).await.ok_or_else(|| {
            warn!("Example {file_id} is indexed but its file is missing");
            not_found()
        })?;
        Ok((example, path))
    }

    /// Stores an uploaded data file and returns its id.
    pub async fn save_data_file(
        &self,
        project_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let ext = check_extension(filename, DATA_EXTENSIONS)?;
        require_content(filename, bytes)?;

        let _guard = self.lock().await;
        let paths = self.project_paths(project_id).await?;
        let file_id = Uuid::new_v4().to_string();
        write_atomic(&paths.uploads_dir.join(format!("{file_id}{ext}")), bytes).await?;
        info!("Stored data file {file_id} ({filename}) in project {project_id}");
        Ok(file_id)
    }

    /// Contents of an uploaded data file.
    pub async fn read_data_file(&self, project_id: &str, file_id: &str) -> Result<Vec<u8>, StorageError> {
        validate_id(file_id, "file")?;
        let paths = self.project_paths(project_id).await?;

        for ext in DATA_EXTENSIONS {
            match tokio::fs::read(paths.uploads_dir.join(format!("{file_id}{ext}"))).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::NotFound(format!("Data file not found: {file_id}")))
    }
}

async fn find_example_body(paths: &ProjectPaths, file_id: &str) -> Option<PathBuf> {
    for ext in EXAMPLE_EXTENSIONS {
        let candidate = paths.examples_dir.join(format!("{file_id}{ext}"));
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

async fn remove_if_exists(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn scan_examples_dir(dir: &Path) -> Result<Vec<ExampleFile>, StorageError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let known = extension_of(&name).is_some_and(|ext| EXAMPLE_EXTENSIONS.contains(&ext.as_str()));
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        match stem {
            Some(id) if known && validate_id(&id, "file").is_ok() => {
                found.push(ExampleFile { id, name });
            }
            _ => {}
        }
    }
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_store;
    use crate::storage::DEFAULT_PROJECT_ID;

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(extension_of("报告.DOCX").as_deref(), Some(".docx"));
        assert_eq!(extension_of("noext"), None);
        assert!(check_extension("a.Md", EXAMPLE_EXTENSIONS).is_ok());
        assert!(check_extension("a.pdf", EXAMPLE_EXTENSIONS).is_err());
        assert!(check_extension("data.xlsx", DATA_EXTENSIONS).is_err());
    }

    #[tokio::test]
    async fn test_add_list_remove_example() {
        let (_dir, store) = temp_store().await;
        let example = store
            .add_example(DEFAULT_PROJECT_ID, "一月月报.md", "# 一、概况\n内容".as_bytes())
            .await
            .unwrap();

        let listed = store.list_examples(DEFAULT_PROJECT_ID).await.unwrap();
        assert_eq!(listed, vec![example.clone()]);

        let (meta, path) = store.example(DEFAULT_PROJECT_ID, &example.id).await.unwrap();
        assert_eq!(meta.name, "一月月报.md");
        assert!(path.to_string_lossy().ends_with(".md"));

        store
            .remove_example(DEFAULT_PROJECT_ID, &example.id)
            .await
            .unwrap();
        assert!(store.list_examples(DEFAULT_PROJECT_ID).await.unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_unknown_example_is_not_found() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.remove_example(DEFAULT_PROJECT_ID, "missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_wrong_extension_and_empty_file() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.add_example(DEFAULT_PROJECT_ID, "a.txt", b"x").await,
            Err(StorageError::Invalid(_))
        ));
        assert!(matches!(
            store.add_example(DEFAULT_PROJECT_ID, "a.md", b"").await,
            Err(StorageError::Invalid(_))
        ));
        assert!(matches!(
            store.save_data_file(DEFAULT_PROJECT_ID, "a.json", b"{}").await,
            Err(StorageError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_index_rebuilt_from_directory() {
        let (_dir, store) = temp_store().await;
        let paths = store.paths(DEFAULT_PROJECT_ID).unwrap();
        tokio::fs::write(paths.examples_dir.join("legacy.md"), "# 标题")
            .await
            .unwrap();
        tokio::fs::write(paths.examples_dir.join("notes.txt"), "ignored")
            .await
            .unwrap();

        let listed = store.list_examples(DEFAULT_PROJECT_ID).await.unwrap();
        assert_eq!(
            listed,
            vec![ExampleFile {
                id: "legacy".into(),
                name: "legacy.md".into()
            }]
        );
        assert!(paths.example_index_file.exists());
    }

    #[tokio::test]
    async fn test_replace_examples_keeps_only_new_document() {
        let (_dir, store) = temp_store().await;
        let old = store
            .add_example(DEFAULT_PROJECT_ID, "old.md", b"old")
            .await
            .unwrap();
        let (_, old_path) = store.example(DEFAULT_PROJECT_ID, &old.id).await.unwrap();

        let new = store
            .replace_examples(DEFAULT_PROJECT_ID, "new.md", b"new")
            .await
            .unwrap();
        assert_eq!(store.list_examples(DEFAULT_PROJECT_ID).await.unwrap(), vec![new]);
        assert!(!old_path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_uploads_are_all_indexed() {
        let (_dir, store) = temp_store().await;
        let uploads: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .add_example(DEFAULT_PROJECT_ID, &format!("r{i}.md"), b"# x")
                        .await
                })
            })
            .collect();
        for upload in uploads {
            upload.await.unwrap().unwrap();
        }

        let listed = store.list_examples(DEFAULT_PROJECT_ID).await.unwrap();
        assert_eq!(listed.len(), 8);
        for example in &listed {
            assert!(store.example(DEFAULT_PROJECT_ID, &example.id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_replace_examples_commits_before_removing_old_bodies() {
        let (_dir, store) = temp_store().await;
        let old = store
            .add_example(DEFAULT_PROJECT_ID, "old.md", b"old")
            .await
            .unwrap();
        // A directory in place of the old body cannot be removed as a file.
        let paths = store.paths(DEFAULT_PROJECT_ID).unwrap();
        let stuck = paths.examples_dir.join(format!("{}.md", old.id));
        tokio::fs::remove_file(&stuck).await.unwrap();
        tokio::fs::create_dir(&stuck).await.unwrap();
        tokio::fs::write(stuck.join("keep"), b"x").await.unwrap();

        let new = store
            .replace_examples(DEFAULT_PROJECT_ID, "new.md", b"new")
            .await
            .unwrap();
        assert_eq!(store.list_examples(DEFAULT_PROJECT_ID).await.unwrap(), vec![new.clone()]);
        assert!(store.example(DEFAULT_PROJECT_ID, &new.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_data_file_round_trip() {
        let (_dir, store) = temp_store().await;
        let id = store
            .save_data_file(DEFAULT_PROJECT_ID, "events.CSV", b"a,b\n1,2")
            .await
            .unwrap();
        let bytes = store.read_data_file(DEFAULT_PROJECT_ID, &id).await.unwrap();
        assert_eq!(bytes, b"a,b\n1,2");
        assert!(matches!(
            store.read_data_file(DEFAULT_PROJECT_ID, "nope").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
