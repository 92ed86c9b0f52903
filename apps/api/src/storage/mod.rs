//! File-system backed project store.
//!
//! Layout under the data root:
//!
//! ```text
//! index.json                      project list
//! <project>/chapters.json         chapter definitions
//! <project>/data.json             per-chapter input and generated content
//! <project>/examples/index.json   example metadata, bodies as <id><ext>
//! <project>/uploads/<id>.csv      uploaded data files
//! <project>/prompts/templates.json
//! ```
//!
//! Every mutation runs under one store-wide async lock and every file is
//! replaced atomically (temp file + rename), so readers never see a torn file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

pub mod chapter_data;
pub mod examples;
pub mod projects;
pub mod templates;

pub const DEFAULT_PROJECT_ID: &str = "default";
pub const DEFAULT_PROJECT_NAME: &str = "事件月报";

const MAX_ID_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt JSON in {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Filesystem locations of one project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub examples_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub templates_file: PathBuf,
    pub example_index_file: PathBuf,
    pub chapters_file: PathBuf,
    pub data_file: PathBuf,
}

impl ProjectPaths {
    fn new(root: PathBuf) -> Self {
        let examples_dir = root.join("examples");
        let prompts_dir = root.join("prompts");
        Self {
            uploads_dir: root.join("uploads"),
            templates_file: prompts_dir.join("templates.json"),
            example_index_file: examples_dir.join("index.json"),
            chapters_file: root.join("chapters.json"),
            data_file: root.join("data.json"),
            examples_dir,
            prompts_dir,
            root,
        }
    }
}

/// Handle to the on-disk store. Cheap to clone; clones share the write lock.
#[derive(Clone)]
pub struct ProjectStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ProjectStore {
    /// Opens (and if needed initializes) the store rooted at `root`.
    /// Guarantees the default project exists.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let store = Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        };

        {
            let _guard = store.lock().await;
            store.ensure_default_project().await?;
        }

        info!("Project store opened at {}", store.root.display());
        Ok(store)
    }

    fn index_file(&self) -> PathBuf {
        self.root.join("index.json")
    }

    /// Paths of a project. Validates the id but not that the project exists.
    pub fn paths(&self, project_id: &str) -> Result<ProjectPaths, StorageError> {
        validate_id(project_id, "project")?;
        Ok(ProjectPaths::new(self.root.join(project_id)))
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

/// Maps a missing or blank project id to the default project.
pub fn resolve_project_id(project_id: Option<&str>) -> &str {
    match project_id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => DEFAULT_PROJECT_ID,
    }
}

/// Ids become path components, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_id(id: &str, kind: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Invalid(format!("Invalid {kind} id: {id:?}")))
    }
}

/// Reads a JSON file; a missing file is `Ok(None)`.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Invalid(format!("No parent for {}", path.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ProjectStore;
    use tempfile::TempDir;

    /// Opens a store in a fresh temp dir. Keep the `TempDir` alive for the test.
    pub async fn temp_store() -> (TempDir, ProjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ProjectStore::open(dir.path().join("projects")).await.unwrap();
        (dir, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_project_id_defaults() {
        assert_eq!(resolve_project_id(None), DEFAULT_PROJECT_ID);
        assert_eq!(resolve_project_id(Some("  ")), DEFAULT_PROJECT_ID);
        assert_eq!(resolve_project_id(Some("abc")), "abc");
    }

    #[test]
    fn test_validate_id_rejects_path_traversal() {
        assert!(validate_id("../etc", "project").is_err());
        assert!(validate_id("a/b", "project").is_err());
        assert!(validate_id("", "project").is_err());
        assert!(validate_id("chapter_1", "chapter").is_ok());
        assert!(validate_id(&Uuid::new_v4().to_string(), "file").is_ok());
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_temp_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("file.json");
        write_json(&path, &vec![1, 2, 3]).await.unwrap();
        write_json(&path, &vec![4]).await.unwrap();

        let read: Option<Vec<i32>> = read_json(&path).await.unwrap();
        assert_eq!(read, Some(vec![4]));

        let mut entries = tokio::fs::read_dir(path.parent().unwrap()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["file.json"]);
    }

    #[tokio::test]
    async fn test_read_json_corrupt_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let result: Result<Option<Vec<i32>>, _> = read_json(&path).await;
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }
}
