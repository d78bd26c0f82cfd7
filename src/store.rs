//! Flat-file project persistence.
//!
//! A project is whatever JSON document the drawing client sends: layers,
//! strokes, canvas metadata. The server never looks inside it. Each project is
//! one file, `<projects_dir>/<id>.json`, holding exactly that document.
//!
//! There is no index file. [`ProjectStore::list`] derives everything it reports
//! (`created`, `modified`, `size`) from filesystem metadata, so a project
//! dropped into the directory by hand shows up like any other.
//!
//! No locking is done. Saves never collide (see [`crate::naming`]); a delete
//! racing a load resolves to whatever the filesystem decides, which surfaces as
//! [`StoreError::NotFound`] for the loser.

use crate::error::ErrorKind;
use crate::naming::{is_safe_id, timestamp_id, write_unique};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

const PROJECT_PREFIX: &str = "project";
const PROJECT_EXT: &str = "json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Project not found")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Stored project is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Io(_) | StoreError::Json(_) => ErrorKind::Storage,
        }
    }
}

/// One entry of [`ProjectStore::list`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectSummary {
    /// File stem, e.g. `project_20240102_030405`.
    pub id: String,
    /// Full file name, e.g. `project_20240102_030405.json`.
    pub name: String,
    /// Local ISO-8601 creation time.
    pub created: String,
    /// Local ISO-8601 modification time.
    pub modified: String,
    /// File size in bytes.
    pub size: u64,
    #[serde(skip)]
    modified_at: SystemTime,
}

/// Project persistence rooted at a single directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    /// Open a store in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_safe_id(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", id, PROJECT_EXT)))
    }

    /// Persist `document` under a fresh id and return the id.
    pub fn save(&self, document: &Value) -> Result<String, StoreError> {
        self.save_at(document, Local::now().naive_local())
    }

    /// [`save`](Self::save) with an explicit clock reading.
    pub fn save_at(&self, document: &Value, now: NaiveDateTime) -> Result<String, StoreError> {
        let json = serde_json::to_vec(document)?;
        let stem = timestamp_id(PROJECT_PREFIX, now);
        let id = write_unique(&self.dir, &stem, PROJECT_EXT, &json)?;
        Ok(id)
    }

    /// Read back the document stored under `id`.
    pub fn load(&self, id: &str) -> Result<Value, StoreError> {
        let path = self.path_for(id)?;
        let content = fs::read_to_string(&path).map_err(|e| not_found_or(e, id))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// All stored projects, most recently modified first.
    pub fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut projects = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_project = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == PROJECT_EXT);
            if !is_project {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let (Some(name), Some(id)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.file_stem().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            // Listed ids must be loadable.
            if !is_safe_id(id) {
                continue;
            }

            let modified_at = meta.modified()?;
            // Not every filesystem records a birth time.
            let created_at = meta.created().unwrap_or(modified_at);

            projects.push(ProjectSummary {
                id: id.to_string(),
                name: name.to_string(),
                created: iso_timestamp(created_at),
                modified: iso_timestamp(modified_at),
                size: meta.len(),
                modified_at,
            });
        }

        projects.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(projects)
    }

    /// Remove the project stored under `id`.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|e| not_found_or(e, id))
    }
}

fn not_found_or(e: io::Error, id: &str) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(id.to_string())
    } else {
        StoreError::Io(e)
    }
}

/// Local time with microseconds, e.g. `2024-01-02T03:04:05.123456`.
fn iso_timestamp(t: SystemTime) -> String {
    DateTime::<Local>::from(t)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
