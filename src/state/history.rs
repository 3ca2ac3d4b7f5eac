//! Visited-URL history persisted across runs
//!
//! The file is a JSON object `{"visited_urls": [...]}`. Writes go to a
//! sibling temporary file that is renamed over the target, so a crash never
//! leaves a truncated history behind.

use crate::PersistenceError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    visited_urls: Vec<String>,
}

/// JSON-backed store for the visited set
///
/// The store remembers how many URLs the file holds. A save whose snapshot
/// is not larger than that is skipped, which keeps a slow writer holding an
/// older snapshot from overwriting a newer file.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    saved_count: Mutex<usize>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            saved_count: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the visited set
    ///
    /// A missing file yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// valid history document.
    pub fn load(&self) -> Result<HashSet<String>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        let file: HistoryFile =
            serde_json::from_str(&content).map_err(|source| PersistenceError::Format {
                path: self.path.display().to_string(),
                source,
            })?;

        let visited: HashSet<String> = file.visited_urls.into_iter().collect();
        *self.saved_count.lock().unwrap_or_else(PoisonError::into_inner) = visited.len();
        tracing::debug!("Loaded {} visited URLs from {}", visited.len(), self.path.display());
        Ok(visited)
    }

    /// Writes the snapshot if it is larger than what was last saved
    ///
    /// # Returns
    ///
    /// `true` when the file was written, `false` when the save was skipped.
    pub fn save(&self, visited: &HashSet<String>) -> Result<bool, PersistenceError> {
        let mut saved_count = self.saved_count.lock().unwrap_or_else(PoisonError::into_inner);
        if visited.len() <= *saved_count {
            return Ok(false);
        }

        let mut visited_urls: Vec<String> = visited.iter().cloned().collect();
        visited_urls.sort();
        let json = serde_json::to_string_pretty(&HistoryFile { visited_urls }).map_err(|source| {
            PersistenceError::Format {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;

        *saved_count = visited.len();
        tracing::debug!("Saved {} visited URLs to {}", visited.len(), self.path.display());
        Ok(true)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
