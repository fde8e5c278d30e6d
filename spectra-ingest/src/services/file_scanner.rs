//! Sounds directory listing
//!
//! Lists the immediate entries of the sounds directory, sorted by file name.
//! Subdirectories are listed too (workers skip them); nested content is not
//! visited.

use crate::models::WorkItem;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Directory listing errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory exists but could not be read
    #[error("Cannot read directory {path}: {message}")]
    ReadDir { path: PathBuf, message: String },
}

/// Directory lister
pub struct FileScanner {
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Create a scanner with the default ignore patterns
    ///
    /// Ignores platform files like .DS_Store and Thumbs.db.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![".DS_Store".to_string(), "Thumbs.db".to_string()],
        }
    }

    /// List the entries directly inside `dir`
    pub fn list(&self, dir: &Path) -> Result<Vec<WorkItem>, ScanError> {
        if !dir.exists() {
            return Err(ScanError::PathNotFound(dir.to_path_buf()));
        }

        if !dir.is_dir() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter();

        let mut items = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if self.should_ignore(&name) {
                        continue;
                    }
                    // Follow symlinks when deciding, so a linked file is still ingested
                    let is_dir = entry.path().is_dir();
                    items.push(WorkItem::new(dir, name, is_dir));
                }
                Err(e) if e.depth() == 0 => {
                    return Err(ScanError::ReadDir {
                        path: dir.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(
            dir = %dir.display(),
            entries = items.len(),
            "Directory listed"
        );

        Ok(items)
    }

    fn should_ignore(&self, name: &str) -> bool {
        self.ignore_patterns.iter().any(|pattern| pattern == name)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory() {
        let result = FileScanner::new().list(Path::new("/nonexistent/path/to/sounds"));
        assert!(matches!(result, Err(ScanError::PathNotFound(_))));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("kick.wav");
        fs::write(&file, b"RIFF").unwrap();

        let result = FileScanner::new().list(&file);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_lists_sorted_non_recursive() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("snare.wav"), b"").unwrap();
        fs::write(temp_dir.path().join("kick.wav"), b"").unwrap();
        fs::create_dir(temp_dir.path().join("loops")).unwrap();
        fs::write(temp_dir.path().join("loops").join("nested.wav"), b"").unwrap();

        let items = FileScanner::new().list(temp_dir.path()).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name()).collect();

        assert_eq!(names, vec!["kick.wav", "loops", "snare.wav"]);
        assert!(!items[0].is_dir());
        assert!(items[1].is_dir());
        assert_eq!(items[0].dir(), temp_dir.path());
    }

    #[test]
    fn test_ignores_platform_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".DS_Store"), b"").unwrap();
        fs::write(temp_dir.path().join("Thumbs.db"), b"").unwrap();
        fs::write(temp_dir.path().join("hat.wav"), b"").unwrap();

        let items = FileScanner::new().list(temp_dir.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "hat.wav");
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FileScanner::new().list(temp_dir.path()).unwrap().is_empty());
    }
}
