//! Unit of work handed to ingest workers

use std::path::{Path, PathBuf};

/// One directory entry scheduled for fingerprinting
///
/// Created once when the sounds directory is listed; never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    dir: PathBuf,
    name: String,
    is_dir: bool,
}

impl WorkItem {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            is_dir,
        }
    }

    /// Containing directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name within `dir`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Full path of the entry
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}
