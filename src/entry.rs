use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item of a directory listing or a search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Seconds since the epoch, as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>, is_directory: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory,
            size: None,
            modified: None,
            item_count: None,
        }
    }

    pub fn new_dir(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, true)
    }

    pub fn new_file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, path, false)
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_modified(mut self, modified: impl Into<String>) -> Self {
        self.modified = Some(modified.into());
        self
    }

    pub fn with_item_count(mut self, count: u32) -> Self {
        self.item_count = Some(count);
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Parsed modification time, if the backend supplied a valid one
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        let secs = self.modified.as_deref()?.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// A complete listing produced by a single directory read
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryView {
    pub current_path: String,
    pub entries: Vec<DirectoryEntry>,
}

impl DirectoryView {
    pub fn new(current_path: impl Into<String>, entries: Vec<DirectoryEntry>) -> Self {
        Self {
            current_path: current_path.into(),
            entries,
        }
    }
}
