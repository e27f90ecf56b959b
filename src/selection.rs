use crate::entry::DirectoryEntry;

/// Highlighted entries, always a subset of what is currently displayed.
///
/// Membership is by `path`: listings are replaced wholesale on every reload,
/// so entry values from an older listing are never the same objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<DirectoryEntry>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection, keeping only entries present in `displayed`
    pub fn select(&mut self, entries: &[DirectoryEntry], displayed: &[DirectoryEntry]) {
        self.entries.clear();
        for entry in entries {
            let Some(current) = displayed.iter().find(|d| d.path == entry.path) else {
                log::debug!("selection: ignoring {} (not displayed)", entry.path);
                continue;
            };
            if !self.contains(&current.path) {
                self.entries.push(current.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| entry.path == path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.path.clone()).collect()
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Target of the detail panel
    pub fn detail(&self) -> Option<&DirectoryEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
