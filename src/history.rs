//! Back/forward navigation history.
//!
//! The stack behaves like a browser's: recording a new path while the cursor
//! sits somewhere in the middle drops everything after the cursor first.

use crate::error::{BrowserError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStack {
    stack: Vec<String>,
    cursor: Option<usize>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` after the cursor, truncating any forward entries
    pub fn record(&mut self, path: impl Into<String>) {
        let keep = self.cursor.map_or(0, |cursor| cursor + 1);
        self.stack.truncate(keep);
        self.stack.push(path.into());
        self.cursor = Some(self.stack.len() - 1);
    }

    pub fn back(&mut self) -> Result<&str> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                Ok(&self.stack[cursor - 1])
            }
            _ => Err(BrowserError::NotAvailable("no previous directory".to_string())),
        }
    }

    pub fn forward(&mut self) -> Result<&str> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.stack.len() => {
                self.cursor = Some(cursor + 1);
                Ok(&self.stack[cursor + 1])
            }
            _ => Err(BrowserError::NotAvailable("no next directory".to_string())),
        }
    }

    /// Entry `offset` steps away from `from`, if it exists
    pub fn neighbour(&self, from: usize, offset: isize) -> Option<(usize, &str)> {
        let index = from.checked_add_signed(offset)?;
        self.stack.get(index).map(|path| (index, path.as_str()))
    }

    /// Point the cursor at an existing entry without touching the stack
    pub fn set_cursor(&mut self, index: usize) -> Result<()> {
        if index >= self.stack.len() {
            return Err(BrowserError::NotAvailable(format!(
                "no history entry at {}",
                index
            )));
        }
        self.cursor = Some(index);
        Ok(())
    }

    /// Replace the whole history with a single entry
    pub fn reset_to(&mut self, path: impl Into<String>) {
        self.stack.clear();
        self.stack.push(path.into());
        self.cursor = Some(0);
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.cursor = None;
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.stack.len())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&str> {
        self.cursor.map(|cursor| self.stack[cursor].as_str())
    }

    pub fn entries(&self) -> &[String] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
