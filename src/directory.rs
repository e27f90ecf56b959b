//! The currently open directory and its load state.
//!
//! Reads are issued by the controller; this type only decides which result is
//! allowed to commit. Every `begin` hands out a new request id and only the
//! latest id may commit, so a slow response to an earlier navigation can never
//! overwrite a newer listing.

use crate::entry::DirectoryView;
use crate::error::BrowserError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What a successful open does to the navigation history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Keep,
    Record,
    ResetTo,
    /// Move the cursor to an existing entry (back/forward)
    MoveTo(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub use_cache: bool,
    pub history: HistoryAction,
}

impl OpenOptions {
    pub fn navigate() -> Self {
        Self {
            use_cache: true,
            history: HistoryAction::Record,
        }
    }

    pub fn revisit(cursor: usize) -> Self {
        Self {
            use_cache: true,
            history: HistoryAction::MoveTo(cursor),
        }
    }

    pub fn refresh() -> Self {
        Self {
            use_cache: false,
            history: HistoryAction::Keep,
        }
    }

    pub fn rehome() -> Self {
        Self {
            use_cache: true,
            history: HistoryAction::ResetTo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRequest {
    pub id: u64,
    pub path: String,
    pub options: OpenOptions,
}

/// Outcome of offering a read result to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// A newer request was issued after this one; nothing changed
    Stale,
    Loaded { path: String, history: HistoryAction },
    Failed { message: String },
}

#[derive(Debug, Default)]
pub struct DirectorySession {
    state: LoadState,
    view: Option<DirectoryView>,
    next_id: u64,
    pending: Option<DirectoryRequest>,
}

impl DirectorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new read, superseding any read still in flight
    pub fn begin(&mut self, path: impl Into<String>, options: OpenOptions) -> DirectoryRequest {
        self.next_id += 1;
        let request = DirectoryRequest {
            id: self.next_id,
            path: path.into(),
            options,
        };
        log::debug!(
            "directory: request #{} for {} (cache: {}, history: {:?})",
            request.id,
            request.path,
            options.use_cache,
            options.history
        );
        self.state = LoadState::Loading;
        self.pending = Some(request.clone());
        request
    }

    pub fn commit(
        &mut self,
        request_id: u64,
        result: Result<DirectoryView, BrowserError>,
    ) -> Commit {
        let request = match self.pending.take() {
            Some(pending) if pending.id == request_id => pending,
            other => {
                self.pending = other;
                log::debug!("directory: dropping stale result for request #{}", request_id);
                return Commit::Stale;
            }
        };

        match result {
            Ok(view) => {
                log::debug!(
                    "directory: loaded {} ({} entries)",
                    view.current_path,
                    view.entries.len()
                );
                self.view = Some(view);
                self.state = LoadState::Loaded;
                Commit::Loaded {
                    path: request.path,
                    history: request.options.history,
                }
            }
            Err(error) => {
                let message = error.to_string();
                log::warn!("directory: failed to load {}: {}", request.path, message);
                self.state = LoadState::Failed(message.clone());
                Commit::Failed { message }
            }
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn view(&self) -> Option<&DirectoryView> {
        self.view.as_ref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.view.as_ref().map(|view| view.current_path.as_str())
    }

    pub fn pending(&self) -> Option<&DirectoryRequest> {
        self.pending.as_ref()
    }

    /// Record a failure that did not come from a read, keeping the listing.
    /// Any read still in flight is superseded by the failed request.
    pub fn fail(&mut self, message: impl Into<String>) {
        if let Some(request) = self.pending.take() {
            log::debug!("directory: request #{} superseded by a failure", request.id);
        }
        self.state = LoadState::Failed(message.into());
    }

    /// Forget the listing and any outstanding request
    pub fn reset(&mut self) {
        self.view = None;
        self.pending = None;
        self.state = LoadState::Idle;
    }
}

/// Parent of a `/`-separated path; the root is its own parent
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}
