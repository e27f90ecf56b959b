//! The session controller.
//!
//! Owns history, the open directory, the search session, selection and every
//! gateway subscription, and turns user intents and background results into a
//! single [`ViewModel`]. All state changes happen on the caller's task through
//! `&mut self`; gateway calls run in spawned tasks and come back as
//! [`TaskResult`]s, which are applied by [`SessionController::handle_task_result`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::async_task::{self, TaskResult, TaskSender};
use crate::config::Config;
use crate::directory::{parent_path, Commit, DirectorySession, HistoryAction, OpenOptions};
use crate::entry::DirectoryEntry;
use crate::error::{BrowserError, Result};
use crate::gateway::{Gateway, SearchEvent, SearchRequest};
use crate::history::HistoryStack;
use crate::search::{Debouncer, SearchOptions, SearchSession, STREAM_CLOSED_MESSAGE};
use crate::selection::Selection;
use crate::subscription::{SubscriptionId, Subscriptions};

/// Where the displayed entries come from
#[derive(Debug)]
pub enum DisplayMode {
    Directory,
    Search(SearchSession),
}

/// Read-only state handed to presentation code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub current_path: Option<String>,
    pub displayed_entries: Vec<DirectoryEntry>,
    pub loading: bool,
    pub error: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub search_active: bool,
    pub search_query: Option<String>,
    pub selection: Vec<String>,
    pub detail: Option<DirectoryEntry>,
    pub show_hidden: bool,
}

pub struct SessionController {
    gateway: Arc<dyn Gateway>,
    search_options: SearchOptions,
    sender: TaskSender,
    receiver: mpsc::UnboundedReceiver<TaskResult>,

    history: HistoryStack,
    directory: DirectorySession,
    mode: DisplayMode,
    selection: Selection,
    show_hidden: bool,

    search_input: String,
    debouncer: Debouncer,
    next_session_id: u64,

    subscriptions: Subscriptions,
    deletion_subscription: Option<SubscriptionId>,

    starting: bool,
    /// Ticket of the home lookup that may still open a directory
    home_request: Option<u64>,
    next_home_ticket: u64,
    startup_error: Option<String>,
    shut_down: bool,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn Gateway>, config: &Config) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let search_options = config.search_options();
        Self {
            gateway,
            search_options,
            sender,
            receiver,

            history: HistoryStack::new(),
            directory: DirectorySession::new(),
            mode: DisplayMode::Directory,
            selection: Selection::new(),
            show_hidden: config.show_hidden,

            search_input: String::new(),
            debouncer: Debouncer::new(Duration::from_millis(search_options.debounce_ms)),
            next_session_id: 0,

            subscriptions: Subscriptions::new(),
            deletion_subscription: None,

            starting: false,
            home_request: None,
            next_home_ticket: 0,
            startup_error: None,
            shut_down: false,
        }
    }

    /// Subscribe to deletion notices and open the home directory.
    ///
    /// Must be called from within a tokio runtime. Progress is applied by
    /// [`Self::process_next`] / [`Self::settle`].
    pub fn start(&mut self) {
        if self.deletion_subscription.is_none() {
            let (id, token) = self.subscriptions.subscribe("deletions");
            async_task::spawn_deletion_listener(
                self.gateway.deletion_notifications(),
                self.sender.clone(),
                token,
            );
            self.deletion_subscription = Some(id);
        }

        log::info!("controller: starting, resolving home directory");
        self.starting = true;
        self.resolve_home();
    }

    // ----- navigation intents -------------------------------------------

    pub fn navigate(&mut self, path: &str) -> bool {
        let path = path.trim();
        if path.is_empty() {
            log::debug!("controller: ignoring navigation to an empty path");
            return false;
        }
        self.open(path.to_string(), OpenOptions::navigate());
        true
    }

    /// Revisit the previous history entry. The cursor moves once the read commits.
    pub fn back(&mut self) -> bool {
        self.revisit(-1)
    }

    pub fn forward(&mut self) -> bool {
        self.revisit(1)
    }

    fn revisit(&mut self, offset: isize) -> bool {
        // Repeated back/forward steps from the entry already being revisited
        let from = match self.directory.pending().map(|request| request.options.history) {
            Some(HistoryAction::MoveTo(index)) => Some(index),
            _ => self.history.cursor(),
        };
        let target = from.and_then(|from| self.history.neighbour(from, offset));
        match target {
            Some((index, path)) => {
                let path = path.to_string();
                self.open(path, OpenOptions::revisit(index));
                true
            }
            None => {
                log::debug!("controller: no history entry at offset {}", offset);
                false
            }
        }
    }

    pub fn up(&mut self) -> bool {
        let Some(current) = self.directory.current_path() else {
            log::debug!("controller: up ignored, no directory open");
            return false;
        };
        let parent = parent_path(current);
        self.open(parent, OpenOptions::navigate());
        true
    }

    /// Re-read the current directory, bypassing the gateway cache
    pub fn refresh(&mut self) -> bool {
        let Some(current) = self.directory.current_path() else {
            log::debug!("controller: refresh ignored, no directory open");
            return false;
        };
        let current = current.to_string();
        self.open(current, OpenOptions::refresh());
        true
    }

    /// Resolve home again and make it the only history entry
    pub fn home(&mut self) {
        self.resolve_home();
    }

    // ----- search intents -----------------------------------------------

    /// Keystroke input; starts a search once input has been quiet long enough
    pub fn set_search_input(&mut self, text: &str) {
        self.search_input = text.to_string();
        if text.trim().is_empty() {
            self.clear_search();
            return;
        }

        let query = text.trim().to_string();
        let ticket = self.debouncer.schedule(&self.sender, move |ticket| {
            TaskResult::DebounceElapsed { ticket, query }
        });
        log::debug!("controller: search input debounced (ticket {})", ticket);
    }

    /// Search right away, preempting any debounced input
    pub fn search(&mut self, query: &str) -> bool {
        self.search_input = query.to_string();
        self.debouncer.cancel();
        self.start_search(query)
    }

    pub fn clear_search(&mut self) {
        self.debouncer.cancel();
        self.search_input.clear();
        if let DisplayMode::Search(session) = &mut self.mode {
            session.cancel(&mut self.subscriptions);
            log::debug!("controller: search #{} cleared", session.id());
            self.mode = DisplayMode::Directory;
            self.selection.clear();
        }
    }

    fn start_search(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            self.clear_search();
            return false;
        }

        let Some(scope_path) = self.directory.current_path().map(str::to_string) else {
            log::debug!("controller: search ignored, no directory open");
            return false;
        };

        if let DisplayMode::Search(previous) = &mut self.mode {
            previous.cancel(&mut self.subscriptions);
        }

        self.next_session_id += 1;
        let session_id = self.next_session_id;
        let mut session = SearchSession::new(session_id, scope_path.clone(), query);
        let (subscription, token) = self
            .subscriptions
            .subscribe(format!("search #{}", session_id));
        session.mark_started(subscription);

        log::info!(
            "controller: search #{} for '{}' in {}",
            session_id,
            query,
            scope_path
        );
        async_task::spawn_search(
            Arc::clone(&self.gateway),
            self.sender.clone(),
            session_id,
            SearchRequest {
                scope_path,
                query: query.to_string(),
                max_depth: self.search_options.max_depth,
                max_results: self.search_options.max_results,
            },
            token,
        );

        self.mode = DisplayMode::Search(session);
        self.selection.clear();
        true
    }

    // ----- selection & filtering ----------------------------------------

    pub fn select(&mut self, entries: &[DirectoryEntry]) {
        let displayed = self.displayed_entries();
        self.selection.select(entries, &displayed);
    }

    /// Select the displayed entry at `path`, or clear the selection
    pub fn select_path(&mut self, path: &str) -> bool {
        let displayed = self.displayed_entries();
        match displayed.iter().find(|entry| entry.path == path) {
            Some(entry) => {
                let entry = entry.clone();
                self.selection.select(&[entry], &displayed);
                true
            }
            None => {
                self.selection.clear();
                false
            }
        }
    }

    pub fn set_show_hidden(&mut self, show_hidden: bool) {
        if self.show_hidden != show_hidden {
            self.show_hidden = show_hidden;
            self.selection.clear();
        }
    }

    pub fn toggle_hidden(&mut self) {
        self.set_show_hidden(!self.show_hidden);
    }

    // ----- file operations ----------------------------------------------

    /// Create an empty file in the current directory. Returns its path.
    pub async fn create_file(&self, name: &str) -> Result<String> {
        let path = self.child_path(name)?;
        self.gateway.create_file(&path).await?;
        log::info!("controller: created file {}", path);
        Ok(path)
    }

    /// Create a directory in the current directory. Returns its path.
    pub async fn create_directory(&self, name: &str) -> Result<String> {
        let path = self.child_path(name)?;
        self.gateway.create_directory(&path).await?;
        log::info!("controller: created directory {}", path);
        Ok(path)
    }

    pub async fn rename_item(&self, path: &str, new_name: &str) -> Result<()> {
        let new_name = validate_name(new_name)?;
        self.gateway.rename_item(path, new_name).await?;
        log::info!("controller: renamed {} to {}", path, new_name);
        Ok(())
    }

    pub async fn delete_item(&self, path: &str) -> Result<()> {
        if path.trim().is_empty() {
            return Err(BrowserError::invalid_input("path must not be empty"));
        }
        self.gateway.delete_item(path).await?;
        log::info!("controller: deleted {}", path);
        Ok(())
    }

    fn child_path(&self, name: &str) -> Result<String> {
        let name = validate_name(name)?;
        let directory = self
            .directory
            .current_path()
            .ok_or_else(|| BrowserError::NotAvailable("no directory is open".to_string()))?;
        Ok(join_path(directory, name))
    }

    // ----- background results -------------------------------------------

    /// Apply one result delivered by a background task
    pub fn handle_task_result(&mut self, result: TaskResult) {
        if self.shut_down {
            log::debug!("controller: dropping result after shutdown");
            return;
        }

        match result {
            TaskResult::HomeResolved { ticket, result } => {
                if self.home_request != Some(ticket) {
                    log::debug!("controller: dropping superseded home lookup #{}", ticket);
                    return;
                }
                self.home_request = None;
                match result {
                    Ok(home) => {
                        log::info!("controller: home directory is {}", home);
                        self.open(home, OpenOptions::rehome());
                    }
                    Err(e) => self.home_failed(e.to_string()),
                }
            }
            TaskResult::DirectoryLoaded { request_id, result } => {
                match self.directory.commit(request_id, result) {
                    Commit::Stale => {}
                    Commit::Loaded { path, history } => {
                        match history {
                            HistoryAction::Keep => {}
                            HistoryAction::Record => self.history.record(path),
                            HistoryAction::ResetTo => self.history.reset_to(path),
                            HistoryAction::MoveTo(index) => {
                                if let Err(e) = self.history.set_cursor(index) {
                                    log::warn!("controller: history moved under revisit: {}", e);
                                }
                            }
                        }
                        self.starting = false;
                        self.startup_error = None;
                        if matches!(self.mode, DisplayMode::Directory) {
                            self.selection.clear();
                        }
                    }
                    Commit::Failed { message } => {
                        if self.starting {
                            self.enter_startup_failure(message);
                        }
                    }
                }
            }
            TaskResult::Search { session_id, event } => {
                let Some((session, subscriptions)) = self.current_search(session_id) else {
                    log::debug!("controller: dropping event for search #{}", session_id);
                    return;
                };
                let completed = event == SearchEvent::Completed;
                session.apply(event);
                if completed {
                    session.release(subscriptions);
                }
            }
            TaskResult::SearchFailed { session_id, message } => {
                if let Some((session, subscriptions)) = self.current_search(session_id) {
                    session.fail(message);
                    session.release(subscriptions);
                }
            }
            TaskResult::SearchClosed { session_id } => {
                if let Some((session, subscriptions)) = self.current_search(session_id) {
                    session.fail(STREAM_CLOSED_MESSAGE);
                    session.release(subscriptions);
                }
            }
            TaskResult::DebounceElapsed { ticket, query } => {
                if self.debouncer.accept(ticket) {
                    self.start_search(&query);
                }
            }
            TaskResult::ItemDeleted { path } => {
                log::info!("controller: {} deleted elsewhere, refreshing", path);
                self.refresh_after_deletion();
            }
        }
    }

    /// Wait for the next background result and apply it
    pub async fn process_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(result) => {
                self.handle_task_result(result);
                true
            }
            None => false,
        }
    }

    /// Apply every result that has already arrived, without waiting
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.receiver.try_recv() {
            self.handle_task_result(result);
            applied += 1;
        }
        applied
    }

    /// Apply results until no read, home lookup, debounce or search is outstanding
    pub async fn settle(&mut self) {
        loop {
            self.process_pending();
            if !self.is_busy() {
                break;
            }
            if !self.process_next().await {
                break;
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        if self.shut_down {
            return false;
        }
        self.home_request.is_some()
            || self.directory.is_loading()
            || self.debouncer.is_pending()
            || self.search_session().is_some_and(SearchSession::is_active)
    }

    /// Cancel the search, any pending debounce, and detach every subscription
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("controller: shutting down");
        self.debouncer.cancel();
        if let DisplayMode::Search(session) = &mut self.mode {
            session.cancel(&mut self.subscriptions);
        }
        self.subscriptions.release_all();
        self.deletion_subscription = None;
        self.shut_down = true;
    }

    // ----- view ---------------------------------------------------------

    pub fn displayed_entries(&self) -> Vec<DirectoryEntry> {
        let source: &[DirectoryEntry] = match &self.mode {
            DisplayMode::Search(session) => session.results(),
            DisplayMode::Directory => self
                .directory
                .view()
                .map(|view| view.entries.as_slice())
                .unwrap_or(&[]),
        };
        source
            .iter()
            .filter(|entry| self.show_hidden || !entry.is_hidden())
            .cloned()
            .collect()
    }

    pub fn view_model(&self) -> ViewModel {
        let search = self.search_session();
        let error = self
            .startup_error
            .clone()
            .or_else(|| self.directory.error().map(str::to_string))
            .or_else(|| search.and_then(|s| s.error()).map(str::to_string));

        ViewModel {
            current_path: self.directory.current_path().map(str::to_string),
            displayed_entries: self.displayed_entries(),
            loading: self.home_request.is_some() || self.directory.is_loading(),
            error,
            can_go_back: self.history.can_go_back(),
            can_go_forward: self.history.can_go_forward(),
            search_active: search.is_some_and(SearchSession::is_active),
            search_query: search.map(|s| s.query().to_string()),
            selection: self.selection.paths(),
            detail: self.selection.detail().cloned(),
            show_hidden: self.show_hidden,
        }
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn directory(&self) -> &DirectorySession {
        &self.directory
    }

    pub fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    pub fn search_session(&self) -> Option<&SearchSession> {
        match &self.mode {
            DisplayMode::Search(session) => Some(session),
            DisplayMode::Directory => None,
        }
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Sender for the controller's result channel
    pub fn task_sender(&self) -> TaskSender {
        self.sender.clone()
    }

    // ----- internals ----------------------------------------------------

    fn open(&mut self, path: String, options: OpenOptions) {
        if self.home_request.take().is_some() {
            log::debug!("controller: pending home lookup superseded by {}", path);
        }
        if matches!(self.mode, DisplayMode::Directory) {
            self.selection.clear();
        }
        let request = self.directory.begin(path, options);
        async_task::spawn_directory_read(
            Arc::clone(&self.gateway),
            self.sender.clone(),
            request.id,
            request.path,
            options.use_cache,
        );
    }

    fn resolve_home(&mut self) {
        self.next_home_ticket += 1;
        let ticket = self.next_home_ticket;
        self.home_request = Some(ticket);
        async_task::spawn_home_resolution(Arc::clone(&self.gateway), self.sender.clone(), ticket);
    }

    /// Re-read whatever the user is about to see: the read in flight if there
    /// is one, otherwise the current directory
    fn refresh_after_deletion(&mut self) {
        if self.home_request.is_some() {
            log::debug!("controller: home lookup in flight, skipping refresh");
            return;
        }
        match self.directory.pending().cloned() {
            Some(request) => self.open(
                request.path,
                OpenOptions {
                    use_cache: false,
                    history: request.options.history,
                },
            ),
            None => {
                self.refresh();
            }
        }
    }

    fn home_failed(&mut self, message: String) {
        log::error!("controller: could not resolve home directory: {}", message);
        if self.starting {
            self.enter_startup_failure(message);
        } else {
            self.directory.fail(message);
        }
    }

    fn enter_startup_failure(&mut self, message: String) {
        log::error!("controller: startup failed: {}", message);
        self.starting = false;
        self.startup_error = Some(message);
        self.directory.reset();
        self.history.clear();
        self.selection.clear();
    }

    fn current_search(
        &mut self,
        session_id: u64,
    ) -> Option<(&mut SearchSession, &mut Subscriptions)> {
        match &mut self.mode {
            DisplayMode::Search(session) if session.id() == session_id => {
                Some((session, &mut self.subscriptions))
            }
            _ => None,
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BrowserError::invalid_input("name must not be empty"));
    }
    if name.contains('/') {
        return Err(BrowserError::invalid_input(format!(
            "name must not contain '/': {}",
            name
        )));
    }
    Ok(name)
}

fn join_path(directory: &str, name: &str) -> String {
    if directory.ends_with('/') {
        format!("{}{}", directory, name)
    } else {
        format!("{}/{}", directory, name)
    }
}
