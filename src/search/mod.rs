//! Streaming search sessions.
//!
//! A session is scoped to one `(scope_path, query)` pair and is never reused:
//! a new query means a new session with a new id. Results are appended in the
//! order they arrive, deduplicated on `(path, name, is_directory)` because the
//! backend may deliver the same result more than once.

pub mod debounce;

pub use debounce::Debouncer;

use std::collections::HashSet;

use crate::entry::DirectoryEntry;
use crate::gateway::SearchEvent;
use crate::subscription::{SubscriptionId, Subscriptions};

pub const STREAM_CLOSED_MESSAGE: &str = "search stream closed before completion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Idle,
    Started,
    Streaming,
    Completed,
    Cancelled,
    Failed(String),
}

impl SearchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchStatus::Completed | SearchStatus::Cancelled | SearchStatus::Failed(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub debounce_ms: u64,
    pub max_results: Option<usize>,
    pub max_depth: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_results: Some(100),
            max_depth: None,
        }
    }
}

type ResultKey = (String, String, bool);

#[derive(Debug, Clone)]
pub struct SearchSession {
    id: u64,
    scope_path: String,
    query: String,
    status: SearchStatus,
    results: Vec<DirectoryEntry>,
    seen: HashSet<ResultKey>,
    subscription: Option<SubscriptionId>,
}

impl SearchSession {
    pub fn new(id: u64, scope_path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id,
            scope_path: scope_path.into(),
            query: query.into(),
            status: SearchStatus::Idle,
            results: Vec::new(),
            seen: HashSet::new(),
            subscription: None,
        }
    }

    /// The request has been issued; events will arrive through `subscription`
    pub fn mark_started(&mut self, subscription: SubscriptionId) {
        self.subscription = Some(subscription);
        if self.status == SearchStatus::Idle {
            self.status = SearchStatus::Started;
        }
    }

    /// Apply one pushed event. Returns true if the session changed.
    pub fn apply(&mut self, event: SearchEvent) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match event {
            SearchEvent::Started => {
                let changed = self.status != SearchStatus::Streaming;
                self.status = SearchStatus::Streaming;
                changed
            }
            SearchEvent::Result(entry) => {
                self.status = SearchStatus::Streaming;
                let key = (entry.path.clone(), entry.name.clone(), entry.is_directory);
                if self.seen.insert(key) {
                    self.results.push(entry);
                    true
                } else {
                    log::debug!("search #{}: duplicate result {}", self.id, entry.path);
                    false
                }
            }
            SearchEvent::Completed => {
                log::debug!(
                    "search #{}: completed with {} results",
                    self.id,
                    self.results.len()
                );
                self.status = SearchStatus::Completed;
                true
            }
        }
    }

    /// The request was rejected or the stream broke. Results are discarded.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        let message = message.into();
        log::warn!("search #{}: failed: {}", self.id, message);
        self.results.clear();
        self.seen.clear();
        self.status = SearchStatus::Failed(message);
    }

    /// Stop observing this session's events. Safe to call repeatedly.
    pub fn cancel(&mut self, subscriptions: &mut Subscriptions) {
        self.release(subscriptions);
        if !self.status.is_terminal() {
            log::debug!("search #{}: cancelled", self.id);
            self.status = SearchStatus::Cancelled;
        }
    }

    /// Release the gateway subscription without changing status
    pub fn release(&mut self, subscriptions: &mut Subscriptions) {
        if let Some(subscription) = self.subscription.take() {
            subscriptions.release(subscription);
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn scope_path(&self) -> &str {
        &self.scope_path
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn results(&self) -> &[DirectoryEntry] {
        &self.results
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// Request issued and not yet finished
    pub fn is_active(&self) -> bool {
        matches!(self.status, SearchStatus::Started | SearchStatus::Streaming)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            SearchStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DirectoryEntry {
        DirectoryEntry::new_file("report.pdf", "/home/u/docs/report.pdf").with_size(2048)
    }

    fn started_session(subscriptions: &mut Subscriptions) -> SearchSession {
        let mut session = SearchSession::new(1, "/home/u", "report");
        let (id, _token) = subscriptions.subscribe("search");
        session.mark_started(id);
        session
    }

    #[test]
    fn test_lifecycle_started_streaming_completed() {
        let mut subscriptions = Subscriptions::new();
        let mut session = SearchSession::new(1, "/home/u", "report");
        assert_eq!(session.status(), &SearchStatus::Idle);

        let (id, _token) = subscriptions.subscribe("search");
        session.mark_started(id);
        assert_eq!(session.status(), &SearchStatus::Started);
        assert!(session.is_active());

        session.apply(SearchEvent::Started);
        assert_eq!(session.status(), &SearchStatus::Streaming);

        session.apply(SearchEvent::Completed);
        assert_eq!(session.status(), &SearchStatus::Completed);
        assert!(!session.is_active());
    }

    #[test]
    fn test_first_result_implies_streaming() {
        let mut subscriptions = Subscriptions::new();
        let mut session = started_session(&mut subscriptions);
        session.apply(SearchEvent::Result(report()));
        assert_eq!(session.status(), &SearchStatus::Streaming);
    }

    #[test]
    fn test_duplicate_results_are_dropped() {
        let mut subscriptions = Subscriptions::new();
        let mut session = started_session(&mut subscriptions);

        assert!(session.apply(SearchEvent::Result(report())));
        assert!(!session.apply(SearchEvent::Result(report())));

        // Same path but a different kind is a different key
        let dir = DirectoryEntry::new_dir("report.pdf", "/home/u/docs/report.pdf");
        assert!(session.apply(SearchEvent::Result(dir)));

        assert_eq!(session.results().len(), 2);
        assert_eq!(session.results()[0], report());
    }

    #[test]
    fn test_results_keep_receipt_order() {
        let mut subscriptions = Subscriptions::new();
        let mut session = started_session(&mut subscriptions);
        for name in ["zeta.txt", "alpha.txt", "mid.txt"] {
            session.apply(SearchEvent::Result(DirectoryEntry::new_file(
                name,
                format!("/home/u/{}", name),
            )));
        }
        let names: Vec<_> = session.results().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta.txt", "alpha.txt", "mid.txt"]);
    }

    #[test]
    fn test_cancel_is_idempotent_and_releases() {
        let mut subscriptions = Subscriptions::new();
        let mut session = SearchSession::new(1, "/home/u", "report");
        let (id, token) = subscriptions.subscribe("search");
        session.mark_started(id);

        session.cancel(&mut subscriptions);
        session.cancel(&mut subscriptions);

        assert_eq!(session.status(), &SearchStatus::Cancelled);
        assert!(token.is_cancelled());
        assert!(subscriptions.is_empty());
        assert!(!session.apply(SearchEvent::Result(report())));
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_cancel_after_completion_keeps_completed() {
        let mut subscriptions = Subscriptions::new();
        let mut session = started_session(&mut subscriptions);
        session.apply(SearchEvent::Completed);
        session.cancel(&mut subscriptions);
        assert_eq!(session.status(), &SearchStatus::Completed);
    }

    #[test]
    fn test_failure_clears_results() {
        let mut subscriptions = Subscriptions::new();
        let mut session = started_session(&mut subscriptions);
        session.apply(SearchEvent::Result(report()));

        session.fail("Not found: /home/u");

        assert!(session.results().is_empty());
        assert_eq!(session.error(), Some("Not found: /home/u"));
        assert!(!session.apply(SearchEvent::Result(report())));
    }
}
