//! Background work that talks to the gateway.
//!
//! Every spawned task reports back with a [`TaskResult`] on the controller's
//! channel. Results carry the id of the request, session or ticket they belong
//! to so the controller can drop anything that is no longer current.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::entry::DirectoryView;
use crate::error::BrowserError;
use crate::gateway::{Gateway, SearchEvent, SearchRequest};

pub type TaskSender = mpsc::UnboundedSender<TaskResult>;

#[derive(Debug, Clone)]
pub enum TaskResult {
    HomeResolved {
        ticket: u64,
        result: Result<String, BrowserError>,
    },
    DirectoryLoaded {
        request_id: u64,
        result: Result<DirectoryView, BrowserError>,
    },
    Search {
        session_id: u64,
        event: SearchEvent,
    },
    SearchFailed {
        session_id: u64,
        message: String,
    },
    /// The gateway dropped its end of the stream
    SearchClosed {
        session_id: u64,
    },
    DebounceElapsed {
        ticket: u64,
        query: String,
    },
    ItemDeleted {
        path: String,
    },
}

pub fn spawn_home_resolution(gateway: Arc<dyn Gateway>, sender: TaskSender, ticket: u64) {
    tokio::spawn(async move {
        let result = gateway.home_directory().await;
        if sender.send(TaskResult::HomeResolved { ticket, result }).is_err() {
            log::debug!("home resolution finished after controller went away");
        }
    });
}

pub fn spawn_directory_read(
    gateway: Arc<dyn Gateway>,
    sender: TaskSender,
    request_id: u64,
    path: String,
    use_cache: bool,
) {
    tokio::spawn(async move {
        let result = if use_cache {
            gateway.list_directory(&path).await
        } else {
            gateway.list_directory_fresh(&path).await
        };
        if sender
            .send(TaskResult::DirectoryLoaded { request_id, result })
            .is_err()
        {
            log::debug!("directory read #{} finished after controller went away", request_id);
        }
    });
}

/// Issue a search request and forward its events until the stream ends or
/// `token` is cancelled.
pub fn spawn_search(
    gateway: Arc<dyn Gateway>,
    sender: TaskSender,
    session_id: u64,
    request: SearchRequest,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            opened = gateway.search_stream(request) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                if !token.is_cancelled() {
                    let _ = sender.send(TaskResult::SearchFailed {
                        session_id,
                        message: e.to_string(),
                    });
                }
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log::debug!("search #{}: forwarder detached", session_id);
                    break;
                }
                event = stream.recv() => match event {
                    Some(event) => {
                        let done = event == SearchEvent::Completed;
                        if sender.send(TaskResult::Search { session_id, event }).is_err() || done {
                            break;
                        }
                    }
                    None => {
                        let _ = sender.send(TaskResult::SearchClosed { session_id });
                        break;
                    }
                },
            }
        }
    });
}

pub fn spawn_deletion_listener(
    mut notifications: broadcast::Receiver<crate::gateway::DeletionNotice>,
    sender: TaskSender,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                notice = notifications.recv() => match notice {
                    Ok(notice) => {
                        if sender.send(TaskResult::ItemDeleted { path: notice.path }).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("deletion listener lagged, {} notices missed", missed);
                        if sender.send(TaskResult::ItemDeleted { path: String::new() }).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        log::debug!("deletion listener stopped");
    });
}
