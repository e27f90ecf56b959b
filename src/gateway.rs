//! Contract for the filesystem backend the controller talks to.

use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::entry::{DirectoryEntry, DirectoryView};
use crate::error::Result;

/// Object-safe boxed future returned by [`Gateway`] methods.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Events pushed for one streaming search. Results may be delivered more than
/// once; exactly one `Completed` ends a stream that ran to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Started,
    Result(DirectoryEntry),
    Completed,
}

/// Receiving half of a search subscription. Dropping it unsubscribes.
pub type SearchStream = mpsc::UnboundedReceiver<SearchEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub scope_path: String,
    pub query: String,
    pub max_depth: Option<u32>,
    pub max_results: Option<usize>,
}

/// Something was deleted, through this controller or any other surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionNotice {
    pub path: String,
}

/// Filesystem operations and event channels provided by the backend.
pub trait Gateway: Send + Sync {
    /// Lists a directory, possibly from a cache owned by the backend.
    fn list_directory<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<DirectoryView>>;

    /// Lists a directory bypassing any cache.
    fn list_directory_fresh<'a>(
        &'a self,
        path: &'a str,
    ) -> GatewayFuture<'a, Result<DirectoryView>>;

    fn home_directory<'a>(&'a self) -> GatewayFuture<'a, Result<String>>;

    fn create_file<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>>;

    fn create_directory<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>>;

    /// Renames `path` to `new_name` within its parent directory.
    fn rename_item<'a>(&'a self, path: &'a str, new_name: &'a str)
        -> GatewayFuture<'a, Result<()>>;

    fn delete_item<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>>;

    /// Starts a streaming search. The returned stream yields `Started`, then
    /// results, then `Completed`.
    fn search_stream<'a>(&'a self, request: SearchRequest) -> GatewayFuture<'a, Result<SearchStream>>;

    fn deletion_notifications(&self) -> broadcast::Receiver<DeletionNotice>;
}
