//! Gateway backed by the local filesystem.
//!
//! Listings go through a small per-instance cache with a time-to-live; fresh
//! reads bypass it and overwrite the cached copy. Streaming search walks the
//! scope with `ignore::WalkBuilder` on a blocking thread and pushes matches
//! as they are found.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, UNIX_EPOCH};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ignore::WalkBuilder;
use tokio::fs;
use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::entry::{DirectoryEntry, DirectoryView};
use crate::error::{BrowserError, Result};
use crate::gateway::{
    DeletionNotice, Gateway, GatewayFuture, SearchEvent, SearchRequest, SearchStream,
};

pub const DEFAULT_MAX_DEPTH: u32 = 100;
pub const DEFAULT_MAX_RESULTS: usize = 500;

#[derive(Debug, Clone)]
struct CacheEntry {
    view: DirectoryView,
    stored_at: Instant,
}

#[derive(Debug, Clone)]
pub struct LocalGateway {
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
    cache_ttl: Duration,
    fuzzy: bool,
    deletions: broadcast::Sender<DeletionNotice>,
}

impl Default for LocalGateway {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl LocalGateway {
    pub fn new(cache_ttl: Duration) -> Self {
        let (deletions, _) = broadcast::channel(64);
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
            cache_ttl,
            fuzzy: false,
            deletions,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_ttl()).with_fuzzy(config.search.fuzzy)
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    fn cached(&self, path: &str) -> Option<DirectoryView> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(path)
            .filter(|entry| entry.stored_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.view.clone())
    }

    fn store(&self, path: &str, view: &DirectoryView) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                path.to_string(),
                CacheEntry {
                    view: view.clone(),
                    stored_at: Instant::now(),
                },
            );
            let ttl = self.cache_ttl;
            cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        }
    }

    fn invalidate(&self, path: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(path);
        }
    }

    async fn read_directory(path: &str) -> Result<DirectoryView> {
        let dir_path = Path::new(path);
        let metadata = fs::metadata(dir_path)
            .await
            .map_err(|e| map_io_error(e, path))?;
        if !metadata.is_dir() {
            return Err(BrowserError::io(format!("not a directory: {}", path)));
        }

        let mut reader = fs::read_dir(dir_path)
            .await
            .map_err(|e| map_io_error(e, path))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let entry_path = entry.path();
            let metadata = fs::metadata(&entry_path).await.ok();
            let is_directory = metadata.as_ref().is_some_and(|m| m.is_dir());
            let item_count = if is_directory {
                count_items(&entry_path).await
            } else {
                None
            };
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry_path.to_string_lossy().to_string(),
                is_directory,
                size: metadata.as_ref().filter(|m| !m.is_dir()).map(|m| m.len()),
                modified: metadata.as_ref().and_then(modified_secs),
                item_count,
            });
        }

        sort_entries(&mut entries);
        Ok(DirectoryView::new(path, entries))
    }

    async fn list(&self, path: &str, use_cache: bool) -> Result<DirectoryView> {
        if use_cache {
            if let Some(view) = self.cached(path) {
                log::debug!("local gateway: cache hit for {}", path);
                return Ok(view);
            }
        }
        let view = Self::read_directory(path).await?;
        self.store(path, &view);
        Ok(view)
    }

    async fn start_search(&self, request: SearchRequest) -> Result<SearchStream> {
        let metadata = fs::metadata(&request.scope_path)
            .await
            .map_err(|e| map_io_error(e, &request.scope_path))?;
        if !metadata.is_dir() {
            return Err(BrowserError::io(format!(
                "search path is not a directory: {}",
                request.scope_path
            )));
        }

        let (sender, stream) = mpsc::unbounded_channel();
        let fuzzy = self.fuzzy;
        let query = request.query;
        let max_depth = request.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        let max_results = request.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let scope = PathBuf::from(&request.scope_path);

        tokio::task::spawn_blocking(move || {
            let matcher = NameMatcher::new(&query, fuzzy);
            walk_and_emit(&scope, &matcher, max_depth, max_results, &sender);
        });

        Ok(stream)
    }
}

impl Gateway for LocalGateway {
    fn list_directory<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<DirectoryView>> {
        Box::pin(self.list(path, true))
    }

    fn list_directory_fresh<'a>(
        &'a self,
        path: &'a str,
    ) -> GatewayFuture<'a, Result<DirectoryView>> {
        Box::pin(self.list(path, false))
    }

    fn home_directory<'a>(&'a self) -> GatewayFuture<'a, Result<String>> {
        Box::pin(async {
            dirs::home_dir()
                .map(|home| home.to_string_lossy().to_string())
                .ok_or_else(|| BrowserError::NotFound("home directory".to_string()))
        })
    }

    fn create_file<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            let file_path = Path::new(path);
            if fs::try_exists(file_path).await? {
                return Err(BrowserError::AlreadyExists(path.to_string()));
            }
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(file_path, "").await?;
            self.invalidate_parent(path);
            Ok(())
        })
    }

    fn create_directory<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            if fs::try_exists(path).await? {
                return Err(BrowserError::AlreadyExists(path.to_string()));
            }
            fs::create_dir_all(path).await?;
            self.invalidate_parent(path);
            Ok(())
        })
    }

    fn rename_item<'a>(
        &'a self,
        path: &'a str,
        new_name: &'a str,
    ) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            let old_path = Path::new(path);
            if !fs::try_exists(old_path).await? {
                return Err(BrowserError::NotFound(path.to_string()));
            }
            let parent = old_path
                .parent()
                .ok_or_else(|| BrowserError::invalid_input("cannot rename the root"))?;
            let new_path = parent.join(new_name);
            if fs::try_exists(&new_path).await? {
                return Err(BrowserError::AlreadyExists(
                    new_path.to_string_lossy().to_string(),
                ));
            }
            fs::rename(old_path, &new_path).await?;
            self.invalidate_parent(path);
            Ok(())
        })
    }

    fn delete_item<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            let metadata = fs::metadata(path)
                .await
                .map_err(|e| map_io_error(e, path))?;
            if metadata.is_dir() {
                fs::remove_dir_all(path).await?;
            } else {
                fs::remove_file(path).await?;
            }
            self.invalidate(path);
            self.invalidate_parent(path);

            // Nobody listening is fine
            let _ = self.deletions.send(DeletionNotice {
                path: path.to_string(),
            });
            Ok(())
        })
    }

    fn search_stream<'a>(&'a self, request: SearchRequest) -> GatewayFuture<'a, Result<SearchStream>> {
        Box::pin(self.start_search(request))
    }

    fn deletion_notifications(&self) -> broadcast::Receiver<DeletionNotice> {
        self.deletions.subscribe()
    }
}

impl LocalGateway {
    fn invalidate_parent(&self, path: &str) {
        if let Some(parent) = Path::new(path).parent() {
            self.invalidate(&parent.to_string_lossy());
        }
    }
}

/// Filename matching used by streaming search
pub struct NameMatcher {
    query: String,
    fuzzy: Option<SkimMatcherV2>,
}

impl NameMatcher {
    pub fn new(query: &str, fuzzy: bool) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            fuzzy: fuzzy.then(SkimMatcherV2::default),
        }
    }

    /// `*.ext` and `.ext` match by suffix, anything else by substring
    pub fn matches(&self, name: &str) -> bool {
        if self.query.is_empty() {
            return false;
        }
        let name = name.to_lowercase();

        if let Some(extension) = self.query.strip_prefix('*') {
            if extension.starts_with('.') {
                return name.ends_with(extension);
            }
        }
        if self.query.starts_with('.') && !self.query.contains(' ') {
            return name.ends_with(&self.query);
        }
        if name.contains(&self.query) {
            return true;
        }

        self.fuzzy
            .as_ref()
            .is_some_and(|matcher| matcher.fuzzy_match(&name, &self.query).is_some())
    }
}

fn walk_and_emit(
    scope: &Path,
    matcher: &NameMatcher,
    max_depth: u32,
    max_results: usize,
    sender: &mpsc::UnboundedSender<SearchEvent>,
) {
    if sender.send(SearchEvent::Started).is_err() {
        return;
    }

    let walker = WalkBuilder::new(scope)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .max_depth(Some(max_depth as usize))
        .build();

    let mut emitted = 0usize;
    for entry in walker {
        if emitted >= max_results {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("local gateway: skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !matcher.matches(&name) {
            continue;
        }

        let metadata = entry.metadata().ok();
        let is_directory = metadata.as_ref().is_some_and(|m| m.is_dir());
        let result = DirectoryEntry {
            name,
            path: entry.path().to_string_lossy().to_string(),
            is_directory,
            size: metadata.as_ref().filter(|m| !m.is_dir()).map(|m| m.len()),
            modified: metadata.as_ref().and_then(modified_secs),
            item_count: None,
        };

        if sender.send(SearchEvent::Result(result)).is_err() {
            log::debug!("local gateway: search receiver dropped, stopping walk");
            return;
        }
        emitted += 1;
    }

    let _ = sender.send(SearchEvent::Completed);
}

async fn count_items(path: &Path) -> Option<u32> {
    let mut reader = fs::read_dir(path).await.ok()?;
    let mut count = 0u32;
    while let Ok(Some(_)) = reader.next_entry().await {
        count += 1;
    }
    Some(count)
}

fn modified_secs(metadata: &std::fs::Metadata) -> Option<String> {
    let modified = metadata.modified().ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(secs.to_string())
}

/// Directories first, then case-insensitive by name
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.is_directory, b.is_directory) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

fn map_io_error(error: std::io::Error, path: &str) -> BrowserError {
    match error.kind() {
        std::io::ErrorKind::NotFound => BrowserError::NotFound(path.to_string()),
        std::io::ErrorKind::PermissionDenied => BrowserError::PermissionDenied(path.to_string()),
        _ => BrowserError::from(error),
    }
}
