use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use file_session::error::BrowserError;
use file_session::gateway::{Gateway, SearchEvent, SearchRequest};
use file_session::local_gateway::LocalGateway;
use tempfile::TempDir;
use tokio::time::timeout;

fn path_of(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().to_string()
}

fn root(dir: &TempDir) -> String {
    dir.path().to_string_lossy().to_string()
}

/// Tree used by most tests:
/// ```text
/// Beta/
///   inner.txt
/// alpha/
/// b.txt
/// A.md
/// .hidden
/// ```
fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Beta")).unwrap();
    fs::write(dir.path().join("Beta/inner.txt"), "inner").unwrap();
    fs::create_dir(dir.path().join("alpha")).unwrap();
    fs::write(dir.path().join("b.txt"), "bee").unwrap();
    fs::write(dir.path().join("A.md"), "# a").unwrap();
    fs::write(dir.path().join(".hidden"), "").unwrap();
    dir
}

async fn collect_search(gateway: &LocalGateway, request: SearchRequest) -> Vec<SearchEvent> {
    let mut stream = gateway.search_stream(request).await.unwrap();
    let mut events = Vec::new();
    let collected = timeout(Duration::from_secs(10), async {
        while let Some(event) = stream.recv().await {
            let done = event == SearchEvent::Completed;
            events.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    assert!(collected.is_ok(), "search did not complete");
    events
}

fn result_names(events: &[SearchEvent]) -> Vec<String> {
    let mut names: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            SearchEvent::Result(entry) => Some(entry.name.clone()),
            _ => None,
        })
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_list_sorts_directories_first_with_metadata() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();

    let view = gateway.list_directory(&root(&dir)).await.unwrap();
    assert_eq!(view.current_path, root(&dir));

    let names: Vec<_> = view.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "Beta", ".hidden", "A.md", "b.txt"]);

    let beta = &view.entries[1];
    assert!(beta.is_directory);
    assert_eq!(beta.item_count, Some(1));
    assert_eq!(beta.size, None);

    let b_txt = &view.entries[4];
    assert!(!b_txt.is_directory);
    assert_eq!(b_txt.size, Some(3));
    assert!(b_txt.modified_at().is_some());
}

#[tokio::test]
async fn test_list_missing_directory_is_not_found() {
    let dir = TempDir::new().unwrap();
    let gateway = LocalGateway::default();

    let result = gateway.list_directory(&path_of(&dir, "missing")).await;
    assert_matches!(result, Err(BrowserError::NotFound(_)));
}

#[tokio::test]
async fn test_list_file_is_an_io_error() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();

    let result = gateway.list_directory(&path_of(&dir, "b.txt")).await;
    assert_matches!(result, Err(BrowserError::Io(msg)) if msg.contains("not a directory"));
}

#[tokio::test]
async fn test_cached_listing_until_fresh_read() {
    let dir = sample_tree();
    let gateway = LocalGateway::new(Duration::from_secs(60));
    let path = root(&dir);

    let first = gateway.list_directory(&path).await.unwrap();
    fs::write(dir.path().join("late.txt"), "").unwrap();

    let cached = gateway.list_directory(&path).await.unwrap();
    assert_eq!(cached, first);

    let fresh = gateway.list_directory_fresh(&path).await.unwrap();
    assert_eq!(fresh.entries.len(), first.entries.len() + 1);

    // The fresh read replaced the cached copy
    let cached = gateway.list_directory(&path).await.unwrap();
    assert_eq!(cached, fresh);
}

#[tokio::test]
async fn test_zero_ttl_disables_cache() {
    let dir = sample_tree();
    let gateway = LocalGateway::new(Duration::ZERO);
    let path = root(&dir);

    gateway.list_directory(&path).await.unwrap();
    fs::write(dir.path().join("late.txt"), "").unwrap();
    let view = gateway.list_directory(&path).await.unwrap();
    assert!(view.entries.iter().any(|e| e.name == "late.txt"));
}

#[tokio::test]
async fn test_create_file_and_directory() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();
    let path = root(&dir);
    gateway.list_directory(&path).await.unwrap();

    gateway.create_file(&path_of(&dir, "new.txt")).await.unwrap();
    gateway.create_directory(&path_of(&dir, "new_dir")).await.unwrap();
    assert!(dir.path().join("new.txt").is_file());
    assert!(dir.path().join("new_dir").is_dir());

    // The parent's cached listing was invalidated
    let view = gateway.list_directory(&path).await.unwrap();
    assert!(view.entries.iter().any(|e| e.name == "new.txt"));
    assert!(view.entries.iter().any(|e| e.name == "new_dir"));

    assert_matches!(
        gateway.create_file(&path_of(&dir, "b.txt")).await,
        Err(BrowserError::AlreadyExists(_))
    );
    assert_matches!(
        gateway.create_directory(&path_of(&dir, "alpha")).await,
        Err(BrowserError::AlreadyExists(_))
    );
}

#[tokio::test]
async fn test_rename_within_parent() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();

    gateway.rename_item(&path_of(&dir, "b.txt"), "c.txt").await.unwrap();
    assert!(!dir.path().join("b.txt").exists());
    assert_eq!(fs::read_to_string(dir.path().join("c.txt")).unwrap(), "bee");

    assert_matches!(
        gateway.rename_item(&path_of(&dir, "c.txt"), "A.md").await,
        Err(BrowserError::AlreadyExists(_))
    );
    assert_matches!(
        gateway.rename_item(&path_of(&dir, "nope"), "x").await,
        Err(BrowserError::NotFound(_))
    );
}

#[tokio::test]
async fn test_delete_broadcasts_notice() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();
    let mut notices = gateway.deletion_notifications();

    let target = path_of(&dir, "Beta");
    gateway.delete_item(&target).await.unwrap();
    assert!(!dir.path().join("Beta").exists());

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.path, target);

    assert_matches!(
        gateway.delete_item(&target).await,
        Err(BrowserError::NotFound(_))
    );
}

#[tokio::test]
async fn test_search_streams_started_results_completed() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();

    let events = collect_search(
        &gateway,
        SearchRequest {
            scope_path: root(&dir),
            query: "*.txt".to_string(),
            max_depth: None,
            max_results: None,
        },
    )
    .await;

    assert_eq!(events.first(), Some(&SearchEvent::Started));
    assert_eq!(events.last(), Some(&SearchEvent::Completed));
    assert_eq!(result_names(&events), vec!["b.txt", "inner.txt"]);
}

#[tokio::test]
async fn test_search_respects_depth_and_result_limits() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();

    let shallow = collect_search(
        &gateway,
        SearchRequest {
            scope_path: root(&dir),
            query: ".txt".to_string(),
            max_depth: Some(1),
            max_results: None,
        },
    )
    .await;
    assert_eq!(result_names(&shallow), vec!["b.txt"]);

    let limited = collect_search(
        &gateway,
        SearchRequest {
            scope_path: root(&dir),
            query: "a".to_string(),
            max_depth: None,
            max_results: Some(1),
        },
    )
    .await;
    assert_eq!(result_names(&limited).len(), 1);
    assert_eq!(limited.last(), Some(&SearchEvent::Completed));
}

#[tokio::test]
async fn test_search_includes_hidden_names() {
    let dir = sample_tree();
    let gateway = LocalGateway::default();

    let events = collect_search(
        &gateway,
        SearchRequest {
            scope_path: root(&dir),
            query: "hidden".to_string(),
            max_depth: None,
            max_results: None,
        },
    )
    .await;
    assert_eq!(result_names(&events), vec![".hidden"]);
}

#[tokio::test]
async fn test_search_in_missing_scope_is_rejected() {
    let dir = TempDir::new().unwrap();
    let gateway = LocalGateway::default();

    let result = gateway
        .search_stream(SearchRequest {
            scope_path: path_of(&dir, "missing"),
            query: "x".to_string(),
            max_depth: None,
            max_results: None,
        })
        .await;
    assert_matches!(result, Err(BrowserError::NotFound(_)));
}
