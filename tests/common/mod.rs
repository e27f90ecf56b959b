#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use file_session::config::Config;
use file_session::controller::SessionController;
use file_session::entry::{DirectoryEntry, DirectoryView};
use file_session::error::{BrowserError, Result};
use file_session::gateway::{
    DeletionNotice, Gateway, GatewayFuture, SearchEvent, SearchRequest, SearchStream,
};
use tokio::sync::{broadcast, mpsc, oneshot};

pub const HOME: &str = "/home/u";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListCached(String),
    ListFresh(String),
    Search(SearchRequest),
    CreateFile(String),
    CreateDirectory(String),
    Rename(String, String),
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    home: Option<std::result::Result<String, BrowserError>>,
    listings: HashMap<String, std::result::Result<Vec<DirectoryEntry>, BrowserError>>,
    gates: HashMap<String, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<Call>,
    search_senders: Vec<Option<mpsc::UnboundedSender<SearchEvent>>>,
    search_error: Option<BrowserError>,
}

/// In-memory gateway whose reads can be held open and whose search streams
/// are driven by the test
pub struct FakeGateway {
    state: Mutex<FakeState>,
    deletions: broadcast::Sender<DeletionNotice>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let (deletions, _) = broadcast::channel(16);
        let gateway = Self {
            state: Mutex::new(FakeState::default()),
            deletions,
        };
        gateway.set_home(Ok(HOME.to_string()));
        gateway
    }

    /// A gateway with a small home directory and a few siblings
    pub fn with_home_tree() -> Self {
        let gateway = Self::new();
        gateway.set_dir(
            HOME,
            vec![
                DirectoryEntry::new_dir("docs", "/home/u/docs"),
                DirectoryEntry::new_file("notes.md", "/home/u/notes.md").with_size(12),
                DirectoryEntry::new_file(".profile", "/home/u/.profile"),
            ],
        );
        gateway.set_dir(
            "/home/u/docs",
            vec![DirectoryEntry::new_file("report.pdf", "/home/u/docs/report.pdf")],
        );
        gateway.set_dir("/home", vec![DirectoryEntry::new_dir("u", HOME)]);
        gateway.set_dir("/tmp", vec![DirectoryEntry::new_file("scratch", "/tmp/scratch")]);
        gateway
    }

    pub fn set_home(&self, home: std::result::Result<String, BrowserError>) {
        self.state.lock().unwrap().home = Some(home);
    }

    pub fn set_dir(&self, path: &str, entries: Vec<DirectoryEntry>) {
        self.state
            .lock()
            .unwrap()
            .listings
            .insert(path.to_string(), Ok(entries));
    }

    pub fn fail_dir(&self, path: &str, error: BrowserError) {
        self.state
            .lock()
            .unwrap()
            .listings
            .insert(path.to_string(), Err(error));
    }

    pub fn fail_searches(&self, error: BrowserError) {
        self.state.lock().unwrap().search_error = Some(error);
    }

    /// Hold the next read of `path` until the returned sender fires or drops
    pub fn hold(&self, path: &str) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.state
            .lock()
            .unwrap()
            .gates
            .entry(path.to_string())
            .or_default()
            .push_back(gate);
        release
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Search(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().unwrap().search_senders.len()
    }

    /// Sender for the `index`-th search stream handed out
    pub fn search_sender(&self, index: usize) -> mpsc::UnboundedSender<SearchEvent> {
        self.state.lock().unwrap().search_senders[index]
            .clone()
            .expect("search stream already closed by the test")
    }

    /// Drop the gateway's end of the `index`-th search stream
    pub fn close_search(&self, index: usize) {
        self.state.lock().unwrap().search_senders[index] = None;
    }

    pub fn notify_deletion(&self, path: &str) {
        let _ = self.deletions.send(DeletionNotice {
            path: path.to_string(),
        });
    }

    pub fn deletion_listeners(&self) -> usize {
        self.deletions.receiver_count()
    }

    async fn list(&self, path: &str, fresh: bool) -> Result<DirectoryView> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(if fresh {
                Call::ListFresh(path.to_string())
            } else {
                Call::ListCached(path.to_string())
            });
            state.gates.get_mut(path).and_then(VecDeque::pop_front)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let listing = self.state.lock().unwrap().listings.get(path).cloned();
        match listing {
            Some(Ok(entries)) => Ok(DirectoryView::new(path, entries)),
            Some(Err(error)) => Err(error),
            None => Err(BrowserError::NotFound(path.to_string())),
        }
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Gateway for FakeGateway {
    fn list_directory<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<DirectoryView>> {
        Box::pin(self.list(path, false))
    }

    fn list_directory_fresh<'a>(
        &'a self,
        path: &'a str,
    ) -> GatewayFuture<'a, Result<DirectoryView>> {
        Box::pin(self.list(path, true))
    }

    fn home_directory<'a>(&'a self) -> GatewayFuture<'a, Result<String>> {
        Box::pin(async move {
            self.state
                .lock()
                .unwrap()
                .home
                .clone()
                .unwrap_or_else(|| Err(BrowserError::NotFound("home".to_string())))
        })
    }

    fn create_file<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::CreateFile(path.to_string()));
            Ok(())
        })
    }

    fn create_directory<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::CreateDirectory(path.to_string()));
            Ok(())
        })
    }

    fn rename_item<'a>(
        &'a self,
        path: &'a str,
        new_name: &'a str,
    ) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::Rename(path.to_string(), new_name.to_string()));
            Ok(())
        })
    }

    fn delete_item<'a>(&'a self, path: &'a str) -> GatewayFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(Call::Delete(path.to_string()));
            self.notify_deletion(path);
            Ok(())
        })
    }

    fn search_stream<'a>(
        &'a self,
        request: SearchRequest,
    ) -> GatewayFuture<'a, Result<SearchStream>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Search(request));
            if let Some(error) = state.search_error.clone() {
                return Err(error);
            }
            let (sender, stream) = mpsc::unbounded_channel();
            state.search_senders.push(Some(sender));
            Ok(stream)
        })
    }

    fn deletion_notifications(&self) -> broadcast::Receiver<DeletionNotice> {
        self.deletions.subscribe()
    }
}

pub fn test_config() -> Config {
    Config::default()
}

/// Controller over `gateway`, started and settled at the home directory
pub async fn started_controller(gateway: &Arc<FakeGateway>) -> SessionController {
    let mut controller = SessionController::new(gateway.clone(), &test_config());
    controller.start();
    pump(&mut controller).await;
    controller
}

/// Let spawned tasks run and apply whatever they delivered, without
/// advancing time
pub async fn pump(controller: &mut SessionController) {
    loop {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        if controller.process_pending() == 0 {
            break;
        }
    }
}

pub fn names(entries: &[DirectoryEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.name.clone()).collect()
}
