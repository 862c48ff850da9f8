//! The workspace watcher proper (spec §4.8): a single `notify` backend per
//! workspace, a debounce/dispatch loop that never calls into the hub
//! in-thread but only via the typed [`WatcherEvent`] channel (Design Notes
//! "Cross-component callbacks"), and auto-refresh of the hub on
//! seed-file changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use devac_hub::Hub;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::{mpsc, oneshot};

use crate::debounce::Debouncer;
use crate::error::WatchError;
use crate::events::{categorize, default_watched_extensions, EventCategory, RoutedEvent};
use crate::repos::{discover_repos, RepoRouter};

pub const DEFAULT_FILE_DEBOUNCE: Duration = Duration::from_millis(100);
pub const DEFAULT_HUB_DEBOUNCE: Duration = Duration::from_millis(500);
const DEFAULT_SEED_DIR: &str = ".devac-seed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Started,
    Stopped,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryAction {
    Added,
    Removed,
}

/// Everything the watcher can emit (spec §4.8 "Lifecycle events" plus the
/// `file-change`/`seed-change`/`hub-refresh` events it drives).
#[derive(Clone, Debug)]
pub enum WatcherEvent {
    FileChange { repo_root: PathBuf, path: PathBuf },
    SeedChange { repo_root: PathBuf },
    HubRefresh { refreshed_repos: Vec<String>, errors: Vec<(String, String)> },
    WatcherState { state: LifecycleState, error: Option<String> },
    RepoDiscovery { action: DiscoveryAction, repo: PathBuf },
}

/// A single filesystem watcher for one workspace, routing every event to
/// its owning repo and debouncing bursts before they reach a listener.
pub struct WorkspaceWatcher {
    hub: Arc<Hub>,
    workspace_root: PathBuf,
    seed_dir: String,
    watched_extensions: Vec<String>,
    file_debounce: Duration,
    hub_debounce: Duration,
}

impl WorkspaceWatcher {
    pub fn new(hub: Arc<Hub>, workspace_root: PathBuf) -> Self {
        Self {
            hub,
            workspace_root,
            seed_dir: DEFAULT_SEED_DIR.to_string(),
            watched_extensions: default_watched_extensions(),
            file_debounce: DEFAULT_FILE_DEBOUNCE,
            hub_debounce: DEFAULT_HUB_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, file_debounce: Duration, hub_debounce: Duration) -> Self {
        self.file_debounce = file_debounce;
        self.hub_debounce = hub_debounce;
        self
    }

    pub fn with_watched_extensions(mut self, extensions: Vec<String>) -> Self {
        self.watched_extensions = extensions;
        self
    }

    pub fn with_seed_dir(mut self, seed_dir: impl Into<String>) -> Self {
        self.seed_dir = seed_dir.into();
        self
    }

    /// Starts the watcher: spawns the `notify` backend plus the
    /// debounce/dispatch task, and returns a handle that stops both when
    /// dropped-into via [`WatcherHandle::stop`].
    pub fn start(self, events_tx: mpsc::UnboundedSender<WatcherEvent>) -> Result<WatcherHandle, WatchError> {
        let repo_roots = discover_repos(&self.workspace_root);
        let router = RepoRouter::new(repo_roots.clone());

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
        let mut notify_watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            // notify's callback runs on its own thread; forwarding is a
            // cheap unbounded send that never blocks the watcher thread.
            let _ = raw_tx.send(res);
        })?;
        notify_watcher.watch(&self.workspace_root, RecursiveMode::Recursive)?;

        for root in &repo_roots {
            let _ = events_tx
                .send(WatcherEvent::RepoDiscovery { action: DiscoveryAction::Added, repo: root.clone() });
        }

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let state = DispatchState {
            hub: self.hub,
            workspace_root: self.workspace_root,
            seed_dir: self.seed_dir,
            watched_extensions: self.watched_extensions,
            file_debounce: self.file_debounce,
            hub_debounce: self.hub_debounce,
        };

        let join = tokio::spawn(dispatch_loop(state, router, notify_watcher, raw_rx, stop_rx, events_tx));
        Ok(WatcherHandle { stop_tx: Some(stop_tx), join })
    }
}

struct DispatchState {
    hub: Arc<Hub>,
    workspace_root: PathBuf,
    seed_dir: String,
    watched_extensions: Vec<String>,
    file_debounce: Duration,
    hub_debounce: Duration,
}

async fn dispatch_loop(
    state: DispatchState,
    mut router: RepoRouter,
    notify_watcher: RecommendedWatcher,
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    mut stop_rx: oneshot::Receiver<()>,
    events_tx: mpsc::UnboundedSender<WatcherEvent>,
) {
    // Keep the notify watcher alive for as long as this task runs; it
    // stops delivering events once dropped.
    let _notify_watcher = notify_watcher;

    tracing::info!(workspace = %state.workspace_root.display(), "watcher started");
    let _ = events_tx.send(WatcherEvent::WatcherState { state: LifecycleState::Started, error: None });

    let mut file_debouncer: Debouncer<RoutedEvent> = Debouncer::new(state.file_debounce);
    let mut seed_debouncer: Debouncer<PathBuf> = Debouncer::new(state.hub_debounce);

    loop {
        let sleep_until =
            [file_debouncer.next_deadline(), seed_debouncer.next_deadline()].into_iter().flatten().min();

        tokio::select! {
            _ = &mut stop_rx => {
                file_debouncer.clear();
                seed_debouncer.clear();
                let _ = events_tx.send(WatcherEvent::WatcherState { state: LifecycleState::Stopped, error: None });
                return;
            }
            raw = raw_rx.recv() => {
                match raw {
                    Some(Ok(event)) => handle_raw_event(
                        &state,
                        &mut router,
                        &events_tx,
                        &mut file_debouncer,
                        &mut seed_debouncer,
                        event,
                    ),
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "filesystem watcher error");
                        let _ = events_tx.send(WatcherEvent::WatcherState {
                            state: LifecycleState::Error,
                            error: Some(err.to_string()),
                        });
                    }
                    None => return,
                }
            }
            _ = sleep_until_instant(sleep_until) => {
                flush_debounced(&state, &events_tx, &mut file_debouncer, &mut seed_debouncer).await;
            }
        }
    }
}

fn handle_raw_event(
    state: &DispatchState,
    router: &mut RepoRouter,
    events_tx: &mpsc::UnboundedSender<WatcherEvent>,
    file_debouncer: &mut Debouncer<RoutedEvent>,
    seed_debouncer: &mut Debouncer<PathBuf>,
    event: notify::Event,
) {
    let mut topology_changed = false;
    for path in &event.paths {
        if path.parent() == Some(state.workspace_root.as_path()) {
            topology_changed = true;
        }
        let Some(repo_root) = router.owning_repo(path).map(Path::to_path_buf) else { continue };
        match categorize(path, &state.watched_extensions, &state.seed_dir) {
            EventCategory::CodeFile => {
                file_debouncer.touch(RoutedEvent {
                    repo_root,
                    path: path.clone(),
                    category: EventCategory::CodeFile,
                });
            }
            EventCategory::SeedFile => {
                seed_debouncer.touch(repo_root);
            }
            EventCategory::Other => {}
        }
    }

    if topology_changed {
        reconcile_repos(&state.workspace_root, router, events_tx);
    }
}

async fn flush_debounced(
    state: &DispatchState,
    events_tx: &mpsc::UnboundedSender<WatcherEvent>,
    file_debouncer: &mut Debouncer<RoutedEvent>,
    seed_debouncer: &mut Debouncer<PathBuf>,
) {
    for routed in file_debouncer.drain_ready() {
        let _ = events_tx.send(WatcherEvent::FileChange { repo_root: routed.repo_root, path: routed.path });
    }

    let ready_repo_roots = seed_debouncer.drain_ready();
    if ready_repo_roots.is_empty() {
        return;
    }

    let mut repo_ids = HashSet::new();
    for root in &ready_repo_roots {
        let _ = events_tx.send(WatcherEvent::SeedChange { repo_root: root.clone() });
        if let Some(manifest) = devac_manifest_repo_id(&state.hub, root) {
            repo_ids.insert(manifest);
        }
    }
    let repo_ids: Vec<String> = repo_ids.into_iter().collect();
    if repo_ids.is_empty() {
        return;
    }

    match state.hub.refresh(Some(repo_ids)).await {
        Ok(report) => {
            tracing::info!(
                refreshed = report.refreshed.len(),
                failed = report.failed.len(),
                "hub auto-refresh completed"
            );
            let _ = events_tx
                .send(WatcherEvent::HubRefresh { refreshed_repos: report.refreshed, errors: report.failed });
        }
        Err(err) => {
            let _ = events_tx
                .send(WatcherEvent::WatcherState { state: LifecycleState::Error, error: Some(err.to_string()) });
        }
    }
}

/// Looks up a registered repo's id from its local path among the hub's
/// already-registered repos, so a seed change can be handed to
/// [`Hub::refresh`] by id rather than path. A repo that was never
/// registered has nothing for the hub to refresh.
fn devac_manifest_repo_id(hub: &Hub, repo_root: &Path) -> Option<String> {
    let repo_ids = hub.list_repos().ok()?;
    repo_ids.into_iter().find(|id| {
        hub.get_repo_status(id).ok().flatten().map(|s| PathBuf::from(s.local_path) == repo_root).unwrap_or(false)
    })
}

async fn sleep_until_instant(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline.saturating_duration_since(Instant::now())).await,
        None => std::future::pending::<()>().await,
    }
}

fn reconcile_repos(workspace_root: &Path, router: &mut RepoRouter, events_tx: &mpsc::UnboundedSender<WatcherEvent>) {
    let discovered: HashSet<PathBuf> = discover_repos(workspace_root).into_iter().collect();
    let existing: Vec<PathBuf> = router
        .roots()
        .filter(|root| root.parent() == Some(workspace_root))
        .map(Path::to_path_buf)
        .collect();

    for root in &existing {
        if !discovered.contains(root) {
            router.remove(root);
            let _ =
                events_tx.send(WatcherEvent::RepoDiscovery { action: DiscoveryAction::Removed, repo: root.clone() });
        }
    }
    for root in discovered {
        if !existing.contains(&root) {
            router.insert(root.clone());
            let _ = events_tx.send(WatcherEvent::RepoDiscovery { action: DiscoveryAction::Added, repo: root });
        }
    }
}

/// Handle to a running watcher. Stopping cancels the pending debounce
/// timers, closes the filesystem handle, and drains the dispatch task
/// (spec §4.8 "Cancellation").
pub struct WatcherHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl WatcherHandle {
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    fn init_repo(root: &Path) {
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
    }

    #[tokio::test]
    async fn code_file_change_is_routed_and_debounced() {
        let workspace = tempfile::tempdir().unwrap();
        let repo = workspace.path().join("repo-a");
        init_repo(&repo);

        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Arc::new(Hub::init(hub_dir.path(), false).unwrap());

        let watcher = WorkspaceWatcher::new(hub, workspace.path().to_path_buf())
            .with_debounce(StdDuration::from_millis(20), StdDuration::from_millis(50));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = watcher.start(tx).unwrap();

        // Allow the watcher's async task to install the notify backend
        // before producing filesystem activity.
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        std::fs::write(repo.join("src/lib.rs"), b"fn main() {}").unwrap();

        let mut saw_file_change = false;
        let deadline = tokio::time::Instant::now() + StdDuration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            match timeout(StdDuration::from_millis(500), rx.recv()).await {
                Ok(Some(WatcherEvent::FileChange { repo_root, .. })) if repo_root == repo => {
                    saw_file_change = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => continue,
            }
        }
        assert!(saw_file_change, "expected a debounced FileChange event for the written file");

        handle.stop().await;
    }
}
