//! The federation hub daemon (spec §4.7-§4.9, C7/C9): owns one
//! workspace's catalog, runs the workspace watcher that keeps it fresh,
//! and serves the hub IPC protocol over a Unix socket until a shutdown
//! signal arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use devac_hub::Hub;
use devac_ipc::IpcServer;
use devac_watch::{LifecycleState, WatcherEvent, WorkspaceWatcher};
use tracing_subscriber::EnvFilter;

/// Runs the devac federation hub for one workspace.
#[derive(Debug, Parser)]
#[command(name = "devac-hubd", version)]
struct Args {
    /// Workspace root whose sibling repos are discovered and watched.
    #[arg(long, env = "DEVAC_WORKSPACE", default_value = ".")]
    workspace: PathBuf,

    /// Directory holding the catalog and IPC socket; defaults to
    /// `<workspace>/.devac`.
    #[arg(long, env = "DEVAC_HUB_DIR")]
    hub_dir: Option<PathBuf>,

    /// Drops and recreates the catalog instead of reusing what's found
    /// at `hub_dir`.
    #[arg(long)]
    force_init: bool,

    /// Per-path quiet period before a code-file change is dispatched.
    #[arg(long, env = "DEVAC_FILE_DEBOUNCE_MS", default_value_t = 100)]
    file_debounce_ms: u64,

    /// Workspace-level quiet period before seed-file changes trigger a
    /// hub refresh.
    #[arg(long, env = "DEVAC_HUB_DEBOUNCE_MS", default_value_t = 500)]
    hub_debounce_ms: u64,

    #[arg(long, env = "DEVAC_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = if args.debug { EnvFilter::new("devac=debug") } else { EnvFilter::new("devac=info") };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let workspace = args
        .workspace
        .canonicalize()
        .with_context(|| format!("workspace root {}", args.workspace.display()))?;
    let hub_dir = args.hub_dir.unwrap_or_else(|| workspace.join(".devac"));

    let hub = Arc::new(Hub::init(&hub_dir, args.force_init).context("initializing hub catalog")?);

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let watcher_handle = WorkspaceWatcher::new(hub.clone(), workspace.clone())
        .with_debounce(Duration::from_millis(args.file_debounce_ms), Duration::from_millis(args.hub_debounce_ms))
        .start(events_tx)
        .context("starting workspace watcher")?;

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            log_watcher_event(event);
        }
    });

    let socket_path = hub_dir.join("mcp.sock");
    let server = IpcServer::new(hub.clone(), socket_path);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received shutdown signal");
    };
    server.run(shutdown).await.context("running ipc server")?;

    watcher_handle.stop().await;
    Ok(())
}

fn log_watcher_event(event: WatcherEvent) {
    match event {
        WatcherEvent::FileChange { repo_root, path } => {
            tracing::debug!(repo = %repo_root.display(), path = %path.display(), "code file changed");
        }
        WatcherEvent::SeedChange { repo_root } => {
            tracing::debug!(repo = %repo_root.display(), "seed file changed");
        }
        WatcherEvent::HubRefresh { refreshed_repos, errors } => {
            tracing::info!(refreshed = refreshed_repos.len(), failed = errors.len(), "hub refreshed");
            for (repo_id, message) in errors {
                tracing::warn!(repo_id = %repo_id, error = %message, "repo refresh failed");
            }
        }
        WatcherEvent::WatcherState { state, error } => match state {
            LifecycleState::Started => tracing::info!("watcher started"),
            LifecycleState::Stopped => tracing::info!("watcher stopped"),
            LifecycleState::Error => {
                tracing::warn!(error = %error.as_deref().unwrap_or("unknown"), "watcher error")
            }
        },
        WatcherEvent::RepoDiscovery { action, repo } => {
            tracing::info!(repo = %repo.display(), action = ?action, "repo discovery");
        }
    }
}
