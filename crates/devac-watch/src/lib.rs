//! A single workspace-wide filesystem watcher (spec §4.8, C8): discovers
//! sibling git repos, routes every filesystem event to its owning repo,
//! debounces bursts, and drives the federation hub's auto-refresh through
//! a typed event channel rather than calling into the hub in-thread.

mod debounce;
mod error;
mod events;
mod repos;
mod watcher;

pub use error::WatchError;
pub use events::{categorize, default_watched_extensions, EventCategory, RoutedEvent};
pub use repos::{discover_repos, RepoRouter};
pub use watcher::{
    DiscoveryAction, LifecycleState, WatcherEvent, WatcherHandle, WorkspaceWatcher, DEFAULT_FILE_DEBOUNCE,
    DEFAULT_HUB_DEBOUNCE,
};
