#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to start filesystem watcher: {0}")]
    Notify(#[from] notify::Error),

    #[error("hub error: {0}")]
    Hub(#[from] devac_hub::HubError),
}
