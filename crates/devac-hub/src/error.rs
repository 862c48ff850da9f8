#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] devac_manifest::ManifestError),

    #[error("seed store error: {0}")]
    Store(#[from] devac_store::StoreError),

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repo not registered: {0}")]
    UnknownRepo(String),
}

impl HubError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
