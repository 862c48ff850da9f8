#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest at {path} is corrupt: {source}")]
    Corrupt {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest schema version {found} is not {expected}")]
    SchemaVersion { found: String, expected: &'static str },

    #[error("seed store error: {0}")]
    Store(#[from] devac_store::StoreError),
}

impl ManifestError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
