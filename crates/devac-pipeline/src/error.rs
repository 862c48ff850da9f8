#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("io error walking {path}: {source}")]
    Walk { path: String, #[source] source: std::io::Error },
    #[error("io error hashing {path}: {source}")]
    Hash { path: String, #[source] source: std::io::Error },
    #[error("seed store error: {0}")]
    Store(#[from] devac_store::StoreError),
}
