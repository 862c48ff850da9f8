use std::path::PathBuf;

use devac_model::EntityIdError;

use crate::columnar::ColumnarError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Columnar(#[from] ColumnarError),

    #[error("malformed entity id in seed table: {0}")]
    BadEntityId(#[from] EntityIdError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write busy: seed lock at {path} held by a live process (pid {pid})")]
    WriteBusy { path: PathBuf, pid: u32 },

    #[error("seed validation failed: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
