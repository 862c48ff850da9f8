use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionErrorCode {
    ModuleNotFound,
    SymbolNotFound,
    ParseError,
    Timeout,
    CircularDependency,
    InternalError,
}

/// One unresolvable reference, accumulated rather than raised — per spec
/// §4.4, "individual file failures never abort the package's overall
/// resolution."
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("{code:?} at {file_path}: {message}")]
pub struct ResolutionError {
    pub code: ResolutionErrorCode,
    pub file_path: String,
    pub message: String,
}

impl ResolutionError {
    pub fn new(code: ResolutionErrorCode, file_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code, file_path: file_path.into(), message: message.into() }
    }
}
