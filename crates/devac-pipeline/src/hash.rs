use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::PipelineError;

/// Hex-encoded SHA-256 of a file's contents, used as `source_file_hash`
/// for change detection (spec §4.5 step 2).
pub async fn hash_file(path: &Path) -> Result<String, PipelineError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| PipelineError::Hash {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
