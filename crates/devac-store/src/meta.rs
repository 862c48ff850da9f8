use std::path::Path;

use devac_model::{SeedMeta, SeedStats, SCHEMA_VERSION};

use crate::error::StoreError;

pub fn write_meta(seed_root: &Path) -> Result<(), StoreError> {
    let meta = SeedMeta { schema_version: SCHEMA_VERSION.to_string() };
    let json = serde_json::to_string_pretty(&meta).expect("meta serializes");
    atomic_write(&seed_root.join("meta.json"), json.as_bytes())
}

pub fn read_meta(seed_root: &Path) -> Result<Option<SeedMeta>, StoreError> {
    let path = seed_root.join("meta.json");
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::Validation(format!("meta.json is corrupt: {e}")))
}

pub fn write_stats(seed_root: &Path, stats: &SeedStats) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(stats).expect("stats serializes");
    atomic_write(&seed_root.join("stats.json"), json.as_bytes())
}

pub fn read_stats(seed_root: &Path) -> Result<Option<SeedStats>, StoreError> {
    let path = seed_root.join("stats.json");
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::Validation(format!("stats.json is corrupt: {e}")))
}

/// Writes `contents` to `path` via a same-directory temp file plus rename,
/// mirroring the store's parquet write path so every file under a seed
/// root becomes visible atomically.
fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().expect("meta/stats path has a parent");
    std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    let tmp = parent.join(format!(
        "{}.tmp.{}.{}",
        path.file_name().unwrap().to_string_lossy(),
        std::process::id(),
        now_nanos(),
    ));
    std::fs::write(&tmp, contents).map_err(|e| StoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn now_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
