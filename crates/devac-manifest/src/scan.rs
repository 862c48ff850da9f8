use std::collections::HashSet;
use std::path::{Path, PathBuf};

use devac_model::{Branch, PackageInfo};
use devac_store::{SeedStore, DEFAULT_SEED_DIR};

use crate::error::ManifestError;

const SKIP_DIRS: &[&str] = &["node_modules", ".git", ".devac", "dist", "build", "target", ".next", "out"];

fn should_skip(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_str().map(|n| SKIP_DIRS.contains(&n)).unwrap_or(false)
}

/// Finds every directory under `repo_root` that contains a
/// `<seed_root>/base/` partition, i.e. every analyzed package.
pub fn find_package_roots(repo_root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let walker = walkdir::WalkDir::new(repo_root).into_iter().filter_entry(|e| !should_skip(e));
    for entry in walker.flatten() {
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.path().join(DEFAULT_SEED_DIR).join("base").is_dir() {
            found.push(entry.path().to_path_buf());
        }
    }
    found
}

/// Builds a `PackageInfo` for one package root, preferring recorded
/// `stats.json` counts over recomputing them from the live nodes.
pub fn package_info(repo_root: &Path, package_root: &Path) -> Result<PackageInfo, ManifestError> {
    let store = SeedStore::open(package_root);
    let relative_path = package_root
        .strip_prefix(repo_root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| ".".to_string());
    let path = if relative_path.is_empty() { ".".to_string() } else { relative_path };

    let name = package_name(package_root, &path);
    let seed_path = format!("{path}/{DEFAULT_SEED_DIR}").replace("./", "");
    let last_analyzed = nodes_mtime(package_root).unwrap_or_else(now_rfc3339);

    let (file_count, node_count, edge_count) = match store.read_stats()? {
        Some(stats) => (stats.file_count, stats.node_count, stats.edge_count),
        None => {
            let view = store.read(&Branch::Base)?;
            let files: HashSet<&str> = view.nodes.iter().map(|n| n.file_path.as_str()).collect();
            (files.len() as u64, view.nodes.len() as u64, view.edges.len() as u64)
        }
    };

    Ok(PackageInfo { path, name, seed_path, last_analyzed, file_count, node_count, edge_count })
}

fn package_name(package_root: &Path, fallback_path: &str) -> String {
    if let Ok(contents) = std::fs::read_to_string(package_root.join("package.json")) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) {
            if let Some(name) = value.get("name").and_then(|n| n.as_str()) {
                return name.to_string();
            }
        }
    }
    if let Ok(contents) = std::fs::read_to_string(package_root.join("Cargo.toml")) {
        if let Ok(value) = contents.parse::<toml::Value>() {
            if let Some(name) = value.get("package").and_then(|p| p.get("name")).and_then(|n| n.as_str()) {
                return name.to_string();
            }
        }
    }
    package_root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| fallback_path.to_string())
}

fn nodes_mtime(package_root: &Path) -> Option<String> {
    let nodes_path = package_root.join(DEFAULT_SEED_DIR).join("base").join("nodes.parquet");
    let modified = std::fs::metadata(&nodes_path).ok()?.modified().ok()?;
    let datetime: chrono::DateTime<chrono::Utc> = modified.into();
    Some(datetime.to_rfc3339())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_package_roots_and_skips_seed_internals() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("packages/widgets");
        std::fs::create_dir_all(pkg.join(DEFAULT_SEED_DIR).join("base")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/some-dep").join(DEFAULT_SEED_DIR).join("base")).unwrap();

        let found = find_package_roots(dir.path());
        assert_eq!(found, vec![pkg]);
    }
}
