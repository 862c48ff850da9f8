//! Generates and maintains the per-repo manifest that the federation hub
//! ingests: repo identity, one `PackageInfo` per analyzed package, and the
//! external dependencies referenced across them (spec §4.6).

mod error;
mod repo_id;
mod scan;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use devac_model::{Branch, ExternalDependency, Manifest, PackageInfo, MANIFEST_SCHEMA_VERSION};
use devac_store::SeedStore;

pub use error::ManifestError;
pub use repo_id::detect_repo_id;

const MANIFEST_RELATIVE_PATH: &str = ".devac/manifest.json";

/// Builds a fresh manifest for `repo_root` from scratch: every analyzed
/// package is rediscovered and its `PackageInfo` rebuilt.
pub async fn generate(repo_root: &Path) -> Result<Manifest, ManifestError> {
    let repo_id = repo_id::detect_repo_id(repo_root).await;
    let package_roots = scan::find_package_roots(repo_root);
    build_manifest(repo_root, &repo_id, &package_roots)
}

/// Reuses the on-disk manifest's entries for every package not listed in
/// `changed_packages` (repo-relative paths), recomputes entries for those
/// listed, and folds in newly discovered packages. The result is written
/// atomically and also returned.
pub async fn update(repo_root: &Path, changed_packages: &[String]) -> Result<Manifest, ManifestError> {
    let existing = read(repo_root)?;
    let repo_id = match &existing {
        Some(m) => m.repo_id.clone(),
        None => repo_id::detect_repo_id(repo_root).await,
    };
    let changed: HashSet<&str> = changed_packages.iter().map(String::as_str).collect();
    let discovered = scan::find_package_roots(repo_root);

    // Packages no longer discovered are simply absent from `discovered`
    // and so never make it into `packages` below.
    let mut packages = Vec::new();
    for package_root in &discovered {
        let path = relative_path(repo_root, package_root);
        let reuse = existing
            .as_ref()
            .and_then(|m| m.packages.iter().find(|p| p.path == path))
            .filter(|_| !changed.contains(path.as_str()));
        match reuse {
            Some(info) => packages.push(info.clone()),
            None => packages.push(scan::package_info(repo_root, package_root)?),
        }
    }

    let manifest = finish_manifest(repo_root, repo_id, packages, &discovered)?;
    write(repo_root, &manifest)?;
    Ok(manifest)
}

/// Result of [`validate`]: schema-version and shape checks on an
/// already-loaded manifest, independent of the seed store's own
/// per-package `ValidationReport`.
#[derive(Debug, Default)]
pub struct ManifestValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Schema-version and shape checks; does not touch the filesystem beyond
/// what the caller already loaded.
pub fn validate(manifest: &Manifest) -> ManifestValidation {
    let mut errors = Vec::new();
    let warnings = Vec::new();
    if manifest.version != MANIFEST_SCHEMA_VERSION {
        errors.push(format!("manifest schema version {} is not {MANIFEST_SCHEMA_VERSION}", manifest.version));
    }
    let mut seen = HashSet::new();
    for package in &manifest.packages {
        if !seen.insert(package.path.as_str()) {
            errors.push(format!("duplicate package path in manifest: {}", package.path));
        }
    }
    ManifestValidation { valid: errors.is_empty(), errors, warnings }
}

fn build_manifest(
    repo_root: &Path,
    repo_id: &str,
    package_roots: &[std::path::PathBuf],
) -> Result<Manifest, ManifestError> {
    let mut packages = Vec::with_capacity(package_roots.len());
    for package_root in package_roots {
        packages.push(scan::package_info(repo_root, package_root)?);
    }
    let manifest = finish_manifest(repo_root, repo_id.to_string(), packages, package_roots)?;
    write(repo_root, &manifest)?;
    Ok(manifest)
}

fn finish_manifest(
    repo_root: &Path,
    repo_id: String,
    mut packages: Vec<PackageInfo>,
    package_roots: &[std::path::PathBuf],
) -> Result<Manifest, ManifestError> {
    packages.sort_by(|a, b| a.path.cmp(&b.path));
    let mut manifest = Manifest::new(repo_id, chrono::Utc::now().to_rfc3339());
    manifest.external_dependencies = external_dependencies(package_roots)?;
    manifest.packages = packages;
    Ok(manifest)
}

/// Unresolved refs whose module specifier isn't relative are treated as
/// external dependencies; `package.json`'s own `dependencies` map (when
/// present) supplies the version, if any.
fn external_dependencies(package_roots: &[std::path::PathBuf]) -> Result<Vec<ExternalDependency>, ManifestError> {
    let mut versions: HashMap<String, String> = HashMap::new();
    let mut names: HashSet<String> = HashSet::new();

    for package_root in package_roots {
        load_declared_versions(package_root, &mut versions);
        let store = SeedStore::open(package_root);
        let view = store.read(&Branch::Base)?;
        for r in &view.external_refs {
            if r.is_resolved || r.is_deleted {
                continue;
            }
            if let Some(name) = external_package_name(&r.module_specifier) {
                names.insert(name);
            }
        }
    }

    let mut out: Vec<ExternalDependency> = names
        .into_iter()
        .map(|package| {
            let version = versions.get(&package).cloned();
            ExternalDependency { package, repo_id: None, version }
        })
        .collect();
    out.sort_by(|a, b| a.package.cmp(&b.package));
    Ok(out)
}

fn load_declared_versions(package_root: &Path, out: &mut HashMap<String, String>) {
    let Ok(contents) = std::fs::read_to_string(package_root.join("package.json")) else { return };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) else { return };
    for field in ["dependencies", "devDependencies", "peerDependencies"] {
        let Some(deps) = value.get(field).and_then(|d| d.as_object()) else { continue };
        for (name, version) in deps {
            if let Some(version) = version.as_str() {
                out.entry(name.clone()).or_insert_with(|| version.to_string());
            }
        }
    }
}

/// A bare specifier's package name is everything up to the second `/` for
/// a scoped package (`@scope/name/...`), or up to the first `/` otherwise
/// (`lodash/debounce` -> `lodash`). Relative and absolute specifiers are
/// not external dependencies.
fn external_package_name(module_specifier: &str) -> Option<String> {
    if module_specifier.starts_with('.') || module_specifier.starts_with('/') {
        return None;
    }
    let mut segments = module_specifier.splitn(3, '/');
    let first = segments.next()?;
    if first.starts_with('@') {
        let second = segments.next()?;
        Some(format!("{first}/{second}"))
    } else {
        Some(first.to_string())
    }
}

fn relative_path(repo_root: &Path, package_root: &Path) -> String {
    match package_root.strip_prefix(repo_root) {
        Ok(p) if !p.as_os_str().is_empty() => p.to_string_lossy().replace('\\', "/"),
        _ => ".".to_string(),
    }
}

fn manifest_path(repo_root: &Path) -> std::path::PathBuf {
    repo_root.join(MANIFEST_RELATIVE_PATH)
}

/// Reads the manifest at `<repo_root>/.devac/manifest.json`, if present.
pub fn read(repo_root: &Path) -> Result<Option<Manifest>, ManifestError> {
    let path = manifest_path(repo_root);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| ManifestError::io(&path, e))?;
    serde_json::from_str(&contents).map(Some).map_err(|source| ManifestError::Corrupt { path, source })
}

/// Writes `manifest` to `<repo_root>/.devac/manifest.json` via a
/// same-directory temp file plus rename, with a pid+timestamp suffix so
/// concurrent writers never collide on the temp name (mirroring the seed
/// store's own `meta.json`/`stats.json` write path).
pub fn write(repo_root: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    let path = manifest_path(repo_root);
    let parent = path.parent().expect("manifest path has a parent");
    std::fs::create_dir_all(parent).map_err(|e| ManifestError::io(parent, e))?;

    let json = serde_json::to_string_pretty(manifest).expect("manifest serializes");
    let tmp = parent.join(format!("manifest.json.tmp.{}.{}", std::process::id(), now_nanos()));
    std::fs::write(&tmp, json.as_bytes()).map_err(|e| ManifestError::io(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| ManifestError::io(&path, e))?;

    tracing::info!(repo_id = %manifest.repo_id, packages = manifest.packages.len(), "manifest written");
    Ok(())
}

fn now_nanos() -> u128 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_discovers_an_analyzed_package() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("packages/widgets");
        let seed_base = pkg.join(".devac-seed").join("base");
        std::fs::create_dir_all(&seed_base).unwrap();
        write_empty_tables(&seed_base);

        let manifest = generate(dir.path()).await.unwrap();
        assert_eq!(manifest.version, MANIFEST_SCHEMA_VERSION);
        assert_eq!(manifest.packages.len(), 1);
        assert_eq!(manifest.packages[0].path, "packages/widgets");

        let on_disk = read(dir.path()).unwrap().unwrap();
        assert_eq!(on_disk.repo_id, manifest.repo_id);
    }

    #[tokio::test]
    async fn update_reuses_unchanged_entries_and_recomputes_changed_ones() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("packages/widgets");
        let seed_base = pkg.join(".devac-seed").join("base");
        std::fs::create_dir_all(&seed_base).unwrap();
        write_empty_tables(&seed_base);

        let first = generate(dir.path()).await.unwrap();
        let second = update(dir.path(), &["packages/widgets".to_string()]).await.unwrap();
        assert_eq!(first.packages.len(), second.packages.len());
    }

    #[test]
    fn validates_schema_version() {
        let mut manifest = Manifest::new("host/owner/repo", "2026-01-01T00:00:00Z");
        assert!(validate(&manifest).valid);
        manifest.version = "1.0".to_string();
        assert!(!validate(&manifest).valid);
    }

    #[test]
    fn external_package_name_handles_scoped_and_subpath_specifiers() {
        assert_eq!(external_package_name("lodash/debounce"), Some("lodash".to_string()));
        assert_eq!(external_package_name("@scope/pkg/sub"), Some("@scope/pkg".to_string()));
        assert_eq!(external_package_name("./local"), None);
    }

    fn write_empty_tables(seed_base: &Path) {
        use devac_store::SeedBatch;
        let store = SeedStore::open(seed_base.parent().unwrap().parent().unwrap());
        store.write(&Branch::Base, &SeedBatch::default()).unwrap();
    }
}
