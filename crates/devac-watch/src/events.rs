//! Filesystem event categorization (spec §4.8): code-file change, seed-file
//! change, or ignored.

use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    CodeFile,
    SeedFile,
    Other,
}

pub fn categorize(path: &Path, watched_extensions: &[String], seed_dir: &str) -> EventCategory {
    if is_seed_file(path, seed_dir) {
        return EventCategory::SeedFile;
    }
    if is_code_file(path, watched_extensions) {
        return EventCategory::CodeFile;
    }
    EventCategory::Other
}

fn is_seed_file(path: &Path, seed_dir: &str) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
        return false;
    }
    let mut components = path.components().rev();
    let Some(_file) = components.next() else { return false };
    let Some(base_dir) = components.next() else { return false };
    let Some(seed_component) = components.next() else { return false };
    base_dir.as_os_str() == "base" && seed_component.as_os_str() == seed_dir
}

fn is_code_file(path: &Path, watched_extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => watched_extensions.iter().any(|e| e == ext),
        None => false,
    }
}

/// A reasonable default watched-extension list spanning the language
/// plugins this system ships parsers for; overridden per deployment.
pub fn default_watched_extensions() -> Vec<String> {
    ["rs", "ts", "tsx", "js", "jsx", "py", "go"].iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutedEvent {
    pub repo_root: PathBuf,
    pub path: PathBuf,
    pub category: EventCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_seed_parquet_under_base() {
        let path = Path::new("/repo/pkg/.devac-seed/base/nodes.parquet");
        assert_eq!(categorize(path, &[], ".devac-seed"), EventCategory::SeedFile);
    }

    #[test]
    fn ignores_parquet_under_a_named_branch() {
        let path = Path::new("/repo/pkg/.devac-seed/branch/feature-x/nodes.parquet");
        assert_eq!(categorize(path, &[], ".devac-seed"), EventCategory::Other);
    }

    #[test]
    fn recognizes_watched_code_extensions() {
        let exts = default_watched_extensions();
        let path = Path::new("/repo/pkg/src/lib.rs");
        assert_eq!(categorize(path, &exts, ".devac-seed"), EventCategory::CodeFile);
    }
}
