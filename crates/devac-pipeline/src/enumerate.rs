use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::ignore::IgnoreRules;

/// A candidate source file discovered under a package root, with its
/// package-relative path computed once up front.
#[derive(Clone, Debug)]
pub struct CandidateFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Walks `package_root`, keeping files whose extension is in `extensions`
/// and that `ignore` allows (spec §4.5 step 1). The walk itself is
/// synchronous I/O, so it runs on the blocking pool rather than the async
/// executor directly, mirroring `flowctl::source::find_all_sources`.
pub async fn enumerate_files(
    package_root: &Path,
    extensions: &[&str],
    ignore: IgnoreRules,
) -> Result<Vec<CandidateFile>, PipelineError> {
    let root = package_root.to_path_buf();
    let exts: Vec<String> = extensions.iter().map(|e| e.to_string()).collect();

    tokio::task::spawn_blocking(move || walk(&root, &exts, &ignore))
        .await
        .expect("enumeration blocking task panicked")
}

fn should_consider_entry(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_str().map(|s| !s.starts_with('.') || s == ".").unwrap_or(false)
}

fn walk(root: &Path, extensions: &[String], ignore: &IgnoreRules) -> Result<Vec<CandidateFile>, PipelineError> {
    let mut out = Vec::new();
    let iter = walkdir::WalkDir::new(root)
        .follow_links(false)
        .same_file_system(true)
        .into_iter()
        .filter_entry(should_consider_entry);

    for entry in iter {
        let entry = entry.map_err(|e| PipelineError::Walk {
            path: root.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let absolute_path = entry.path().to_path_buf();
        let Some(ext) = absolute_path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.iter().any(|e| e == ext) {
            continue;
        }
        let relative_path = match absolute_path.strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if !ignore.allows(Path::new(&relative_path)) {
            continue;
        }
        out.push(CandidateFile { relative_path, absolute_path });
    }
    out.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enumerates_matching_extensions_and_skips_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "").unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/vendored.ts"), "").unwrap();

        let ignore = IgnoreRules::new(&[], &[]).unwrap();
        let files = enumerate_files(dir.path(), &["ts"], ignore).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "a.ts");
    }
}
