//! Workspace repo discovery and longest-path-prefix event routing (spec
//! §4.8: "enumerate child directories of the workspace that are git
//! repositories").

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immediate children of `workspace_root` that are git repositories,
/// sorted for deterministic discovery-event ordering.
pub fn discover_repos(workspace_root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let entries = match std::fs::read_dir(workspace_root) {
        Ok(entries) => entries,
        Err(_) => return found,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && path.join(".git").exists() {
            found.push(path);
        }
    }
    found.sort();
    found
}

/// Maps known repo roots to the owning repo for an arbitrary event path,
/// via longest-path-prefix match; `None` means the event is outside every
/// known repo and should be dropped.
#[derive(Default)]
pub struct RepoRouter {
    // Sorted so the longest (most specific) prefix is checked first.
    roots: BTreeMap<PathBuf, ()>,
}

impl RepoRouter {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut router = Self::default();
        for root in roots {
            router.insert(root);
        }
        router
    }

    pub fn insert(&mut self, root: PathBuf) {
        self.roots.insert(root, ());
    }

    pub fn remove(&mut self, root: &Path) {
        self.roots.remove(root);
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.keys().map(PathBuf::as_path)
    }

    pub fn owning_repo(&self, event_path: &Path) -> Option<&Path> {
        self.roots
            .keys()
            .filter(|root| event_path.starts_with(root))
            .max_by_key(|root| root.as_os_str().len())
            .map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_direct_git_children_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repo-a/.git")).unwrap();
        std::fs::create_dir_all(dir.path().join("not-a-repo")).unwrap();
        std::fs::create_dir_all(dir.path().join("nested/repo-b/.git")).unwrap();

        let found = discover_repos(dir.path());
        assert_eq!(found, vec![dir.path().join("repo-a")]);
    }

    #[test]
    fn owning_repo_picks_the_longest_matching_prefix() {
        let mut router = RepoRouter::default();
        router.insert(PathBuf::from("/work/repo-a"));
        router.insert(PathBuf::from("/work/repo-a/nested-vendor-repo"));

        let owner = router.owning_repo(Path::new("/work/repo-a/nested-vendor-repo/src/main.rs"));
        assert_eq!(owner, Some(Path::new("/work/repo-a/nested-vendor-repo")));

        assert_eq!(router.owning_repo(Path::new("/work/other/file.rs")), None);
    }
}
