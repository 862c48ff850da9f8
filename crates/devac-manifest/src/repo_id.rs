use std::path::Path;

use tokio::process::Command;

/// Detects a repo's identity by trying, in order: the git remote origin
/// URL normalized to `host/owner/repo`, a package manifest's name field,
/// then the directory name. The first strategy that succeeds wins.
pub async fn detect_repo_id(repo_root: &Path) -> String {
    if let Some(id) = git_remote_repo_id(repo_root).await {
        return id;
    }
    if let Some(id) = package_metadata_name(repo_root) {
        return id;
    }
    directory_name(repo_root)
}

async fn git_remote_repo_id(repo_root: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(["remote", "get-url", "origin"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let url = String::from_utf8(output.stdout).ok()?;
    normalize_git_url(url.trim())
}

/// Normalizes the handful of remote URL shapes git actually produces
/// (`git@host:owner/repo.git`, `ssh://git@host/owner/repo.git`,
/// `https://host/owner/repo.git`) to `host/owner/repo`.
fn normalize_git_url(url: &str) -> Option<String> {
    let without_suffix = url.strip_suffix(".git").unwrap_or(url);

    let rest = if let Some(rest) = without_suffix.strip_prefix("git@") {
        rest.replacen(':', "/", 1)
    } else if let Some(rest) = without_suffix.strip_prefix("ssh://git@") {
        rest.to_string()
    } else if let Some(rest) = without_suffix.strip_prefix("https://") {
        rest.to_string()
    } else if let Some(rest) = without_suffix.strip_prefix("http://") {
        rest.to_string()
    } else {
        return None;
    };

    let rest = rest.trim_matches('/');
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 3 {
        return None;
    }
    Some(segments.join("/"))
}

fn package_metadata_name(repo_root: &Path) -> Option<String> {
    if let Ok(contents) = std::fs::read_to_string(repo_root.join("Cargo.toml")) {
        if let Ok(value) = contents.parse::<toml::Value>() {
            if let Some(name) = value.get("package").and_then(|p| p.get("name")).and_then(|n| n.as_str()) {
                return Some(name.to_string());
            }
        }
    }
    if let Ok(contents) = std::fs::read_to_string(repo_root.join("package.json")) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) {
            if let Some(name) = value.get("name").and_then(|n| n.as_str()) {
                return Some(name.to_string());
            }
        }
    }
    None
}

fn directory_name(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| repo_root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_ssh_shorthand() {
        assert_eq!(normalize_git_url("git@github.com:acme/widgets.git"), Some("github.com/acme/widgets".to_string()));
    }

    #[test]
    fn normalizes_https() {
        assert_eq!(normalize_git_url("https://github.com/acme/widgets.git"), Some("github.com/acme/widgets".to_string()));
    }

    #[test]
    fn normalizes_ssh_uri() {
        assert_eq!(normalize_git_url("ssh://git@gitlab.internal/group/sub/widgets.git"), Some("gitlab.internal/group/sub/widgets".to_string()));
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        assert_eq!(normalize_git_url("not a url"), None);
    }

    #[test]
    fn reads_cargo_toml_package_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"widgets\"\n").unwrap();
        assert_eq!(package_metadata_name(dir.path()), Some("widgets".to_string()));
    }
}
