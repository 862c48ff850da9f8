//! The federation hub (spec §4.7): a single process that owns the
//! cross-repo catalog — registered repos, their packages, the
//! cross-repo edges projected from each repo's external references, and
//! diagnostics/validation errors pushed in by analyzers — and answers the
//! affected-set query that needs all of them at once.

mod affected;
mod catalog;
mod diagnostics;
mod error;
mod pool;
mod schema;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use devac_model::Branch;
use rusqlite::Connection;

pub use affected::{AffectedEntity, AffectedSetRequest, ImpactLevel};
pub use catalog::{HubStatus, RepoStatus};
pub use diagnostics::{
    Diagnostic, DiagnosticsCounts, DiagnosticsFilter, DiagnosticsSummary, NewDiagnostic, VALIDATION_SOURCE,
};
pub use error::HubError;

const CATALOG_FILE: &str = "central.db";

pub struct Hub {
    writer: Mutex<Connection>,
    readers: pool::ReadPool,
    hub_dir: PathBuf,
}

/// Outcome of a [`Hub::refresh`] covering possibly many repos: a repo whose
/// manifest regeneration failed does not abort the rest.
#[derive(Debug, Default, serde::Serialize)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl Hub {
    /// Opens (or creates) the catalog at `<hub_dir>/central.db`. With
    /// `force`, any existing catalog file is removed first so `init`
    /// starts from an empty schema.
    pub fn init(hub_dir: &Path, force: bool) -> Result<Self, HubError> {
        std::fs::create_dir_all(hub_dir).map_err(|e| HubError::io(hub_dir, e))?;
        let db_path = hub_dir.join(CATALOG_FILE);
        if force && db_path.exists() {
            std::fs::remove_file(&db_path).map_err(|e| HubError::io(&db_path, e))?;
        }

        let writer = Connection::open(&db_path)?;
        schema::init(&writer)?;
        drop(writer);

        // Reopen the writer after `init` so the file exists before the
        // read pool opens its read-only connections against it.
        let writer = Connection::open(&db_path)?;
        let readers = pool::ReadPool::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "hub catalog ready");
        Ok(Self { writer: Mutex::new(writer), readers, hub_dir: hub_dir.to_path_buf() })
    }

    pub fn hub_dir(&self) -> &Path {
        &self.hub_dir
    }

    /// Registers `repo_path`: generates a manifest if none exists yet,
    /// upserts the `repos` row, replaces its `repo_packages` rows, and
    /// rebuilds the cross-repo edges it projects onto other repos.
    pub async fn register(&self, repo_path: &Path) -> Result<String, HubError> {
        let manifest = match devac_manifest::read(repo_path)? {
            Some(manifest) => manifest,
            None => devac_manifest::generate(repo_path).await?,
        };
        let repo_id = manifest.repo_id.clone();
        let now = now_rfc3339();

        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        catalog::upsert_repo(&conn, &repo_id, &repo_path.to_string_lossy(), &now)?;
        catalog::replace_repo_packages(&conn, &repo_id, &manifest.packages)?;
        drop(conn);

        self.project_cross_repo_edges(repo_path, &repo_id, &manifest)?;
        tracing::info!(repo_id = %repo_id, packages = manifest.packages.len(), "repo registered");
        Ok(repo_id)
    }

    pub fn unregister(&self, repo_id: &str) -> Result<(), HubError> {
        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        conn.execute("DELETE FROM cross_repo_edges WHERE source_repo = ?1", rusqlite::params![repo_id])?;
        conn.execute("DELETE FROM repo_packages WHERE repo_id = ?1", rusqlite::params![repo_id])?;
        conn.execute("DELETE FROM repos WHERE repo_id = ?1", rusqlite::params![repo_id])?;
        Ok(())
    }

    /// Regenerates the manifest and cross-repo edges for `repo_ids`, or
    /// every registered repo when `None`. Per-repo failures are collected
    /// rather than aborting the batch.
    pub async fn refresh(&self, repo_ids: Option<Vec<String>>) -> Result<RefreshReport, HubError> {
        let targets = match repo_ids {
            Some(ids) => ids,
            None => {
                let conn = self.writer.lock().expect("hub writer mutex poisoned");
                catalog::list_repo_ids(&conn)?
            }
        };

        let mut report = RefreshReport::default();
        for repo_id in targets {
            match self.refresh_one(&repo_id).await {
                Ok(()) => report.refreshed.push(repo_id),
                Err(e) => report.failed.push((repo_id, e.to_string())),
            }
        }
        Ok(report)
    }

    async fn refresh_one(&self, repo_id: &str) -> Result<(), HubError> {
        let local_path = {
            let conn = self.writer.lock().expect("hub writer mutex poisoned");
            catalog::repo_status(&conn, repo_id)?.ok_or_else(|| HubError::UnknownRepo(repo_id.to_string()))?.local_path
        };
        let repo_path = PathBuf::from(local_path);
        let manifest = devac_manifest::update(&repo_path, &[]).await?;
        let now = now_rfc3339();

        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        catalog::replace_repo_packages(&conn, repo_id, &manifest.packages)?;
        catalog::touch_last_refreshed(&conn, repo_id, &now)?;
        drop(conn);

        self.project_cross_repo_edges(&repo_path, repo_id, &manifest)
    }

    /// Scans every package's base-branch external references for refs
    /// that resolved to an entity in a different repo, and replaces this
    /// repo's `cross_repo_edges` rows with the result.
    fn project_cross_repo_edges(
        &self,
        repo_path: &Path,
        repo_id: &str,
        manifest: &devac_model::Manifest,
    ) -> Result<(), HubError> {
        let mut edges = Vec::new();
        for package in &manifest.packages {
            let package_root = repo_path.join(&package.path);
            let store = devac_store::SeedStore::open(&package_root);
            let view = store.read(&Branch::Base)?;
            for r in &view.external_refs {
                if r.is_deleted || !r.is_resolved {
                    continue;
                }
                let Some(target) = &r.target_entity_id else { continue };
                let Some(target_repo) = target.repo() else { continue };
                if target_repo == repo_id {
                    continue;
                }
                edges.push(catalog::CrossRepoEdgeRow {
                    source_entity_id: r.source_entity_id.as_str().to_string(),
                    target_repo: target_repo.to_string(),
                    target_entity_id: target.as_str().to_string(),
                    edge_type: "import".to_string(),
                    source_file_path: r.source_file_path.clone(),
                });
            }
        }

        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        catalog::replace_cross_repo_edges(&conn, repo_id, &edges)
    }

    pub fn list_repos(&self) -> Result<Vec<String>, HubError> {
        self.readers.with_connection(|conn| catalog::list_repo_ids(conn))
    }

    pub fn get_repo_status(&self, repo_id: &str) -> Result<Option<RepoStatus>, HubError> {
        self.readers.with_connection(|conn| catalog::repo_status(conn, repo_id))
    }

    /// Workspace-wide catalog summary (spec §4.7 "Queries", `getStatus`):
    /// not part of the IPC closed method set, so only reachable directly
    /// on the `Hub` or through [`devac_ipc::IpcClient`]'s in-process
    /// fallback.
    pub fn get_status(&self) -> Result<HubStatus, HubError> {
        self.readers.with_connection(catalog::hub_status)
    }

    pub fn analyze(&self, request: &AffectedSetRequest) -> Result<Vec<AffectedEntity>, HubError> {
        self.readers.with_connection(|conn| affected::analyze(conn, request))
    }

    /// Runs a read-only SQL statement against the catalog tables and
    /// returns one JSON object per row.
    pub fn query(&self, sql: &str) -> Result<Vec<serde_json::Value>, HubError> {
        self.readers.with_connection(|conn| catalog::query(conn, sql))
    }

    pub fn push_diagnostics(&self, items: &[NewDiagnostic]) -> Result<usize, HubError> {
        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        diagnostics::push(&conn, items, &now_rfc3339())
    }

    pub fn clear_diagnostics(&self, repo_id: &str, source: Option<&str>) -> Result<usize, HubError> {
        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        diagnostics::clear(&conn, repo_id, source)
    }

    pub fn resolve_diagnostics(&self, ids: &[i64]) -> Result<usize, HubError> {
        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        diagnostics::resolve(&conn, ids)
    }

    pub fn push_validation_errors(&self, repo_id: &str, errors: &[String]) -> Result<usize, HubError> {
        let conn = self.writer.lock().expect("hub writer mutex poisoned");
        diagnostics::push_validation_errors(&conn, repo_id, errors, &now_rfc3339())
    }

    pub fn get_diagnostics(&self, filter: &DiagnosticsFilter) -> Result<Vec<Diagnostic>, HubError> {
        self.readers.with_connection(|conn| diagnostics::query(conn, filter))
    }

    pub fn get_diagnostics_summary(&self, filter: &DiagnosticsFilter) -> Result<DiagnosticsSummary, HubError> {
        self.readers.with_connection(|conn| diagnostics::summary(conn, filter))
    }

    pub fn get_diagnostics_counts(&self, filter: &DiagnosticsFilter) -> Result<DiagnosticsCounts, HubError> {
        self.readers.with_connection(|conn| diagnostics::counts(conn, filter))
    }

    pub fn get_validation_errors(&self, repo_id: &str) -> Result<Vec<Diagnostic>, HubError> {
        self.get_diagnostics(&validation_filter(repo_id))
    }

    pub fn get_validation_summary(&self, repo_id: &str) -> Result<DiagnosticsSummary, HubError> {
        self.get_diagnostics_summary(&validation_filter(repo_id))
    }

    pub fn get_validation_counts(&self, repo_id: &str) -> Result<DiagnosticsCounts, HubError> {
        self.get_diagnostics_counts(&validation_filter(repo_id))
    }
}

fn validation_filter(repo_id: &str) -> DiagnosticsFilter {
    DiagnosticsFilter {
        repo_id: Some(repo_id.to_string()),
        source: Some(VALIDATION_SOURCE.to_string()),
        ..Default::default()
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_store::SeedBatch;

    fn make_repo(dir: &Path, name: &str) -> PathBuf {
        let repo = dir.join(name);
        std::fs::create_dir_all(repo.join("src")).unwrap();
        std::fs::write(repo.join("Cargo.toml"), format!("[package]\nname = \"{name}\"\n")).unwrap();
        let seed_base = repo.join(".devac-seed").join("base");
        std::fs::create_dir_all(&seed_base).unwrap();
        let store = devac_store::SeedStore::open(&repo);
        store.write(&Branch::Base, &SeedBatch::default()).unwrap();
        repo
    }

    #[tokio::test]
    async fn register_and_list_repos() {
        let hub_dir = tempfile::tempdir().unwrap();
        let repos_dir = tempfile::tempdir().unwrap();
        let repo = make_repo(repos_dir.path(), "alpha");

        let hub = Hub::init(hub_dir.path(), false).unwrap();
        let repo_id = hub.register(&repo).await.unwrap();
        assert_eq!(hub.list_repos().unwrap(), vec![repo_id.clone()]);

        let status = hub.get_repo_status(&repo_id).unwrap().unwrap();
        assert_eq!(status.repo_id, repo_id);

        let workspace_status = hub.get_status().unwrap();
        assert_eq!(workspace_status.repo_count, 1);
        assert!(workspace_status.last_refreshed.is_some());
    }

    #[tokio::test]
    async fn get_status_reports_empty_catalog() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(hub_dir.path(), false).unwrap();
        let status = hub.get_status().unwrap();
        assert_eq!(status.repo_count, 0);
        assert_eq!(status.package_count, 0);
        assert_eq!(status.edge_count, 0);
        assert!(status.last_refreshed.is_none());
    }

    #[tokio::test]
    async fn refresh_updates_last_refreshed() {
        let hub_dir = tempfile::tempdir().unwrap();
        let repos_dir = tempfile::tempdir().unwrap();
        let repo = make_repo(repos_dir.path(), "beta");

        let hub = Hub::init(hub_dir.path(), false).unwrap();
        let repo_id = hub.register(&repo).await.unwrap();
        let before = hub.get_repo_status(&repo_id).unwrap().unwrap().last_refreshed;

        let report = hub.refresh(None).await.unwrap();
        assert_eq!(report.refreshed, vec![repo_id.clone()]);
        assert!(report.failed.is_empty());
        let after = hub.get_repo_status(&repo_id).unwrap().unwrap().last_refreshed;
        assert!(after >= before);
    }

    #[test]
    fn diagnostics_push_query_and_resolve_round_trip() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(hub_dir.path(), false).unwrap();

        let item = NewDiagnostic {
            repo_id: "host/owner/repo".to_string(),
            source: "analyzer".to_string(),
            severity: "warning".to_string(),
            code: "unused-import".to_string(),
            message: "unused import".to_string(),
            file_path: Some("src/lib.rs".to_string()),
            line: Some(3),
        };
        hub.push_diagnostics(&[item]).unwrap();

        let all = hub.get_diagnostics(&DiagnosticsFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].resolved);

        let counts = hub.get_diagnostics_counts(&DiagnosticsFilter::default()).unwrap();
        assert_eq!(counts, DiagnosticsCounts { total: 1, open: 1, resolved: 0 });

        hub.resolve_diagnostics(&[all[0].id]).unwrap();
        let counts = hub.get_diagnostics_counts(&DiagnosticsFilter::default()).unwrap();
        assert_eq!(counts.resolved, 1);
    }

    #[test]
    fn validation_errors_are_diagnostics_with_validation_source() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(hub_dir.path(), false).unwrap();

        hub.push_validation_errors("host/owner/repo", &["row count mismatch".to_string()]).unwrap();
        let errors = hub.get_validation_errors("host/owner/repo").unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].source, VALIDATION_SOURCE);

        // A plain analyzer diagnostic on the same repo must not leak in.
        hub.push_diagnostics(&[NewDiagnostic {
            repo_id: "host/owner/repo".to_string(),
            source: "analyzer".to_string(),
            severity: "error".to_string(),
            code: "parse-error".to_string(),
            message: "bad syntax".to_string(),
            file_path: None,
            line: None,
        }])
        .unwrap();
        let errors = hub.get_validation_errors("host/owner/repo").unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn analyze_walks_cross_repo_edges_in_reverse() {
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(hub_dir.path(), false).unwrap();

        {
            let conn = hub.writer.lock().unwrap();
            catalog::upsert_repo(&conn, "host/a", "/repos/a", "t").unwrap();
            catalog::upsert_repo(&conn, "host/b", "/repos/b", "t").unwrap();
            catalog::replace_cross_repo_edges(
                &conn,
                "host/b",
                &[catalog::CrossRepoEdgeRow {
                    source_entity_id: "host/b:pkg:function:1".to_string(),
                    target_repo: "host/a".to_string(),
                    target_entity_id: "host/a:pkg:function:2".to_string(),
                    edge_type: "import".to_string(),
                    source_file_path: "src/lib.rs".to_string(),
                }],
            )
            .unwrap();
        }

        let request = AffectedSetRequest {
            changed_entity_ids: vec!["host/a:pkg:function:2".to_string()],
            ..Default::default()
        };
        let affected = hub.analyze(&request).unwrap();
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].repo_id, "host/b");
        assert_eq!(affected[0].impact_level, ImpactLevel::Direct);
    }
}
