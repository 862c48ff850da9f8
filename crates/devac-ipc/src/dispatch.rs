//! Maps a method name plus JSON params onto a [`devac_hub::Hub`] call.
//! Shared by the server (one dispatch per request received over the
//! socket) and the client's in-process fallback (the same dispatch
//! called directly, with no socket round-trip), so the two paths can
//! never drift apart on behavior.

use std::path::Path;

use devac_hub::{DiagnosticsFilter, Hub, NewDiagnostic};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::IpcError;
use crate::protocol::METHODS;

pub async fn dispatch(hub: &Hub, method: &str, params: Value) -> Result<Value, IpcError> {
    if !METHODS.contains(&method) {
        return Err(IpcError::MethodNotFound(method.to_string()));
    }

    match method {
        "register" => {
            let p: RegisterParams = parse(params)?;
            let repo_id = hub.register(Path::new(&p.repo_path)).await?;
            Ok(serde_json::json!({ "repo_id": repo_id }))
        }
        "unregister" => {
            let p: RepoIdParams = parse(params)?;
            hub.unregister(&p.repo_id)?;
            Ok(serde_json::json!({}))
        }
        "refresh" => {
            let p: RefreshParams = parse(params)?;
            let report = hub.refresh(p.repo_ids).await?;
            Ok(serde_json::to_value(report)?)
        }
        "refreshAll" => {
            let report = hub.refresh(None).await?;
            Ok(serde_json::to_value(report)?)
        }
        "pushDiagnostics" => {
            let p: PushDiagnosticsParams = parse(params)?;
            let count = hub.push_diagnostics(&p.items)?;
            Ok(serde_json::json!({ "count": count }))
        }
        "clearDiagnostics" => {
            let p: ClearDiagnosticsParams = parse(params)?;
            let count = hub.clear_diagnostics(&p.repo_id, p.source.as_deref())?;
            Ok(serde_json::json!({ "count": count }))
        }
        "resolveDiagnostics" => {
            let p: ResolveDiagnosticsParams = parse(params)?;
            let count = hub.resolve_diagnostics(&p.ids)?;
            Ok(serde_json::json!({ "count": count }))
        }
        "pushValidationErrors" => {
            let p: PushValidationErrorsParams = parse(params)?;
            let count = hub.push_validation_errors(&p.repo_id, &p.errors)?;
            Ok(serde_json::json!({ "count": count }))
        }
        "query" => {
            let p: QueryParams = parse(params)?;
            let rows = hub.query(&p.sql)?;
            Ok(serde_json::json!({ "rows": rows }))
        }
        "listRepos" => Ok(serde_json::to_value(hub.list_repos()?)?),
        "getRepoStatus" => {
            let p: RepoIdParams = parse(params)?;
            Ok(serde_json::to_value(hub.get_repo_status(&p.repo_id)?)?)
        }
        "getValidationErrors" => {
            let p: RepoIdParams = parse(params)?;
            Ok(serde_json::to_value(hub.get_validation_errors(&p.repo_id)?)?)
        }
        "getValidationSummary" => {
            let p: RepoIdParams = parse(params)?;
            Ok(serde_json::to_value(hub.get_validation_summary(&p.repo_id)?)?)
        }
        "getValidationCounts" => {
            let p: RepoIdParams = parse(params)?;
            Ok(serde_json::to_value(hub.get_validation_counts(&p.repo_id)?)?)
        }
        "getDiagnostics" => {
            let filter: DiagnosticsFilter = parse_or_default(params)?;
            Ok(serde_json::to_value(hub.get_diagnostics(&filter)?)?)
        }
        "getDiagnosticsSummary" => {
            let filter: DiagnosticsFilter = parse_or_default(params)?;
            Ok(serde_json::to_value(hub.get_diagnostics_summary(&filter)?)?)
        }
        "getDiagnosticsCounts" => {
            let filter: DiagnosticsFilter = parse_or_default(params)?;
            Ok(serde_json::to_value(hub.get_diagnostics_counts(&filter)?)?)
        }
        _ => unreachable!("checked against METHODS above"),
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, IpcError> {
    serde_json::from_value(params).map_err(|e| IpcError::InvalidParams(e.to_string()))
}

/// Like [`parse`], but an absent/null `params` value is treated as the
/// type's default rather than a parse error — used by the read-only
/// diagnostics filters, where every field is optional.
fn parse_or_default<T: DeserializeOwned + Default>(params: Value) -> Result<T, IpcError> {
    if params.is_null() {
        return Ok(T::default());
    }
    parse(params)
}

#[derive(Deserialize)]
struct RegisterParams {
    repo_path: String,
}

#[derive(Deserialize)]
struct RepoIdParams {
    repo_id: String,
}

#[derive(Deserialize, Default)]
struct RefreshParams {
    #[serde(default)]
    repo_ids: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct PushDiagnosticsParams {
    items: Vec<NewDiagnostic>,
}

#[derive(Deserialize)]
struct ClearDiagnosticsParams {
    repo_id: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct ResolveDiagnosticsParams {
    ids: Vec<i64>,
}

#[derive(Deserialize)]
struct PushValidationErrorsParams {
    repo_id: String,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct QueryParams {
    sql: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_store::SeedBatch;
    use std::path::PathBuf;

    fn make_repo(dir: &std::path::Path, name: &str) -> PathBuf {
        let repo = dir.join(name);
        std::fs::create_dir_all(repo.join("src")).unwrap();
        std::fs::write(repo.join("Cargo.toml"), format!("[package]\nname = \"{name}\"\n")).unwrap();
        let seed_base = repo.join(".devac-seed").join("base");
        std::fs::create_dir_all(&seed_base).unwrap();
        devac_store::SeedStore::open(&repo).write(&devac_model::Branch::Base, &SeedBatch::default()).unwrap();
        repo
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(dir.path(), false).unwrap();
        let err = dispatch(&hub, "analyze", Value::Null).await.unwrap_err();
        assert!(matches!(err, IpcError::MethodNotFound(m) if m == "analyze"));
    }

    #[tokio::test]
    async fn register_then_list_repos_round_trips() {
        let workspace = tempfile::tempdir().unwrap();
        let repo = make_repo(workspace.path(), "repo-a");
        let hub_dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(hub_dir.path(), false).unwrap();

        let result = dispatch(
            &hub,
            "register",
            serde_json::json!({ "repo_path": repo.to_string_lossy() }),
        )
        .await
        .unwrap();
        let repo_id = result["repo_id"].as_str().unwrap().to_string();

        let repos = dispatch(&hub, "listRepos", Value::Null).await.unwrap();
        assert_eq!(repos, serde_json::json!([repo_id]));
    }

    #[tokio::test]
    async fn get_diagnostics_defaults_params_to_unfiltered() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Hub::init(dir.path(), false).unwrap();
        let rows = dispatch(&hub, "getDiagnostics", Value::Null).await.unwrap();
        assert_eq!(rows, serde_json::json!([]));
    }
}
