//! Row-level catalog mutations used by `register`/`refresh`, and the
//! generic read-only `query` surface.

use rusqlite::{params, Connection};

use crate::error::HubError;

pub fn upsert_repo(conn: &Connection, repo_id: &str, local_path: &str, now: &str) -> Result<(), HubError> {
    conn.execute(
        "INSERT INTO repos (repo_id, local_path, registered_at, last_refreshed)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(repo_id) DO UPDATE SET local_path = excluded.local_path",
        params![repo_id, local_path, now],
    )?;
    Ok(())
}

pub fn touch_last_refreshed(conn: &Connection, repo_id: &str, now: &str) -> Result<(), HubError> {
    conn.execute("UPDATE repos SET last_refreshed = ?2 WHERE repo_id = ?1", params![repo_id, now])?;
    Ok(())
}

pub fn replace_repo_packages(
    conn: &Connection,
    repo_id: &str,
    packages: &[devac_model::PackageInfo],
) -> Result<(), HubError> {
    conn.execute("DELETE FROM repo_packages WHERE repo_id = ?1", params![repo_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO repo_packages (repo_id, package_path, name, node_count, edge_count)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for package in packages {
        stmt.execute(params![repo_id, package.path, package.name, package.node_count, package.edge_count])?;
    }
    Ok(())
}

pub fn replace_cross_repo_edges(
    conn: &Connection,
    source_repo: &str,
    edges: &[CrossRepoEdgeRow],
) -> Result<(), HubError> {
    conn.execute("DELETE FROM cross_repo_edges WHERE source_repo = ?1", params![source_repo])?;
    let mut stmt = conn.prepare(
        "INSERT INTO cross_repo_edges
            (source_repo, source_entity_id, target_repo, target_entity_id, edge_type, source_file_path)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for edge in edges {
        stmt.execute(params![
            source_repo,
            edge.source_entity_id,
            edge.target_repo,
            edge.target_entity_id,
            edge.edge_type,
            edge.source_file_path,
        ])?;
    }
    Ok(())
}

pub struct CrossRepoEdgeRow {
    pub source_entity_id: String,
    pub target_repo: String,
    pub target_entity_id: String,
    pub edge_type: String,
    pub source_file_path: String,
}

pub fn list_repo_ids(conn: &Connection) -> Result<Vec<String>, HubError> {
    let mut stmt = conn.prepare("SELECT repo_id FROM repos ORDER BY repo_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(HubError::from)
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RepoStatus {
    pub repo_id: String,
    pub local_path: String,
    pub registered_at: String,
    pub last_refreshed: String,
    pub package_count: u64,
}

pub fn repo_status(conn: &Connection, repo_id: &str) -> Result<Option<RepoStatus>, HubError> {
    let status = conn
        .query_row(
            "SELECT repo_id, local_path, registered_at, last_refreshed,
                    (SELECT COUNT(*) FROM repo_packages WHERE repo_packages.repo_id = repos.repo_id)
             FROM repos WHERE repo_id = ?1",
            params![repo_id],
            |row| {
                Ok(RepoStatus {
                    repo_id: row.get(0)?,
                    local_path: row.get(1)?,
                    registered_at: row.get(2)?,
                    last_refreshed: row.get(3)?,
                    package_count: row.get::<_, i64>(4)? as u64,
                })
            },
        )
        .ok();
    Ok(status)
}

/// Workspace-wide summary across every registered repo (spec §4.7
/// "Queries", `getStatus`): distinct from [`RepoStatus`], which answers
/// for one repo.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HubStatus {
    pub repo_count: u64,
    pub package_count: u64,
    pub edge_count: u64,
    pub last_refreshed: Option<String>,
}

pub fn hub_status(conn: &Connection) -> Result<HubStatus, HubError> {
    conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM repos),
            (SELECT COUNT(*) FROM repo_packages),
            (SELECT COUNT(*) FROM cross_repo_edges),
            (SELECT MAX(last_refreshed) FROM repos)",
        [],
        |row| {
            Ok(HubStatus {
                repo_count: row.get::<_, i64>(0)? as u64,
                package_count: row.get::<_, i64>(1)? as u64,
                edge_count: row.get::<_, i64>(2)? as u64,
                last_refreshed: row.get(3)?,
            })
        },
    )
    .map_err(HubError::from)
}

/// Runs an arbitrary read-only statement against the catalog tables,
/// returning one JSON object per row (spec §4.7's `query(sql)`, scoped to
/// the catalog itself — joining in per-repo seed parquet through the
/// query engine's prebound views is left to a future pass; see DESIGN.md).
pub fn query(conn: &Connection, sql: &str) -> Result<Vec<serde_json::Value>, HubError> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let rows = stmt.query_map([], |row| {
        let mut object = serde_json::Map::with_capacity(column_names.len());
        for (idx, name) in column_names.iter().enumerate() {
            object.insert(name.clone(), value_to_json(row.get_ref(idx)?));
        }
        Ok(serde_json::Value::Object(object))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(HubError::from)
}

fn value_to_json(value: rusqlite::types::ValueRef<'_>) -> serde_json::Value {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => {
            serde_json::Number::from_f64(f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
        }
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("0x{}", hex(b))),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
