//! The unified query engine: binds a set of packages' seed tables as
//! logical `nodes`/`edges`/`external_refs`/`effects` views inside a
//! scratch sqlite connection and executes caller SQL against them.

mod bind;
mod error;
mod pool;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use devac_model::Branch;
pub use error::QueryError;
use pool::ConnectionPool;
use rusqlite::types::ValueRef;

const MAX_RETRIES: u32 = 3;

#[derive(Clone, Debug)]
pub struct QueryRequest {
    pub packages: Vec<PathBuf>,
    pub sql: String,
    pub branch: Branch,
}

#[derive(Clone, Debug, Default)]
pub struct QueryResponse {
    pub rows: Vec<serde_json::Value>,
    pub row_count: usize,
    pub time_ms: u64,
    pub warnings: Vec<String>,
}

pub struct QueryEngine {
    pool: ConnectionPool,
}

impl QueryEngine {
    /// `pool_size` connections, each capped at `memory_limit_kb` of
    /// sqlite page cache (spec §4.2: "connection pool ... with a
    /// configurable memory limit").
    pub fn new(pool_size: usize, memory_limit_kb: i64) -> Result<Self, QueryError> {
        Ok(Self { pool: ConnectionPool::open(pool_size, memory_limit_kb)? })
    }

    /// Executes `request`, scoping it to `request.packages` (1 package is
    /// a package query, N within a repo is a repo query, N across repos
    /// is a workspace query — the engine itself is indifferent to which,
    /// since the packages array is the sole indicator of scope).
    pub fn query(&self, request: &QueryRequest) -> Result<QueryResponse, QueryError> {
        let started = Instant::now();
        let package_paths: Vec<&Path> = request.packages.iter().map(PathBuf::as_path).collect();
        let sql = bind::substitute_placeholders(&request.sql);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self.pool.with_connection(|conn| {
                let warnings = bind::bind_tables(conn, &package_paths, &request.branch)?;
                let rows = run_select(conn, &sql)?;
                Ok((rows, warnings))
            });

            match outcome {
                Ok((rows, warnings)) => {
                    let row_count = rows.len();
                    return Ok(QueryResponse {
                        rows,
                        row_count,
                        time_ms: started.elapsed().as_millis() as u64,
                        warnings,
                    });
                }
                Err(e) if e.is_transient() && attempt < MAX_RETRIES => {
                    tracing::warn!(attempt, error = %e, "retrying transient query backend error");
                    std::thread::sleep(backoff(attempt));
                    continue;
                }
                Err(e) if e.is_transient() => {
                    return Err(QueryError::RetriesExhausted {
                        attempts: attempt,
                        source: match e {
                            QueryError::Sql(inner) => inner,
                            _ => unreachable!("is_transient only matches QueryError::Sql"),
                        },
                    });
                }
                Err(e) => return Err(map_schema_error(&sql, e)),
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(20u64.saturating_mul(1 << attempt.min(5)))
}

/// Distinguishes "no such table: nodes" (a logical table that was never
/// bound because no package had data for it) from any other sqlite error,
/// surfacing the former as `SchemaUnavailable` with the table name (spec
/// §4.2: "queries referencing an unbound view fail with
/// `SchemaUnavailable` and a suggestion to run analysis").
fn map_schema_error(_sql: &str, err: QueryError) -> QueryError {
    if let QueryError::Sql(rusqlite::Error::SqliteFailure(_, Some(msg))) = &err {
        if let Some(table) = msg.strip_prefix("no such table: ") {
            return QueryError::SchemaUnavailable { table: table.to_string() };
        }
    }
    err
}

fn run_select(conn: &rusqlite::Connection, sql: &str) -> Result<Vec<serde_json::Value>, QueryError> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let rows = stmt.query_map([], |row| {
        let mut object = serde_json::Map::with_capacity(column_names.len());
        for (idx, name) in column_names.iter().enumerate() {
            object.insert(name.clone(), value_to_json(row.get_ref(idx)?));
        }
        Ok(serde_json::Value::Object(object))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(QueryError::from)
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("0x{}", hex(b))),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_model::{EntityId, Node, NodeFlags, NodeKind, PropertyBag, Visibility};
    use devac_store::{SeedBatch, SeedStore};

    fn write_sample_package(root: &Path) {
        let store = SeedStore::open(root);
        let node = Node {
            entity_id: EntityId::new("acme/widgets", ".", "function", "a"),
            name: "render".to_string(),
            qualified_name: "render".to_string(),
            kind: NodeKind::Function,
            file_path: "src/a.ts".to_string(),
            start_line: 1,
            start_column: 0,
            end_line: 2,
            end_column: 0,
            visibility: Visibility::Public,
            flags: NodeFlags::default(),
            type_signature: None,
            documentation: None,
            decorators: Vec::new(),
            type_parameters: Vec::new(),
            properties: PropertyBag::empty(),
            source_file_hash: "deadbeef".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        store.write(&Branch::Base, &SeedBatch { nodes: vec![node], ..Default::default() }).unwrap();
    }

    #[test]
    fn queries_bound_nodes_table() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_package(dir.path());

        let engine = QueryEngine::new(2, 2048).unwrap();
        let response = engine
            .query(&QueryRequest {
                packages: vec![dir.path().to_path_buf()],
                sql: "SELECT name FROM nodes".to_string(),
                branch: Branch::Base,
            })
            .unwrap();

        assert_eq!(response.row_count, 1);
        assert_eq!(response.rows[0]["name"], "render");
    }

    #[test]
    fn unbound_package_reports_warnings_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = QueryEngine::new(1, 1024).unwrap();
        let response = engine
            .query(&QueryRequest {
                packages: vec![dir.path().to_path_buf()],
                sql: "SELECT 1".to_string(),
                branch: Branch::Base,
            })
            .unwrap();
        assert!(!response.warnings.is_empty());
    }

    #[test]
    fn unbound_table_reference_is_schema_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = QueryEngine::new(1, 1024).unwrap();
        let err = engine
            .query(&QueryRequest {
                packages: vec![dir.path().to_path_buf()],
                sql: "SELECT * FROM nodes".to_string(),
                branch: Branch::Base,
            })
            .unwrap_err();
        assert!(matches!(err, QueryError::SchemaUnavailable { .. }));
    }

    #[test]
    fn placeholder_substitution_resolves_bare_table_names() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_package(dir.path());
        let engine = QueryEngine::new(1, 1024).unwrap();
        let response = engine
            .query(&QueryRequest {
                packages: vec![dir.path().to_path_buf()],
                sql: "SELECT count(*) AS n FROM {nodes}".to_string(),
                branch: Branch::Base,
            })
            .unwrap();
        assert_eq!(response.rows[0]["n"], 1);
    }
}
