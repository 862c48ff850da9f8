use rusqlite::Connection;

use crate::error::HubError;

/// The workspace catalog schema (spec §3, "Hub Catalog"). `IF NOT EXISTS`
/// throughout so `init` without `force` is idempotent, matching the
/// catalog crate's own migration-batch convention.
const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS repos (
        repo_id         TEXT PRIMARY KEY NOT NULL,
        local_path      TEXT NOT NULL,
        registered_at   TEXT NOT NULL,
        last_refreshed  TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS repo_packages (
        repo_id     TEXT NOT NULL REFERENCES repos(repo_id),
        package_path TEXT NOT NULL,
        name        TEXT NOT NULL,
        node_count  INTEGER NOT NULL,
        edge_count  INTEGER NOT NULL,
        PRIMARY KEY (repo_id, package_path)
    );

    CREATE TABLE IF NOT EXISTS cross_repo_edges (
        source_repo       TEXT NOT NULL,
        source_entity_id  TEXT NOT NULL,
        target_repo       TEXT NOT NULL,
        target_entity_id  TEXT NOT NULL,
        edge_type         TEXT NOT NULL,
        source_file_path  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS cross_repo_edges_target
        ON cross_repo_edges (target_repo, target_entity_id);
    CREATE INDEX IF NOT EXISTS cross_repo_edges_source
        ON cross_repo_edges (source_repo, source_entity_id);

    CREATE TABLE IF NOT EXISTS diagnostics (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_id     TEXT NOT NULL,
        source      TEXT NOT NULL,
        severity    TEXT NOT NULL,
        code        TEXT NOT NULL,
        message     TEXT NOT NULL,
        file_path   TEXT,
        line        INTEGER,
        resolved    INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS diagnostics_repo ON diagnostics (repo_id, source);
"#;

pub fn init(conn: &Connection) -> Result<(), HubError> {
    conn.execute_batch("BEGIN;")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch("COMMIT;")?;
    Ok(())
}
