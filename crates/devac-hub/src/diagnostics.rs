//! Diagnostics storage backing the six diagnostics/validation IPC methods
//! named but left otherwise unspecified by spec §4.9
//! (`push/clear/resolveDiagnostics`, `pushValidationErrors`,
//! `get{Diagnostics,ValidationErrors}{,Summary,Counts}`). Validation
//! errors are diagnostics with `source = "validation"`; the two method
//! families share one table and one query surface, filtered by source.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::HubError;

pub const VALIDATION_SOURCE: &str = "validation";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: i64,
    pub repo_id: String,
    pub source: String,
    pub severity: String,
    pub code: String,
    pub message: String,
    pub file_path: Option<String>,
    pub line: Option<i64>,
    pub resolved: bool,
    pub created_at: String,
}

/// A diagnostic to insert; `id`, `resolved`, and `created_at` are assigned
/// by the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewDiagnostic {
    pub repo_id: String,
    pub source: String,
    pub severity: String,
    pub code: String,
    pub message: String,
    pub file_path: Option<String>,
    pub line: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiagnosticsFilter {
    pub repo_id: Option<String>,
    pub source: Option<String>,
    pub severity: Option<String>,
    pub resolved: Option<bool>,
}

/// Total plus a per-severity breakdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    pub total: u64,
    pub by_severity: Vec<(String, u64)>,
}

/// Total plus the open/resolved split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsCounts {
    pub total: u64,
    pub open: u64,
    pub resolved: u64,
}

pub fn push(conn: &Connection, items: &[NewDiagnostic], created_at: &str) -> Result<usize, HubError> {
    let mut stmt = conn.prepare(
        "INSERT INTO diagnostics (repo_id, source, severity, code, message, file_path, line, resolved, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
    )?;
    for item in items {
        stmt.execute(params![
            item.repo_id,
            item.source,
            item.severity,
            item.code,
            item.message,
            item.file_path,
            item.line,
            created_at,
        ])?;
    }
    Ok(items.len())
}

pub fn push_validation_errors(
    conn: &Connection,
    repo_id: &str,
    errors: &[String],
    created_at: &str,
) -> Result<usize, HubError> {
    let items: Vec<NewDiagnostic> = errors
        .iter()
        .map(|message| NewDiagnostic {
            repo_id: repo_id.to_string(),
            source: VALIDATION_SOURCE.to_string(),
            severity: "error".to_string(),
            code: VALIDATION_SOURCE.to_string(),
            message: message.clone(),
            file_path: None,
            line: None,
        })
        .collect();
    push(conn, &items, created_at)
}

pub fn clear(conn: &Connection, repo_id: &str, source: Option<&str>) -> Result<usize, HubError> {
    let affected = match source {
        Some(source) => conn.execute("DELETE FROM diagnostics WHERE repo_id = ?1 AND source = ?2", params![repo_id, source])?,
        None => conn.execute("DELETE FROM diagnostics WHERE repo_id = ?1", params![repo_id])?,
    };
    Ok(affected)
}

pub fn resolve(conn: &Connection, ids: &[i64]) -> Result<usize, HubError> {
    let mut stmt = conn.prepare("UPDATE diagnostics SET resolved = 1 WHERE id = ?1")?;
    let mut affected = 0;
    for id in ids {
        affected += stmt.execute(params![id])?;
    }
    Ok(affected)
}

pub fn query(conn: &Connection, filter: &DiagnosticsFilter) -> Result<Vec<Diagnostic>, HubError> {
    let (clause, binds) = filter_clause(filter);
    let sql = format!(
        "SELECT id, repo_id, source, severity, code, message, file_path, line, resolved, created_at
         FROM diagnostics {clause} ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(binds), row_to_diagnostic)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(HubError::from)
}

pub fn summary(conn: &Connection, filter: &DiagnosticsFilter) -> Result<DiagnosticsSummary, HubError> {
    let (clause, binds) = filter_clause(filter);
    let sql = format!("SELECT severity, COUNT(*) FROM diagnostics {clause} GROUP BY severity");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(binds), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    let by_severity: Vec<(String, u64)> = rows.collect::<Result<_, _>>()?;
    let total = by_severity.iter().map(|(_, n)| n).sum();
    Ok(DiagnosticsSummary { total, by_severity })
}

pub fn counts(conn: &Connection, filter: &DiagnosticsFilter) -> Result<DiagnosticsCounts, HubError> {
    let (clause, binds) = filter_clause(filter);
    let sql = format!("SELECT resolved, COUNT(*) FROM diagnostics {clause} GROUP BY resolved");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(binds), |row| {
        Ok((row.get::<_, i64>(0)? != 0, row.get::<_, i64>(1)? as u64))
    })?;
    let mut open = 0;
    let mut resolved = 0;
    for row in rows {
        let (is_resolved, n) = row?;
        if is_resolved {
            resolved = n;
        } else {
            open = n;
        }
    }
    Ok(DiagnosticsCounts { total: open + resolved, open, resolved })
}

fn filter_clause(filter: &DiagnosticsFilter) -> (String, Vec<rusqlite::types::Value>) {
    let mut clauses = Vec::new();
    let mut binds: Vec<rusqlite::types::Value> = Vec::new();
    if let Some(repo_id) = &filter.repo_id {
        clauses.push("repo_id = ?".to_string());
        binds.push(repo_id.clone().into());
    }
    if let Some(source) = &filter.source {
        clauses.push("source = ?".to_string());
        binds.push(source.clone().into());
    }
    if let Some(severity) = &filter.severity {
        clauses.push("severity = ?".to_string());
        binds.push(severity.clone().into());
    }
    if let Some(resolved) = filter.resolved {
        clauses.push("resolved = ?".to_string());
        binds.push((resolved as i64).into());
    }
    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), binds)
    }
}

fn row_to_diagnostic(row: &rusqlite::Row<'_>) -> rusqlite::Result<Diagnostic> {
    Ok(Diagnostic {
        id: row.get(0)?,
        repo_id: row.get(1)?,
        source: row.get(2)?,
        severity: row.get(3)?,
        code: row.get(4)?,
        message: row.get(5)?,
        file_path: row.get(6)?,
        line: row.get(7)?,
        resolved: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
    })
}

