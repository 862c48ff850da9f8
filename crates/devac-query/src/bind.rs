//! Materializes the logical `nodes`/`edges`/`external_refs`/`effects`
//! tables for a set of packages into a scratch `rusqlite::Connection`,
//! flipping source of truth from sqlite (as in the teacher's
//! `persist_tables`/`load_tables` pattern) to the parquet seed files —
//! sqlite here is a disposable query surface, not a store.

use std::path::Path;

use devac_model::{Branch, Edge, Effect, ExternalRef, Node};
use devac_store::SeedStore;
use rusqlite::{params, Connection};

use crate::error::QueryError;

pub const LOGICAL_TABLES: [&str; 4] = ["nodes", "edges", "external_refs", "effects"];

/// Binds every logical table across `packages` for `branch`, returning
/// one warning per table that had no package data to bind (spec §4.2:
/// "Missing tables are reported as warnings and the view is omitted").
pub fn bind_tables(
    conn: &Connection,
    packages: &[&Path],
    branch: &Branch,
) -> Result<Vec<String>, QueryError> {
    let mut warnings = Vec::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut external_refs = Vec::new();
    let mut effects = Vec::new();
    let mut any_seed_present = false;

    for package in packages {
        let store = SeedStore::open(package);
        if !store.seed_root().exists() {
            continue;
        }
        any_seed_present = true;
        let view = store.read(branch)?;
        nodes.extend(view.nodes);
        edges.extend(view.edges);
        external_refs.extend(view.external_refs);
        effects.extend(view.effects);
    }

    if !any_seed_present {
        for table in LOGICAL_TABLES {
            warnings.push(format!("{table} has no bound package data"));
        }
        return Ok(warnings);
    }

    create_nodes(conn, &nodes)?;
    create_edges(conn, &edges)?;
    create_external_refs(conn, &external_refs)?;
    create_effects(conn, &effects)?;
    Ok(warnings)
}

/// Rewrites `{nodes}`/`{edges}`-style placeholders to their bare table
/// names once binding has happened (spec §4.2, "placeholder
/// substitution").
pub fn substitute_placeholders(sql: &str) -> String {
    let mut out = sql.to_string();
    for table in LOGICAL_TABLES {
        out = out.replace(&format!("{{{table}}}"), table);
    }
    out
}

fn create_nodes(conn: &Connection, rows: &[Node]) -> Result<(), QueryError> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS nodes; CREATE TABLE nodes (
            entity_id TEXT, name TEXT, qualified_name TEXT, kind TEXT, file_path TEXT,
            start_line INTEGER, start_column INTEGER, end_line INTEGER, end_column INTEGER,
            visibility TEXT, is_exported INTEGER, is_default_export INTEGER, is_async INTEGER,
            is_generator INTEGER, is_static INTEGER, is_abstract INTEGER, type_signature TEXT,
            documentation TEXT, decorators TEXT, type_parameters TEXT, properties TEXT,
            source_file_hash TEXT, branch TEXT, is_deleted INTEGER, updated_at TEXT
        );",
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO nodes VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
    )?;
    for n in rows {
        stmt.execute(params![
            n.entity_id.as_str(),
            n.name,
            n.qualified_name,
            serde_json::to_value(&n.kind).unwrap().as_str().unwrap_or_default(),
            n.file_path,
            n.start_line,
            n.start_column,
            n.end_line,
            n.end_column,
            serde_json::to_value(&n.visibility).unwrap().as_str().unwrap_or_default(),
            n.flags.is_exported,
            n.flags.is_default_export,
            n.flags.is_async,
            n.flags.is_generator,
            n.flags.is_static,
            n.flags.is_abstract,
            n.type_signature,
            n.documentation,
            serde_json::to_string(&n.decorators).unwrap_or_default(),
            serde_json::to_string(&n.type_parameters).unwrap_or_default(),
            n.properties.to_json_string(),
            n.source_file_hash,
            n.branch.as_str(),
            n.is_deleted,
            n.updated_at,
        ])?;
    }
    Ok(())
}

fn create_edges(conn: &Connection, rows: &[Edge]) -> Result<(), QueryError> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS edges; CREATE TABLE edges (
            source_entity_id TEXT, target_entity_id TEXT, edge_type TEXT, source_file_path TEXT,
            source_line INTEGER, source_column INTEGER, properties TEXT, source_file_hash TEXT,
            branch TEXT, is_deleted INTEGER, updated_at TEXT
        );",
    )?;
    let mut stmt = conn.prepare("INSERT INTO edges VALUES (?,?,?,?,?,?,?,?,?,?,?)")?;
    for e in rows {
        stmt.execute(params![
            e.source_entity_id.as_str(),
            e.target_entity_id.as_str(),
            serde_json::to_value(&e.edge_type).unwrap().as_str().unwrap_or_default(),
            e.source_file_path,
            e.source_line,
            e.source_column,
            e.properties.to_json_string(),
            e.source_file_hash,
            e.branch.as_str(),
            e.is_deleted,
            e.updated_at,
        ])?;
    }
    Ok(())
}

fn create_external_refs(conn: &Connection, rows: &[ExternalRef]) -> Result<(), QueryError> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS external_refs; CREATE TABLE external_refs (
            source_entity_id TEXT, module_specifier TEXT, imported_symbol TEXT, local_alias TEXT,
            import_style TEXT, is_type_only INTEGER, source_file_path TEXT, source_line INTEGER,
            source_column INTEGER, target_entity_id TEXT, is_resolved INTEGER, is_reexport INTEGER,
            export_alias TEXT, source_file_hash TEXT, branch TEXT, is_deleted INTEGER, updated_at TEXT
        );",
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO external_refs VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)")?;
    for r in rows {
        stmt.execute(params![
            r.source_entity_id.as_str(),
            r.module_specifier,
            r.imported_symbol,
            r.local_alias,
            serde_json::to_value(&r.import_style).unwrap().as_str().unwrap_or_default(),
            r.is_type_only,
            r.source_file_path,
            r.source_line,
            r.source_column,
            r.target_entity_id.as_ref().map(|id| id.as_str().to_string()),
            r.is_resolved,
            r.is_reexport,
            r.export_alias,
            r.source_file_hash,
            r.branch.as_str(),
            r.is_deleted,
            r.updated_at,
        ])?;
    }
    Ok(())
}

fn create_effects(conn: &Connection, rows: &[Effect]) -> Result<(), QueryError> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS effects; CREATE TABLE effects (
            effect_id TEXT, timestamp TEXT, source_entity_id TEXT, source_file_path TEXT,
            source_line INTEGER, source_column INTEGER, branch TEXT, properties TEXT, kind TEXT,
            kind_payload TEXT
        );",
    )?;
    let mut stmt = conn.prepare("INSERT INTO effects VALUES (?,?,?,?,?,?,?,?,?,?)")?;
    for e in rows {
        stmt.execute(params![
            e.effect_id,
            e.timestamp,
            e.source_entity_id.as_str(),
            e.source_file_path,
            e.source_line,
            e.source_column,
            e.branch.as_str(),
            e.properties.to_json_string(),
            e.kind.discriminator(),
            serde_json::to_string(&e.kind).unwrap_or_default(),
        ])?;
    }
    Ok(())
}
