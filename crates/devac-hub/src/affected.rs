//! The affected-set analyzer (spec §4.7 "Affected set"): BFS over
//! `cross_repo_edges` in the reverse (`target -> source`) direction, since
//! a row's `source` is the importing entity and its `target` is what it
//! depends on — an entity is affected when something it depends on
//! changed.

use std::collections::{HashSet, VecDeque};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::HubError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Direct,
    Transitive,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AffectedEntity {
    pub repo_id: String,
    pub entity_id: String,
    pub impact_level: ImpactLevel,
    pub depth: u32,
}

#[derive(Clone, Debug)]
pub struct AffectedSetRequest {
    pub changed_entity_ids: Vec<String>,
    pub max_depth: u32,
    pub include_repos: Option<Vec<String>>,
    pub exclude_repos: Option<Vec<String>>,
}

impl Default for AffectedSetRequest {
    fn default() -> Self {
        Self { changed_entity_ids: Vec::new(), max_depth: 10, include_repos: None, exclude_repos: None }
    }
}

pub fn analyze(conn: &Connection, request: &AffectedSetRequest) -> Result<Vec<AffectedEntity>, HubError> {
    let mut visited: HashSet<String> = request.changed_entity_ids.iter().cloned().collect();
    let mut frontier: VecDeque<String> = request.changed_entity_ids.iter().cloned().collect();
    let mut out = Vec::new();

    let mut depth = 0u32;
    while !frontier.is_empty() && depth < request.max_depth {
        depth += 1;
        let current: Vec<String> = frontier.drain(..).collect();
        let dependents = dependents_of(conn, &current)?;

        let level = if depth == 1 { ImpactLevel::Direct } else { ImpactLevel::Transitive };
        for (repo_id, entity_id) in dependents {
            if visited.contains(&entity_id) {
                continue;
            }
            visited.insert(entity_id.clone());
            if !repo_allowed(&repo_id, request) {
                continue;
            }
            frontier.push_back(entity_id.clone());
            out.push(AffectedEntity { repo_id, entity_id, impact_level: level, depth });
        }
    }
    Ok(out)
}

fn repo_allowed(repo_id: &str, request: &AffectedSetRequest) -> bool {
    if let Some(include) = &request.include_repos {
        if !include.iter().any(|r| r == repo_id) {
            return false;
        }
    }
    if let Some(exclude) = &request.exclude_repos {
        if exclude.iter().any(|r| r == repo_id) {
            return false;
        }
    }
    true
}

fn dependents_of(conn: &Connection, targets: &[String]) -> Result<Vec<(String, String)>, HubError> {
    if targets.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; targets.len()].join(",");
    let sql = format!(
        "SELECT DISTINCT source_repo, source_entity_id FROM cross_repo_edges
         WHERE target_entity_id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let binds: Vec<&dyn rusqlite::ToSql> = targets.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
    let rows = stmt.query_map(binds.as_slice(), |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(HubError::from)
}
