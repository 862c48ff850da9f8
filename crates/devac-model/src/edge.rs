use serde::{Deserialize, Serialize};

use crate::entity_id::EntityId;
use crate::properties::PropertyBag;
use crate::seed_row::{Branch, SeedRow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Contains,
    Calls,
    Imports,
    Extends,
    Implements,
    Returns,
    ParameterOf,
    TypeOf,
    Decorates,
    Overrides,
    References,
    Exports,
    ReExports,
    Instantiates,
    UsesType,
    Accesses,
    Throws,
    Awaits,
    Yields,
    Renders,
    PassesProps,
}

/// A directed relation between two nodes, per spec §3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub source_entity_id: EntityId,
    /// May be `unresolved:<name>` before semantic resolution.
    pub target_entity_id: EntityId,
    pub edge_type: EdgeType,
    pub source_file_path: String,
    pub source_line: u32,
    pub source_column: u32,
    pub properties: PropertyBag,
    pub source_file_hash: String,
    pub branch: Branch,
    pub is_deleted: bool,
    pub updated_at: String,
}

/// The primary key used for the base/delta merge of edges (spec §4.1:
/// "analogous for refs and effects" keyed by the tuple named there).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub source_entity_id: EntityId,
    pub target_entity_id: EntityId,
    pub edge_type: EdgeType,
    pub source_line: u32,
    pub source_column: u32,
}

impl std::hash::Hash for EdgeType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self as u8).hash(state);
    }
}

impl SeedRow for Edge {
    type Key = EdgeKey;

    fn primary_key(&self) -> EdgeKey {
        EdgeKey {
            source_entity_id: self.source_entity_id.clone(),
            target_entity_id: self.target_entity_id.clone(),
            edge_type: self.edge_type,
            source_line: self.source_line,
            source_column: self.source_column,
        }
    }
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
    fn branch(&self) -> &Branch {
        &self.branch
    }
    fn updated_at(&self) -> &str {
        &self.updated_at
    }
}
