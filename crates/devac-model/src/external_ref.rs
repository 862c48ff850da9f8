use serde::{Deserialize, Serialize};

use crate::entity_id::EntityId;
use crate::seed_row::{Branch, SeedRow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStyle {
    Named,
    Default,
    Namespace,
    SideEffect,
    Dynamic,
    Require,
}

/// A cross-package import, per spec §3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalRef {
    pub source_entity_id: EntityId,
    pub module_specifier: String,
    pub imported_symbol: String,
    pub local_alias: Option<String>,
    pub import_style: ImportStyle,
    pub is_type_only: bool,
    pub source_file_path: String,
    pub source_line: u32,
    pub source_column: u32,
    /// Populated on resolution.
    pub target_entity_id: Option<EntityId>,
    pub is_resolved: bool,
    pub is_reexport: bool,
    pub export_alias: Option<String>,
    pub source_file_hash: String,
    pub branch: Branch,
    pub is_deleted: bool,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExternalRefKey {
    pub source_entity_id: EntityId,
    pub module_specifier: String,
    pub imported_symbol: String,
    pub source_line: u32,
    pub source_column: u32,
}

impl SeedRow for ExternalRef {
    type Key = ExternalRefKey;

    fn primary_key(&self) -> ExternalRefKey {
        ExternalRefKey {
            source_entity_id: self.source_entity_id.clone(),
            module_specifier: self.module_specifier.clone(),
            imported_symbol: self.imported_symbol.clone(),
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
