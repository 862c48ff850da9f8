use serde::{Deserialize, Serialize};

use crate::entity_id::EntityId;
use crate::properties::PropertyBag;
use crate::seed_row::{Branch, SeedRow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Class,
    Method,
    Property,
    Variable,
    Constant,
    Interface,
    Type,
    Enum,
    EnumMember,
    Namespace,
    Module,
    Parameter,
    Decorator,
    JsxComponent,
    HtmlElement,
    Hook,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    pub is_exported: bool,
    pub is_default_export: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_static: bool,
    pub is_abstract: bool,
}

/// A symbol occurrence, per spec §3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub entity_id: EntityId,
    pub name: String,
    pub qualified_name: String,
    pub kind: NodeKind,
    /// Package-relative file path.
    pub file_path: String,
    /// 1-based.
    pub start_line: u32,
    pub start_column: u32,
    /// 1-based; end_line >= start_line.
    pub end_line: u32,
    pub end_column: u32,
    pub visibility: Visibility,
    pub flags: NodeFlags,
    pub type_signature: Option<String>,
    pub documentation: Option<String>,
    pub decorators: Vec<String>,
    pub type_parameters: Vec<String>,
    pub properties: PropertyBag,
    pub source_file_hash: String,
    pub branch: Branch,
    pub is_deleted: bool,
    pub updated_at: String,
}

impl Node {
    pub fn validate_span(&self) -> Result<(), String> {
        if self.end_line < self.start_line {
            return Err(format!(
                "node {} has end_line {} < start_line {}",
                self.entity_id, self.end_line, self.start_line
            ));
        }
        Ok(())
    }
}

impl SeedRow for Node {
    type Key = EntityId;

    fn primary_key(&self) -> EntityId {
        self.entity_id.clone()
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
