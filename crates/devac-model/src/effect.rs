use serde::{Deserialize, Serialize};

use crate::entity_id::EntityId;
use crate::properties::PropertyBag;
use crate::seed_row::{Branch, SeedRow};

/// Variant-specific payload for an [`Effect`]. Modeled as an explicit sum
/// type with a discriminator, per Design Notes ("do not try to share a
/// single flat record"); the columnar writer maps this to one nullable
/// column group per variant plus the discriminator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    FunctionCall {
        callee_name: String,
        is_external: bool,
    },
    Store {
        store_type: String,
        operation: String,
        target_resource: Option<String>,
    },
    Retrieve {
        store_type: String,
        operation: String,
        target_resource: Option<String>,
    },
    Send {
        channel: Option<String>,
        target_resource: Option<String>,
    },
    Request {
        method: Option<String>,
        target_resource: Option<String>,
    },
    Response {
        status_code: Option<u32>,
    },
    Condition {
        expression: Option<String>,
    },
    Loop {
        iterable_expression: Option<String>,
    },
    Group {
        member_count: u32,
    },
}

impl EffectKind {
    pub fn discriminator(&self) -> &'static str {
        match self {
            EffectKind::FunctionCall { .. } => "function_call",
            EffectKind::Store { .. } => "store",
            EffectKind::Retrieve { .. } => "retrieve",
            EffectKind::Send { .. } => "send",
            EffectKind::Request { .. } => "request",
            EffectKind::Response { .. } => "response",
            EffectKind::Condition { .. } => "condition",
            EffectKind::Loop { .. } => "loop",
            EffectKind::Group { .. } => "group",
        }
    }
}

/// An observable behavior occurrence, per spec §3.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Effect {
    pub effect_id: String,
    /// ISO-8601.
    pub timestamp: String,
    pub source_entity_id: EntityId,
    pub source_file_path: String,
    pub source_line: u32,
    pub source_column: u32,
    pub branch: Branch,
    pub properties: PropertyBag,
    pub kind: EffectKind,
}

impl SeedRow for Effect {
    type Key = String;

    fn primary_key(&self) -> String {
        self.effect_id.clone()
    }
    fn is_deleted(&self) -> bool {
        false
    }
    fn branch(&self) -> &Branch {
        &self.branch
    }
    fn updated_at(&self) -> &str {
        &self.timestamp
    }
}
