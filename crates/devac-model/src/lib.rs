//! Shared graph data model for devac: entity identifiers, the four seed
//! row kinds (nodes, edges, external refs, effects), their base/delta
//! merge discipline, and the repository manifest shape.

mod edge;
mod effect;
mod entity_id;
mod external_ref;
mod meta;
mod node;
mod properties;
mod seed_row;

pub use edge::{Edge, EdgeKey, EdgeType};
pub use effect::{Effect, EffectKind};
pub use entity_id::{shape_hash, EntityId, EntityIdError};
pub use external_ref::{ExternalRef, ExternalRefKey, ImportStyle};
pub use meta::{
    ExternalDependency, Manifest, PackageInfo, SeedMeta, SeedStats, MANIFEST_SCHEMA_VERSION,
    SCHEMA_VERSION,
};
pub use node::{Node, NodeFlags, NodeKind, Visibility};
pub use properties::PropertyBag;
pub use seed_row::{merge_live_view, Branch, SeedRow};
