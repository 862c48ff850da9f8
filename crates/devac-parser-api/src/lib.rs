//! The structural parser contract (spec §4.3, C3).
//!
//! This crate defines what a language-specific parser must emit for a
//! single source file; implementing parsers for any particular language is
//! explicitly out of scope here (spec §1 Non-goals). `devac-pipeline`
//! drives whatever `FileParser` a caller supplies.

use devac_model::{Edge, ExternalRef, Node};
use serde::{Deserialize, Serialize};

/// The emissions of parsing one source file.
///
/// Every edge's `source_entity_id` MUST appear in `nodes` (spec §4.3).
/// Targets that cannot be locally resolved MUST be written as
/// `unresolved:<displayName>`, with enough context on the edge's
/// `properties` for the semantic resolver (C4) to resolve them later.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParseOutput {
    /// Package-relative path of the parsed file.
    pub file_path: String,
    pub parse_time_ms: u64,
    pub source_file_hash: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub external_refs: Vec<ExternalRef>,
    pub warnings: Vec<String>,
}

impl ParseOutput {
    /// Checks the one structural invariant the contract owns outright:
    /// every edge's source must be a node this same parse emitted.
    pub fn check_referential_closure(&self) -> Result<(), String> {
        let known: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.entity_id.as_str()).collect();
        for edge in &self.edges {
            if !known.contains(edge.source_entity_id.as_str()) {
                return Err(format!(
                    "edge source {} in {} is not among this parse's nodes",
                    edge.source_entity_id, self.file_path
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parser for {path} failed: {message}")]
    Failed { path: String, message: String },
    #[error("parse of {path} exceeded its deadline")]
    Timeout { path: String },
}

/// Language-agnostic per-file parser (spec §4.3).
#[async_trait::async_trait]
pub trait FileParser: Send + Sync {
    /// File extensions (without the leading dot) this parser claims, used
    /// by the pipeline's file-enumeration step.
    fn extensions(&self) -> &[&str];

    /// Parses a single file, given its package-relative path and absolute
    /// on-disk path.
    async fn parse_file(
        &self,
        repo_id: &str,
        package_path: &str,
        relative_path: &str,
        absolute_path: &std::path::Path,
    ) -> Result<ParseOutput, ParseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_model::{Branch, Edge, EdgeType, EntityId, Node, NodeFlags, NodeKind, PropertyBag, Visibility};

    fn node(id: &str) -> Node {
        Node {
            entity_id: EntityId::parse(id).unwrap(),
            name: "x".into(),
            qualified_name: "x".into(),
            kind: NodeKind::Function,
            file_path: "a.ts".into(),
            start_line: 1,
            start_column: 0,
            end_line: 1,
            end_column: 1,
            visibility: Visibility::Public,
            flags: NodeFlags::default(),
            type_signature: None,
            documentation: None,
            decorators: vec![],
            type_parameters: vec![],
            properties: PropertyBag::empty(),
            source_file_hash: "h".into(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "now".into(),
        }
    }

    #[test]
    fn detects_orphan_edge_source() {
        let n = node("r:p:function:aaaa");
        let out = ParseOutput {
            file_path: "a.ts".into(),
            parse_time_ms: 1,
            source_file_hash: "h".into(),
            nodes: vec![n],
            edges: vec![Edge {
                source_entity_id: EntityId::parse("r:p:function:bbbb").unwrap(),
                target_entity_id: EntityId::unresolved("other"),
                edge_type: EdgeType::Calls,
                source_file_path: "a.ts".into(),
                source_line: 1,
                source_column: 0,
                properties: PropertyBag::empty(),
                source_file_hash: "h".into(),
                branch: Branch::Base,
                is_deleted: false,
                updated_at: "now".into(),
            }],
            external_refs: vec![],
            warnings: vec![],
        };
        assert!(out.check_referential_closure().is_err());
    }
}
