//! Turns `unresolved:*` edge and ref targets into concrete entity ids once
//! a package's files have all been structurally parsed.

mod error;
mod index;
mod module_resolver;
mod resolve;

use std::collections::HashSet;
use std::time::Duration;

use devac_model::{Edge, ExternalRef, Node};

pub use error::{ResolutionError, ResolutionErrorCode};
pub use index::{
    build_export_index, build_local_symbol_index, ExportEntry, ExportIndex, LocalSymbolEntry,
    LocalSymbolIndex, ReexportOrigin,
};
pub use module_resolver::{ModuleResolver, RelativeModuleResolver};
pub use resolve::{resolve_calls, resolve_refs, ResolutionMethod, ResolutionOutcome};

const DEFAULT_PER_FILE_TIMEOUT: Duration = Duration::from_secs(5);

/// One package's worth of input to a resolution pass (spec §4.4 "Inputs").
pub struct ResolutionRequest<'a> {
    pub nodes: &'a [Node],
    pub refs: &'a mut [ExternalRef],
    pub edges: &'a mut [Edge],
    pub module_resolver: &'a dyn ModuleResolver,
    pub per_file_timeout: Duration,
}

impl<'a> ResolutionRequest<'a> {
    pub fn new(
        nodes: &'a [Node],
        refs: &'a mut [ExternalRef],
        edges: &'a mut [Edge],
        module_resolver: &'a dyn ModuleResolver,
    ) -> Self {
        Self { nodes, refs, edges, module_resolver, per_file_timeout: DEFAULT_PER_FILE_TIMEOUT }
    }
}

/// Summary of one resolution pass, reported back to the pipeline so it can
/// log and persist the outcome (spec §4.4 "Failure discipline": the
/// package still commits with whatever resolved and the rest preserved
/// as unresolved).
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub refs_resolved: usize,
    pub calls_resolved: usize,
    pub errors: Vec<ResolutionError>,
}

/// Runs the full four-step algorithm over one package: builds the export
/// and local symbol indexes, resolves refs, then resolves CALLS edges
/// against the same indexes. Mutates `request.refs`/`request.edges` in
/// place; never aborts on a per-file failure.
pub fn resolve_package(request: ResolutionRequest<'_>) -> ResolutionReport {
    let ResolutionRequest { nodes, refs, edges, module_resolver, per_file_timeout } = request;

    let known_files: HashSet<String> = nodes.iter().map(|n| n.file_path.clone()).collect();
    let exports = build_export_index(nodes, refs);
    let locals = build_local_symbol_index(nodes);

    let mut report = ResolutionReport::default();

    let ref_outcomes = resolve_refs(refs, &exports, module_resolver, per_file_timeout, &mut report.errors);
    report.refs_resolved = ref_outcomes.iter().filter(|o| o.is_some()).count();

    let imported_files_of = |file: &str| -> Vec<String> {
        refs.iter()
            .filter(|r| r.source_file_path == file && r.is_resolved)
            .filter_map(|r| module_resolver.resolve(file, &r.module_specifier))
            .filter(|f| known_files.contains(f))
            .collect()
    };
    let call_outcomes = resolve_calls(edges, &locals, &exports, imported_files_of, &mut report.errors);
    report.calls_resolved = call_outcomes.iter().filter(|o| o.is_some()).count();

    tracing::info!(
        refs_resolved = report.refs_resolved,
        calls_resolved = report.calls_resolved,
        errors = report.errors.len(),
        "package resolution pass complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_model::{Branch, EdgeType, EntityId, ImportStyle, NodeFlags, NodeKind, PropertyBag, Visibility};

    fn exporter_node() -> Node {
        Node {
            entity_id: EntityId::new("repo", "pkg", "function", "h-helper"),
            name: "helper".to_string(),
            qualified_name: "helper".to_string(),
            kind: NodeKind::Function,
            file_path: "src/utils.ts".to_string(),
            start_line: 1,
            start_column: 1,
            end_line: 2,
            end_column: 1,
            visibility: Visibility::Public,
            flags: NodeFlags { is_exported: true, ..Default::default() },
            type_signature: None,
            documentation: None,
            decorators: vec![],
            type_parameters: vec![],
            properties: PropertyBag::empty(),
            source_file_hash: "h".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "0".to_string(),
        }
    }

    #[test]
    fn resolve_package_resolves_both_a_ref_and_a_dependent_call() {
        let nodes = vec![exporter_node()];
        let files: HashSet<String> = HashSet::from(["src/utils.ts".to_string()]);
        let exts = [".ts"];
        let resolver = RelativeModuleResolver::new(&files, &exts);

        let mut refs = vec![ExternalRef {
            source_entity_id: EntityId::new("repo", "pkg", "function", "h-caller"),
            module_specifier: "./utils".to_string(),
            imported_symbol: "helper".to_string(),
            local_alias: None,
            import_style: ImportStyle::Named,
            is_type_only: false,
            source_file_path: "src/index.ts".to_string(),
            source_line: 1,
            source_column: 1,
            target_entity_id: None,
            is_resolved: false,
            is_reexport: false,
            export_alias: None,
            source_file_hash: "h".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "0".to_string(),
        }];

        let mut edges = vec![Edge {
            source_entity_id: EntityId::new("repo", "pkg", "function", "h-caller"),
            target_entity_id: EntityId::unresolved("helper"),
            edge_type: EdgeType::Calls,
            source_file_path: "src/index.ts".to_string(),
            source_line: 5,
            source_column: 3,
            properties: {
                let mut p = PropertyBag::empty();
                p.set("callee_name", "helper");
                p
            },
            source_file_hash: "h".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "0".to_string(),
        }];

        let report = resolve_package(ResolutionRequest::new(&nodes, &mut refs, &mut edges, &resolver));

        assert_eq!(report.refs_resolved, 1);
        assert_eq!(report.calls_resolved, 1);
        assert!(report.errors.is_empty());
        assert!(refs[0].is_resolved);
        assert!(!edges[0].target_entity_id.is_unresolved());
    }
}
