use std::collections::HashMap;

use devac_model::{EntityId, ExternalRef, Node, NodeKind};

/// Where a re-exported symbol actually comes from, so `resolve_refs` can
/// chase the chain instead of returning a synthetic target (spec §4.4
/// step 1: "optional re-export origin").
#[derive(Clone, Debug)]
pub struct ReexportOrigin {
    pub module_specifier: String,
    pub imported_symbol: String,
}

#[derive(Clone, Debug)]
pub struct ExportEntry {
    pub name: String,
    pub kind: NodeKind,
    pub entity_id: EntityId,
    pub is_default: bool,
    pub is_type_only: bool,
    pub reexport_origin: Option<ReexportOrigin>,
}

/// `file -> exports[]` plus the exported-symbol lookup the resolver
/// walks for both ref and CALLS resolution (spec §4.4 step 1).
#[derive(Clone, Debug, Default)]
pub struct ExportIndex {
    exports_by_file: HashMap<String, Vec<ExportEntry>>,
}

impl ExportIndex {
    pub fn exports_of(&self, file: &str) -> &[ExportEntry] {
        self.exports_by_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find<'a>(&'a self, file: &str, symbol: &str) -> Option<&'a ExportEntry> {
        self.exports_of(file).iter().find(|e| e.name == symbol)
    }

    pub fn find_default<'a>(&'a self, file: &str) -> Option<&'a ExportEntry> {
        self.exports_of(file).iter().find(|e| e.is_default)
    }
}

/// Builds the export index from a package's nodes (direct exports) and
/// external refs (re-exports, identified by `is_reexport`).
pub fn build_export_index(nodes: &[Node], refs: &[ExternalRef]) -> ExportIndex {
    let mut exports_by_file: HashMap<String, Vec<ExportEntry>> = HashMap::new();

    for node in nodes {
        if !node.flags.is_exported {
            continue;
        }
        exports_by_file.entry(node.file_path.clone()).or_default().push(ExportEntry {
            name: node.name.clone(),
            kind: node.kind,
            entity_id: node.entity_id.clone(),
            is_default: node.flags.is_default_export,
            is_type_only: false,
            reexport_origin: None,
        });
    }

    for r in refs {
        if !r.is_reexport {
            continue;
        }
        let name = r.export_alias.clone().unwrap_or_else(|| r.imported_symbol.clone());
        exports_by_file.entry(r.source_file_path.clone()).or_default().push(ExportEntry {
            name,
            kind: NodeKind::Unknown,
            // Placeholder until the re-export chain is chased; resolve_refs
            // overwrites this with the chain's concrete entity id.
            entity_id: EntityId::unresolved(&r.imported_symbol),
            is_default: false,
            is_type_only: r.is_type_only,
            reexport_origin: Some(ReexportOrigin {
                module_specifier: r.module_specifier.clone(),
                imported_symbol: r.imported_symbol.clone(),
            }),
        });
    }

    ExportIndex { exports_by_file }
}

#[derive(Clone, Debug)]
pub struct LocalSymbolEntry {
    pub name: String,
    pub kind: NodeKind,
    pub entity_id: EntityId,
}

/// `file -> callable symbols[]`, used by CALLS resolution's first pass
/// (spec §4.4 step 2, step 4 "check local symbol index first").
#[derive(Clone, Debug, Default)]
pub struct LocalSymbolIndex {
    symbols_by_file: HashMap<String, Vec<LocalSymbolEntry>>,
}

impl LocalSymbolIndex {
    pub fn in_file<'a>(&'a self, file: &str, name: &str) -> Option<&'a LocalSymbolEntry> {
        self.symbols_by_file.get(file)?.iter().find(|s| s.name == name)
    }
}

pub fn build_local_symbol_index(nodes: &[Node]) -> LocalSymbolIndex {
    let mut symbols_by_file: HashMap<String, Vec<LocalSymbolEntry>> = HashMap::new();
    for node in nodes {
        if !matches!(node.kind, NodeKind::Function | NodeKind::Method | NodeKind::Hook) {
            continue;
        }
        symbols_by_file.entry(node.file_path.clone()).or_default().push(LocalSymbolEntry {
            name: node.name.clone(),
            kind: node.kind,
            entity_id: node.entity_id.clone(),
        });
    }
    LocalSymbolIndex { symbols_by_file }
}
