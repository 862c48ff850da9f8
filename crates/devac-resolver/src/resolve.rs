use std::collections::HashSet;
use std::time::{Duration, Instant};

use devac_model::{Edge, EdgeType, EntityId, ExternalRef};

use crate::error::{ResolutionError, ResolutionErrorCode};
use crate::index::{ExportIndex, LocalSymbolIndex};
use crate::module_resolver::ModuleResolver;

/// How a resolved target was found, carried through to the caller so it
/// can be recorded alongside the edge/ref (spec §4.4 step 3-4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionMethod {
    Compiler,
    Index,
    Local,
}

impl ResolutionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionMethod::Compiler => "compiler",
            ResolutionMethod::Index => "index",
            ResolutionMethod::Local => "local",
        }
    }
}

/// Confidence and method for a single resolved target, kept alongside the
/// row rather than inside it since `Edge`/`ExternalRef` only carry the
/// resolved boolean and target id.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionOutcome {
    pub confidence: f64,
    pub method: ResolutionMethod,
}

/// Resolves every unresolved ref's `target_entity_id`, chasing re-export
/// chains with circular-dependency detection (spec §4.4 steps 1 and 3).
pub fn resolve_refs(
    refs: &mut [ExternalRef],
    exports: &ExportIndex,
    module_resolver: &dyn ModuleResolver,
    per_file_timeout: Duration,
    errors: &mut Vec<ResolutionError>,
) -> Vec<Option<ResolutionOutcome>> {
    let mut outcomes = Vec::with_capacity(refs.len());
    for r in refs.iter_mut() {
        if r.is_resolved {
            outcomes.push(None);
            continue;
        }
        let deadline = Instant::now() + per_file_timeout;
        match resolve_one_ref(r, exports, module_resolver, deadline, &mut HashSet::new()) {
            Ok(outcome) => {
                outcomes.push(Some(outcome));
            }
            Err(err) => {
                errors.push(err);
                outcomes.push(None);
            }
        }
    }
    outcomes
}

fn resolve_one_ref(
    r: &mut ExternalRef,
    exports: &ExportIndex,
    module_resolver: &dyn ModuleResolver,
    deadline: Instant,
    visiting: &mut HashSet<String>,
) -> Result<ResolutionOutcome, ResolutionError> {
    if Instant::now() > deadline {
        return Err(ResolutionError::new(
            ResolutionErrorCode::Timeout,
            r.source_file_path.clone(),
            format!("resolving `{}` exceeded the per-file timeout", r.imported_symbol),
        ));
    }

    let target_file = module_resolver.resolve(&r.source_file_path, &r.module_specifier).ok_or_else(|| {
        ResolutionError::new(
            ResolutionErrorCode::ModuleNotFound,
            r.source_file_path.clone(),
            format!("module `{}` could not be resolved to a file", r.module_specifier),
        )
    })?;

    if !visiting.insert(target_file.clone()) {
        return Err(ResolutionError::new(
            ResolutionErrorCode::CircularDependency,
            r.source_file_path.clone(),
            format!("re-export cycle detected while resolving `{}` via `{}`", r.imported_symbol, target_file),
        ));
    }

    let entry = if r.import_style == devac_model::ImportStyle::Default {
        exports.find_default(&target_file)
    } else {
        exports.find(&target_file, &r.imported_symbol)
    };

    let entry = entry.ok_or_else(|| {
        ResolutionError::new(
            ResolutionErrorCode::SymbolNotFound,
            r.source_file_path.clone(),
            format!("symbol `{}` is not exported by `{target_file}`", r.imported_symbol),
        )
    })?;

    if let Some(origin) = &entry.reexport_origin {
        let mut chained = ExternalRef {
            source_entity_id: r.source_entity_id.clone(),
            module_specifier: origin.module_specifier.clone(),
            imported_symbol: origin.imported_symbol.clone(),
            local_alias: None,
            import_style: r.import_style,
            is_type_only: r.is_type_only,
            source_file_path: target_file.clone(),
            source_line: r.source_line,
            source_column: r.source_column,
            target_entity_id: None,
            is_resolved: false,
            is_reexport: false,
            export_alias: None,
            source_file_hash: r.source_file_hash.clone(),
            branch: r.branch.clone(),
            is_deleted: false,
            updated_at: r.updated_at.clone(),
        };
        let outcome = resolve_one_ref(&mut chained, exports, module_resolver, deadline, visiting)?;
        r.target_entity_id = chained.target_entity_id;
        r.is_resolved = true;
        return Ok(ResolutionOutcome { confidence: outcome.confidence, method: ResolutionMethod::Index });
    }

    r.target_entity_id = Some(entry.entity_id.clone());
    r.is_resolved = true;
    Ok(ResolutionOutcome { confidence: 1.0, method: ResolutionMethod::Compiler })
}

/// Resolves every unresolved CALLS edge's `target_entity_id` against the
/// local symbol index first, then the exported symbols of files the
/// source file imports (spec §4.4 step 4).
pub fn resolve_calls(
    edges: &mut [Edge],
    locals: &LocalSymbolIndex,
    exports: &ExportIndex,
    imported_files_of: impl Fn(&str) -> Vec<String>,
    errors: &mut Vec<ResolutionError>,
) -> Vec<Option<ResolutionOutcome>> {
    let mut outcomes = Vec::with_capacity(edges.len());
    for e in edges.iter_mut() {
        if e.edge_type != EdgeType::Calls || !e.target_entity_id.is_unresolved() {
            outcomes.push(None);
            continue;
        }
        let callee_name = match e.properties.get::<String>("callee_name") {
            Some(name) => name,
            None => {
                errors.push(ResolutionError::new(
                    ResolutionErrorCode::InternalError,
                    e.source_file_path.clone(),
                    "CALLS edge is missing a callee_name property".to_string(),
                ));
                outcomes.push(None);
                continue;
            }
        };

        if let Some(local) = locals.in_file(&e.source_file_path, &callee_name) {
            e.target_entity_id = local.entity_id.clone();
            outcomes.push(Some(ResolutionOutcome { confidence: 1.0, method: ResolutionMethod::Local }));
            continue;
        }

        let candidates: Vec<EntityId> = imported_files_of(&e.source_file_path)
            .iter()
            .filter_map(|f| exports.find(f, &callee_name))
            .map(|entry| entry.entity_id.clone())
            .collect();

        match candidates.as_slice() {
            [single] => {
                e.target_entity_id = single.clone();
                outcomes.push(Some(ResolutionOutcome { confidence: 1.0, method: ResolutionMethod::Index }));
            }
            [] => {
                errors.push(ResolutionError::new(
                    ResolutionErrorCode::SymbolNotFound,
                    e.source_file_path.clone(),
                    format!("call to `{callee_name}` did not match any local or imported symbol"),
                ));
                outcomes.push(None);
            }
            _ => {
                errors.push(ResolutionError::new(
                    ResolutionErrorCode::SymbolNotFound,
                    e.source_file_path.clone(),
                    format!("call to `{callee_name}` matched {} candidates ambiguously", candidates.len()),
                ));
                outcomes.push(None);
            }
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{build_export_index, build_local_symbol_index};
    use crate::module_resolver::RelativeModuleResolver;
    use devac_model::{Branch, Node, NodeFlags, NodeKind, Visibility};
    use std::collections::HashSet as Set;

    fn node(file: &str, name: &str, exported: bool) -> Node {
        Node {
            entity_id: EntityId::new("repo", "pkg", "function", &format!("h-{name}")),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: NodeKind::Function,
            file_path: file.to_string(),
            start_line: 1,
            start_column: 1,
            end_line: 2,
            end_column: 1,
            visibility: Visibility::Public,
            flags: NodeFlags { is_exported: exported, ..Default::default() },
            type_signature: None,
            documentation: None,
            decorators: vec![],
            type_parameters: vec![],
            properties: devac_model::PropertyBag::empty(),
            source_file_hash: "h".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "0".to_string(),
        }
    }

    #[test]
    fn resolves_a_named_import_to_its_export() {
        let exporter = node("src/utils.ts", "helper", true);
        let exports = build_export_index(&[exporter.clone()], &[]);
        let files: Set<String> = Set::from(["src/utils.ts".to_string()]);
        let exts = [".ts"];
        let resolver = RelativeModuleResolver::new(&files, &exts);

        let mut refs = vec![ExternalRef {
            source_entity_id: EntityId::new("repo", "pkg", "function", "h-caller"),
            module_specifier: "./utils".to_string(),
            imported_symbol: "helper".to_string(),
            local_alias: None,
            import_style: devac_model::ImportStyle::Named,
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
        let mut errors = Vec::new();
        let outcomes = resolve_refs(&mut refs, &exports, &resolver, Duration::from_secs(1), &mut errors);

        assert!(errors.is_empty());
        assert!(refs[0].is_resolved);
        assert_eq!(refs[0].target_entity_id, Some(exporter.entity_id));
        assert!(matches!(outcomes[0], Some(o) if o.method == ResolutionMethod::Compiler));
    }

    #[test]
    fn missing_module_is_recorded_as_module_not_found() {
        let exports = build_export_index(&[], &[]);
        let files: Set<String> = Set::new();
        let exts = [".ts"];
        let resolver = RelativeModuleResolver::new(&files, &exts);
        let mut refs = vec![ExternalRef {
            source_entity_id: EntityId::new("repo", "pkg", "function", "h-caller"),
            module_specifier: "./missing".to_string(),
            imported_symbol: "helper".to_string(),
            local_alias: None,
            import_style: devac_model::ImportStyle::Named,
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
        let mut errors = Vec::new();
        resolve_refs(&mut refs, &exports, &resolver, Duration::from_secs(1), &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ResolutionErrorCode::ModuleNotFound);
        assert!(!refs[0].is_resolved);
    }

    #[test]
    fn resolves_a_call_against_the_local_symbol_index() {
        let callee = node("src/index.ts", "helper", false);
        let locals = build_local_symbol_index(&[callee.clone()]);
        let exports = build_export_index(&[], &[]);

        let mut edges = vec![Edge {
            source_entity_id: EntityId::new("repo", "pkg", "function", "h-caller"),
            target_entity_id: EntityId::unresolved("helper"),
            edge_type: EdgeType::Calls,
            source_file_path: "src/index.ts".to_string(),
            source_line: 5,
            source_column: 3,
            properties: {
                let mut p = devac_model::PropertyBag::empty();
                p.set("callee_name", "helper");
                p
            },
            source_file_hash: "h".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "0".to_string(),
        }];
        let mut errors = Vec::new();
        let outcomes = resolve_calls(&mut edges, &locals, &exports, |_| vec![], &mut errors);

        assert!(errors.is_empty());
        assert_eq!(edges[0].target_entity_id, callee.entity_id);
        assert!(matches!(outcomes[0], Some(o) if o.method == ResolutionMethod::Local));
    }

    #[test]
    fn ambiguous_call_candidates_stay_unresolved() {
        let a = node("src/a.ts", "helper", true);
        let b = node("src/b.ts", "helper", true);
        let exports = build_export_index(&[a, b], &[]);
        let locals = build_local_symbol_index(&[]);

        let mut edges = vec![Edge {
            source_entity_id: EntityId::new("repo", "pkg", "function", "h-caller"),
            target_entity_id: EntityId::unresolved("helper"),
            edge_type: EdgeType::Calls,
            source_file_path: "src/index.ts".to_string(),
            source_line: 5,
            source_column: 3,
            properties: {
                let mut p = devac_model::PropertyBag::empty();
                p.set("callee_name", "helper");
                p
            },
            source_file_hash: "h".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "0".to_string(),
        }];
        let mut errors = Vec::new();
        resolve_calls(
            &mut edges,
            &locals,
            &exports,
            |_| vec!["src/a.ts".to_string(), "src/b.ts".to_string()],
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert!(edges[0].target_entity_id.is_unresolved());
    }
}
