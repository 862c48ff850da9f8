//! The columnar seed store: atomic, lockfile-guarded read/write access to
//! a package's `{nodes, edges, external_refs, effects}` parquet tables,
//! partitioned into a `base` snapshot plus optional named branch deltas.

mod columnar;
mod error;
mod lock;
mod meta;
mod table_io;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use devac_model::{merge_live_view, Branch, Edge, Effect, ExternalRef, Node, SeedStats, SCHEMA_VERSION};

pub use error::StoreError;
pub use lock::PackageLock;

/// The conventional directory name for a package's seed set, rooted at
/// the package directory (spec §6 on-disk layout).
pub const DEFAULT_SEED_DIR: &str = ".devac-seed";

/// A single write batch: the four tables for one (package, branch)
/// partition, always replaced together.
#[derive(Clone, Debug, Default)]
pub struct SeedBatch {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub external_refs: Vec<ExternalRef>,
    pub effects: Vec<Effect>,
}

/// The merged live view of one table, independent of which partition each
/// row physically came from.
#[derive(Clone, Debug, Default)]
pub struct SeedView {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub external_refs: Vec<ExternalRef>,
    pub effects: Vec<Effect>,
}

#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: SeedStats,
}

/// Handle onto one package's seed set, rooted at `<package>/<seed_dir>`.
pub struct SeedStore {
    seed_root: PathBuf,
}

impl SeedStore {
    pub fn open(package_root: &Path) -> Self {
        Self::open_with_dir(package_root, DEFAULT_SEED_DIR)
    }

    pub fn open_with_dir(package_root: &Path, seed_dir: &str) -> Self {
        Self { seed_root: package_root.join(seed_dir) }
    }

    pub fn seed_root(&self) -> &Path {
        &self.seed_root
    }

    fn partition_dir(&self, branch: &Branch) -> PathBuf {
        self.seed_root.join(branch.path_segment())
    }

    /// Writes all four tables of `batch` to `branch`'s partition under an
    /// exclusive per-package lock. Each table is written to a temp file in
    /// the same directory and renamed onto the target path; rename is the
    /// single linearization point (spec §4.1).
    pub fn write(&self, branch: &Branch, batch: &SeedBatch) -> Result<(), StoreError> {
        let _lock = PackageLock::acquire(&self.seed_root)?;
        let partition = self.partition_dir(branch);
        std::fs::create_dir_all(&partition).map_err(|e| StoreError::io(&partition, e))?;

        write_table_atomic(&partition.join("nodes.parquet"), |tmp| {
            table_io::write_nodes(tmp, &batch.nodes)
        })?;
        write_table_atomic(&partition.join("edges.parquet"), |tmp| {
            table_io::write_edges(tmp, &batch.edges)
        })?;
        write_table_atomic(&partition.join("external_refs.parquet"), |tmp| {
            table_io::write_external_refs(tmp, &batch.external_refs)
        })?;
        write_table_atomic(&partition.join("effects.parquet"), |tmp| {
            table_io::write_effects(tmp, &batch.effects)
        })?;

        meta::write_meta(&self.seed_root)?;
        self.recompute_and_write_stats()?;
        tracing::info!(
            partition = %partition.display(),
            nodes = batch.nodes.len(),
            edges = batch.edges.len(),
            "wrote seed batch"
        );
        Ok(())
    }

    /// Reads the merged live view (`base ⊎ delta(branch)`, tombstones
    /// dropped) for every table. Reading never takes the lock — a live
    /// writer's in-flight temp files are invisible until the rename that
    /// makes them the current `*.parquet` file (spec §5).
    pub fn read(&self, branch: &Branch) -> Result<SeedView, StoreError> {
        let base = self.read_partition(&Branch::Base)?;
        if matches!(branch, Branch::Base) {
            return Ok(base);
        }
        let delta = self.read_partition(branch)?;
        Ok(SeedView {
            nodes: merge_live_view(&base.nodes, &delta.nodes),
            edges: merge_live_view(&base.edges, &delta.edges),
            external_refs: merge_live_view(&base.external_refs, &delta.external_refs),
            effects: merge_live_view(&base.effects, &delta.effects),
        })
    }

    fn read_partition(&self, branch: &Branch) -> Result<SeedView, StoreError> {
        let partition = self.partition_dir(branch);
        Ok(SeedView {
            nodes: table_io::read_nodes(&partition.join("nodes.parquet"))?,
            edges: table_io::read_edges(&partition.join("edges.parquet"))?,
            external_refs: table_io::read_external_refs(&partition.join("external_refs.parquet"))?,
            effects: table_io::read_effects(&partition.join("effects.parquet"))?,
        })
    }

    /// Maps `source_file_path -> source_file_hash` across the base
    /// partition's nodes, for the pipeline's changed/unchanged/deleted
    /// partitioning (spec §4.1, §4.5).
    pub fn get_file_hashes(&self) -> Result<HashMap<String, String>, StoreError> {
        let view = self.read_partition(&Branch::Base)?;
        Ok(view.nodes.into_iter().map(|n| (n.file_path, n.source_file_hash)).collect())
    }

    /// The recorded `stats.json` counts, if the package has ever been
    /// analyzed (spec §4.6: the manifest generator reads these rather
    /// than recomputing them).
    pub fn read_stats(&self) -> Result<Option<SeedStats>, StoreError> {
        meta::read_stats(&self.seed_root)
    }

    /// Checks table readability, `meta.json` presence/version, referential
    /// consistency of edges against nodes, and recomputes `stats.json`
    /// counts as a warning-only cross-check (spec §4.1 + supplement).
    pub fn validate(&self) -> Result<ValidationReport, StoreError> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match meta::read_meta(&self.seed_root) {
            Ok(Some(meta)) if meta.schema_version != SCHEMA_VERSION => {
                errors.push(format!(
                    "schema version mismatch: seed has {}, engine supports {SCHEMA_VERSION}",
                    meta.schema_version
                ));
            }
            Ok(Some(_)) => {}
            Ok(None) => warnings.push("meta.json is missing".to_string()),
            Err(e) => errors.push(format!("meta.json is unreadable: {e}")),
        }

        let base_dir = self.partition_dir(&Branch::Base);
        for table in ["nodes", "edges", "external_refs", "effects"] {
            let path = base_dir.join(format!("{table}.parquet"));
            if !path.exists() {
                warnings.push(format!("{table}.parquet is missing"));
            }
        }

        let view = match self.read(&Branch::Base) {
            Ok(view) => view,
            Err(e) => {
                errors.push(format!("failed to read base partition: {e}"));
                return Ok(ValidationReport { valid: false, errors, warnings, stats: SeedStats::default() });
            }
        };

        let known_ids: std::collections::HashSet<&str> =
            view.nodes.iter().map(|n| n.entity_id.as_str()).collect();
        let mut orphan_sources = 0usize;
        let mut unresolved_targets = 0usize;
        for edge in &view.edges {
            if !known_ids.contains(edge.source_entity_id.as_str()) {
                orphan_sources += 1;
            }
            if edge.target_entity_id.is_unresolved() {
                unresolved_targets += 1;
            }
        }
        if orphan_sources > 0 {
            errors.push(format!("{orphan_sources} edge(s) have a source_entity_id with no matching node"));
        }
        if unresolved_targets > 0 {
            warnings.push(format!("{unresolved_targets} edge(s) have an unresolved target"));
        }

        let computed = SeedStats {
            node_count: view.nodes.len() as u64,
            edge_count: view.edges.len() as u64,
            ref_count: view.external_refs.len() as u64,
            file_count: distinct_file_count(&view.nodes),
        };
        if let Ok(Some(recorded)) = meta::read_stats(&self.seed_root) {
            if recorded.node_count != computed.node_count
                || recorded.edge_count != computed.edge_count
                || recorded.ref_count != computed.ref_count
            {
                warnings.push("stats.json counts do not match the tables on disk".to_string());
            }
        }

        if !errors.is_empty() {
            tracing::warn!(?errors, seed_root = %self.seed_root.display(), "seed validation failed");
        }
        Ok(ValidationReport { valid: errors.is_empty(), errors, warnings, stats: computed })
    }

    fn recompute_and_write_stats(&self) -> Result<(), StoreError> {
        let view = self.read(&Branch::Base)?;
        let stats = SeedStats {
            node_count: view.nodes.len() as u64,
            edge_count: view.edges.len() as u64,
            ref_count: view.external_refs.len() as u64,
            file_count: distinct_file_count(&view.nodes),
        };
        meta::write_stats(&self.seed_root, &stats)
    }
}

fn distinct_file_count(nodes: &[Node]) -> u64 {
    nodes.iter().map(|n| n.file_path.as_str()).collect::<std::collections::HashSet<_>>().len() as u64
}

fn write_table_atomic(
    target: &Path,
    writer: impl FnOnce(&Path) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let parent = target.parent().expect("table path has a parent");
    let tmp = parent.join(format!(
        "{}.tmp.{}.{}",
        target.file_name().unwrap().to_string_lossy(),
        std::process::id(),
        now_nanos(),
    ));
    writer(&tmp)?;
    std::fs::rename(&tmp, target).map_err(|e| StoreError::io(target, e))?;
    Ok(())
}

fn now_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devac_model::{EntityId, NodeFlags, NodeKind, PropertyBag, Visibility};

    fn sample_node(name: &str, branch: Branch, deleted: bool) -> Node {
        Node {
            entity_id: EntityId::new("acme/widgets", ".", "function", name),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: NodeKind::Function,
            file_path: format!("src/{name}.ts"),
            start_line: 1,
            start_column: 0,
            end_line: 2,
            end_column: 0,
            visibility: Visibility::Public,
            flags: NodeFlags::default(),
            type_signature: None,
            documentation: None,
            decorators: Vec::new(),
            type_parameters: Vec::new(),
            properties: PropertyBag::empty(),
            source_file_hash: "deadbeef".to_string(),
            branch,
            is_deleted: deleted,
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn write_then_read_round_trips_base_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedStore::open(dir.path());
        let batch = SeedBatch {
            nodes: vec![sample_node("a", Branch::Base, false), sample_node("b", Branch::Base, false)],
            ..Default::default()
        };
        store.write(&Branch::Base, &batch).unwrap();

        let view = store.read(&Branch::Base).unwrap();
        assert_eq!(view.nodes.len(), 2);
    }

    #[test]
    fn branch_delta_overrides_and_tombstones_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedStore::open(dir.path());
        store
            .write(
                &Branch::Base,
                &SeedBatch {
                    nodes: vec![sample_node("a", Branch::Base, false), sample_node("b", Branch::Base, false)],
                    ..Default::default()
                },
            )
            .unwrap();

        let feature = Branch::named("feature-x");
        store
            .write(
                &feature,
                &SeedBatch {
                    nodes: vec![sample_node("a", feature.clone(), true), sample_node("c", feature.clone(), false)],
                    ..Default::default()
                },
            )
            .unwrap();

        let live = store.read(&feature).unwrap();
        let mut names: Vec<&str> = live.nodes.iter().map(|n| n.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn validate_flags_orphan_edge_sources() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedStore::open(dir.path());
        let dangling = Edge {
            source_entity_id: EntityId::new("acme/widgets", ".", "function", "ghost"),
            target_entity_id: EntityId::unresolved("whatever"),
            edge_type: devac_model::EdgeType::Calls,
            source_file_path: "src/ghost.ts".to_string(),
            source_line: 1,
            source_column: 0,
            properties: PropertyBag::empty(),
            source_file_hash: "deadbeef".to_string(),
            branch: Branch::Base,
            is_deleted: false,
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        store.write(&Branch::Base, &SeedBatch { edges: vec![dangling], ..Default::default() }).unwrap();

        let report = store.validate().unwrap();
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("no matching node")));
    }

    #[test]
    fn get_file_hashes_reflects_base_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeedStore::open(dir.path());
        store
            .write(
                &Branch::Base,
                &SeedBatch { nodes: vec![sample_node("a", Branch::Base, false)], ..Default::default() },
            )
            .unwrap();

        let hashes = store.get_file_hashes().unwrap();
        assert_eq!(hashes.get("src/a.ts").map(String::as_str), Some("deadbeef"));
    }
}
