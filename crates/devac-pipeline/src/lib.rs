//! Drives one package through structural parsing and semantic resolution,
//! then commits the result to the columnar seed store (spec §4.5, C5).

mod enumerate;
mod error;
mod hash;
mod ignore;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use devac_model::{Branch, Edge, ExternalRef, Node, SeedRow};
use devac_parser_api::FileParser;
use devac_resolver::{resolve_package, RelativeModuleResolver, ResolutionError, ResolutionRequest};
use devac_store::{SeedBatch, SeedStore};

pub use enumerate::CandidateFile;
pub use error::PipelineError;
pub use ignore::IgnoreRules;

/// Request to analyze one package (spec §4.5 contract).
pub struct AnalyzeRequest<'a> {
    pub repo_id: String,
    pub package_root: PathBuf,
    pub branch: Branch,
    pub force: bool,
    pub if_changed: bool,
    pub parser: &'a dyn FileParser,
    pub extra_excludes: Vec<String>,
    pub include: Vec<String>,
}

#[derive(Debug, Default)]
pub struct AnalyzeReport {
    pub files_analyzed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub skipped: bool,
    pub warnings: Vec<String>,
    pub resolution_errors: Vec<ResolutionError>,
    pub time_ms: u64,
}

/// Runs the full eight-step pipeline for one package, writing the result
/// through `devac-store` on success. Catastrophic I/O or store errors
/// abort before any write lands; per-file parser errors and resolution
/// misses are recorded as warnings/errors on the report instead.
pub async fn analyze(request: AnalyzeRequest<'_>) -> Result<AnalyzeReport, PipelineError> {
    let started = Instant::now();
    let store = SeedStore::open(&request.package_root);

    // Step 1: enumerate candidate files under the language plugin's
    // extension set and ignore rules.
    let ignore = IgnoreRules::new(&request.extra_excludes, &request.include)
        .map_err(|e| PipelineError::Walk { path: request.package_root.display().to_string(), source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e) })?;
    let extensions = request.parser.extensions();
    let candidates = enumerate::enumerate_files(&request.package_root, extensions, ignore).await?;
    let candidates_by_path: HashMap<&str, &CandidateFile> =
        candidates.iter().map(|c| (c.relative_path.as_str(), c)).collect();

    // Step 2: compute current file hashes; load the prior partition.
    // `prior` is this branch's merged live view (base overlaid with any
    // existing delta), used for change detection; `base_only` is the raw
    // base partition alone, needed below to compute a minimal tombstone
    // set when writing to a named branch.
    let prior = store.read(&request.branch).unwrap_or_default();
    let base_only = if matches!(request.branch, Branch::Base) {
        prior.clone()
    } else {
        store.read(&Branch::Base).unwrap_or_default()
    };
    let prior_hashes: HashMap<String, String> =
        prior.nodes.iter().map(|n| (n.file_path.clone(), n.source_file_hash.clone())).collect();

    let mut current_hashes = HashMap::with_capacity(candidates.len());
    for candidate in &candidates {
        let digest = hash::hash_file(&candidate.absolute_path).await?;
        current_hashes.insert(candidate.relative_path.clone(), digest);
    }

    // Step 3: if `if_changed` and nothing differs, skip without writing.
    if request.if_changed && !request.force && !any_changed(&prior_hashes, &current_hashes, &candidates_by_path) {
        return Ok(AnalyzeReport { skipped: true, time_ms: elapsed_ms(started), ..Default::default() });
    }

    // Step 4: partition into {unchanged, changed, deleted}.
    let mut changed: Vec<&CandidateFile> = Vec::new();
    for candidate in &candidates {
        let current = &current_hashes[&candidate.relative_path];
        match prior_hashes.get(&candidate.relative_path) {
            Some(prior_hash) if prior_hash == current && !request.force => {}
            _ => changed.push(candidate),
        }
    }
    let deleted_paths: Vec<String> =
        prior_hashes.keys().filter(|p| !candidates_by_path.contains_key(p.as_str())).cloned().collect();

    let package_root_str = request.package_root.to_string_lossy();
    let parse_futures = changed.iter().map(|candidate| {
        request.parser.parse_file(&request.repo_id, &package_root_str, &candidate.relative_path, &candidate.absolute_path)
    });
    let parsed = futures::future::join_all(parse_futures).await;

    let mut warnings = Vec::new();
    let mut new_nodes = Vec::new();
    let mut new_edges = Vec::new();
    let mut new_refs = Vec::new();
    for (candidate, result) in changed.iter().zip(parsed.into_iter()) {
        match result {
            Ok(output) => {
                if let Err(e) = output.check_referential_closure() {
                    warnings.push(format!("{}: {e}", candidate.relative_path));
                    continue;
                }
                warnings.extend(output.warnings);
                new_nodes.extend(output.nodes);
                new_edges.extend(output.edges);
                new_refs.extend(output.external_refs);
            }
            Err(e) => warnings.push(format!("{}: {e}", candidate.relative_path)),
        }
    }

    // Drop everything previously owned by a changed or deleted file from
    // this branch's live view; unchanged rows and freshly parsed rows form
    // the package's next live image. Effects have no tombstone field of
    // their own and aren't part of the structural pipeline, so they pass
    // through untouched.
    let stamp = chrono::Utc::now().to_rfc3339();
    let touched_paths: HashSet<&str> =
        changed.iter().map(|c| c.relative_path.as_str()).chain(deleted_paths.iter().map(String::as_str)).collect();

    let mut nodes_next = keep_untouched(prior.nodes, &touched_paths);
    nodes_next.extend(new_nodes);
    let mut edges_next = keep_untouched(prior.edges, &touched_paths);
    edges_next.extend(new_edges);
    let mut refs_next = keep_untouched(prior.external_refs, &touched_paths);
    refs_next.extend(new_refs);
    let effects = prior.effects;

    // Step 5: semantic resolution over the composed package.
    let known_files: HashSet<String> =
        nodes_next.iter().filter(|n| !n.is_deleted).map(|n| n.file_path.clone()).collect();
    let dotted_extensions: Vec<String> = extensions.iter().map(|e| format!(".{e}")).collect();
    let dotted_refs: Vec<&str> = dotted_extensions.iter().map(String::as_str).collect();
    let module_resolver = RelativeModuleResolver::new(&known_files, &dotted_refs);
    let report =
        resolve_package(ResolutionRequest::new(&nodes_next, &mut refs_next, &mut edges_next, &module_resolver));

    // `SeedStore::read(Branch::Base)` returns the base partition raw, with
    // no tombstone filtering (only the merged live view filters those) —
    // a base write is a full fresh snapshot, so rows simply absent from
    // `*_next` are gone. A named-branch write, by contrast, is a delta
    // laid over the untouched base partition, so a row removed here must
    // be carried forward as an explicit tombstone or the stale base copy
    // would resurface through the merge.
    let nodes = compose_partition(&base_only.nodes, nodes_next, &request.branch, &stamp);
    let edges = compose_partition(&base_only.edges, edges_next, &request.branch, &stamp);
    let refs = compose_partition(&base_only.external_refs, refs_next, &request.branch, &stamp);

    // Step 6/7: write atomically via the store.
    let batch = SeedBatch { nodes, edges, external_refs: refs, effects };
    store.write(&request.branch, &batch)?;

    tracing::info!(
        package = %request.package_root.display(),
        files_analyzed = changed.len(),
        nodes_created = batch.nodes.len(),
        edges_created = batch.edges.len(),
        "package analysis complete"
    );

    Ok(AnalyzeReport {
        files_analyzed: changed.len(),
        nodes_created: batch.nodes.len(),
        edges_created: batch.edges.len(),
        skipped: false,
        warnings,
        resolution_errors: report.errors,
        time_ms: elapsed_ms(started),
    })
}

fn any_changed(
    prior: &HashMap<String, String>,
    current: &HashMap<String, String>,
    candidates_by_path: &HashMap<&str, &CandidateFile>,
) -> bool {
    if prior.len() != current.len() {
        return true;
    }
    if prior.keys().any(|p| !candidates_by_path.contains_key(p.as_str())) {
        return true;
    }
    current.iter().any(|(path, hash)| prior.get(path).map(|p| p != hash).unwrap_or(true))
}

trait Owned {
    fn owning_file(&self) -> &str;
    fn mark_deleted(&mut self, stamp: &str);
    fn set_branch(&mut self, branch: Branch);
}

impl Owned for Node {
    fn owning_file(&self) -> &str {
        &self.file_path
    }
    fn mark_deleted(&mut self, stamp: &str) {
        self.is_deleted = true;
        self.updated_at = stamp.to_string();
    }
    fn set_branch(&mut self, branch: Branch) {
        self.branch = branch;
    }
}
impl Owned for Edge {
    fn owning_file(&self) -> &str {
        &self.source_file_path
    }
    fn mark_deleted(&mut self, stamp: &str) {
        self.is_deleted = true;
        self.updated_at = stamp.to_string();
    }
    fn set_branch(&mut self, branch: Branch) {
        self.branch = branch;
    }
}
impl Owned for ExternalRef {
    fn owning_file(&self) -> &str {
        &self.source_file_path
    }
    fn mark_deleted(&mut self, stamp: &str) {
        self.is_deleted = true;
        self.updated_at = stamp.to_string();
    }
    fn set_branch(&mut self, branch: Branch) {
        self.branch = branch;
    }
}

/// Drops rows owned by a changed/deleted file from a prior view; the
/// caller re-adds fresh rows for changed files and leaves deleted files
/// absent from the package's next live image.
fn keep_untouched<R: Owned>(rows: Vec<R>, touched: &HashSet<&str>) -> Vec<R> {
    rows.into_iter().filter(|r| !touched.contains(r.owning_file())).collect()
}

/// Composes the rows to write for one branch. A base write is a full
/// snapshot: `next` already reflects every live row, so it is returned
/// as-is. A named-branch write is a delta over the untouched base
/// partition: any base row whose primary key no longer appears in `next`
/// must be carried forward as an explicit tombstone, or `merge_live_view`
/// would keep showing the stale base copy.
fn compose_partition<R>(base: &[R], next: Vec<R>, branch: &Branch, stamp: &str) -> Vec<R>
where
    R: SeedRow + Owned + Clone,
{
    if matches!(branch, Branch::Base) {
        return next;
    }
    let next_keys: HashSet<R::Key> = next.iter().map(SeedRow::primary_key).collect();
    let mut delta = next;
    for base_row in base {
        if !next_keys.contains(&base_row.primary_key()) {
            let mut tombstone = base_row.clone();
            tombstone.mark_deleted(stamp);
            tombstone.set_branch(branch.clone());
            delta.push(tombstone);
        }
    }
    delta
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use devac_model::{EntityId, NodeFlags, NodeKind, PropertyBag, Visibility};
    use devac_parser_api::{ParseError, ParseOutput};

    struct StubParser;

    #[async_trait]
    impl FileParser for StubParser {
        fn extensions(&self) -> &[&str] {
            &["ts"]
        }

        async fn parse_file(
            &self,
            _repo_id: &str,
            _package_path: &str,
            relative_path: &str,
            _absolute_path: &Path,
        ) -> Result<ParseOutput, ParseError> {
            let entity_id = EntityId::new("repo", ".", "function", relative_path);
            let node = Node {
                entity_id: entity_id.clone(),
                name: "main".to_string(),
                qualified_name: "main".to_string(),
                kind: NodeKind::Function,
                file_path: relative_path.to_string(),
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
                source_file_hash: "stub".to_string(),
                branch: Branch::Base,
                is_deleted: false,
                updated_at: "2026-01-01T00:00:00Z".to_string(),
            };
            Ok(ParseOutput {
                file_path: relative_path.to_string(),
                parse_time_ms: 1,
                source_file_hash: "stub".to_string(),
                nodes: vec![node],
                edges: vec![],
                external_refs: vec![],
                warnings: vec![],
            })
        }
    }

    #[tokio::test]
    async fn analyzes_a_fresh_package_and_writes_a_partition() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export function main() {}").unwrap();

        let parser = StubParser;
        let request = AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: Branch::Base,
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        };
        let report = analyze(request).await.unwrap();

        assert!(!report.skipped);
        assert_eq!(report.files_analyzed, 1);
        assert_eq!(report.nodes_created, 1);
    }

    #[tokio::test]
    async fn if_changed_skips_when_nothing_differs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "export function main() {}").unwrap();
        let parser = StubParser;

        let first = AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: Branch::Base,
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        };
        analyze(first).await.unwrap();

        let second = AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: Branch::Base,
            force: false,
            if_changed: true,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        };
        let report = analyze(second).await.unwrap();
        assert!(report.skipped);
    }

    #[tokio::test]
    async fn deleted_files_are_tombstoned_on_the_next_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.ts");
        std::fs::write(&file_path, "export function main() {}").unwrap();
        let parser = StubParser;

        analyze(AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: Branch::Base,
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        })
        .await
        .unwrap();

        std::fs::remove_file(&file_path).unwrap();
        let report = analyze(AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: Branch::Base,
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        })
        .await
        .unwrap();

        assert_eq!(report.nodes_created, 0);
        let store = SeedStore::open(dir.path());
        let live = store.read(&Branch::Base).unwrap();
        assert!(live.nodes.is_empty());
    }

    #[tokio::test]
    async fn deleting_a_file_on_a_named_branch_tombstones_it_without_touching_base() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.ts");
        std::fs::write(&file_path, "export function main() {}").unwrap();
        let parser = StubParser;
        let branch = Branch::named("feature-x");

        analyze(AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: Branch::Base,
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        })
        .await
        .unwrap();

        // Touch the branch once with no changes, to establish an (empty)
        // delta partition, then delete the file and re-analyze.
        analyze(AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: branch.clone(),
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        })
        .await
        .unwrap();

        std::fs::remove_file(&file_path).unwrap();
        analyze(AnalyzeRequest {
            repo_id: "repo".to_string(),
            package_root: dir.path().to_path_buf(),
            branch: branch.clone(),
            force: false,
            if_changed: false,
            parser: &parser,
            extra_excludes: vec![],
            include: vec![],
        })
        .await
        .unwrap();

        let store = SeedStore::open(dir.path());
        let branch_view = store.read(&branch).unwrap();
        assert!(branch_view.nodes.is_empty(), "named-branch live view must hide the deleted file");

        let base_view = store.read(&Branch::Base).unwrap();
        assert_eq!(base_view.nodes.len(), 1, "base partition is untouched by a named-branch write");
    }
}
