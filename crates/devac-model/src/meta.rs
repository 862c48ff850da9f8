use serde::{Deserialize, Serialize};

/// The schema version this engine speaks. Mismatches against a seed's
/// `meta.json` surface as a validation error before any query runs
/// (spec §3, invariant on schema version).
pub const SCHEMA_VERSION: &str = "1.0";

/// `<package>/<seed_root>/meta.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedMeta {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
}

impl Default for SeedMeta {
    fn default() -> Self {
        Self { schema_version: SCHEMA_VERSION.to_string() }
    }
}

/// `<package>/<seed_root>/stats.json`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SeedStats {
    #[serde(rename = "nodeCount")]
    pub node_count: u64,
    #[serde(rename = "edgeCount")]
    pub edge_count: u64,
    #[serde(rename = "refCount")]
    pub ref_count: u64,
    #[serde(rename = "fileCount")]
    pub file_count: u64,
}

/// The manifest schema version string the repository manifest and the hub
/// both reject any other value for (spec §6).
pub const MANIFEST_SCHEMA_VERSION: &str = "2.0";

/// `<repo>/.devac/manifest.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub repo_id: String,
    /// ISO-8601.
    pub generated_at: String,
    pub packages: Vec<PackageInfo>,
    pub external_dependencies: Vec<ExternalDependency>,
}

impl Manifest {
    pub fn new(repo_id: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_SCHEMA_VERSION.to_string(),
            repo_id: repo_id.into(),
            generated_at: generated_at.into(),
            packages: Vec::new(),
            external_dependencies: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Repo-relative.
    pub path: String,
    pub name: String,
    /// Normalized, repo-relative path to the seed root.
    pub seed_path: String,
    /// ISO-8601.
    pub last_analyzed: String,
    pub file_count: u64,
    pub node_count: u64,
    pub edge_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalDependency {
    pub package: String,
    pub repo_id: Option<String>,
    pub version: Option<String>,
}
