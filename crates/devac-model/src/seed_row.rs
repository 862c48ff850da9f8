use serde::{Deserialize, Serialize};

/// Identifies a partition: the last full snapshot, or a named branch delta
/// (spec §3, "Branch partitioning").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    Base,
    Named(String),
}

impl Branch {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The on-disk path segment for this partition, relative to the seed
    /// root: `base` or `branch/<name>`.
    pub fn path_segment(&self) -> String {
        match self {
            Branch::Base => "base".to_string(),
            Branch::Named(name) => format!("branch/{name}"),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Branch::Base => "base",
            Branch::Named(name) => name.as_str(),
        }
    }
}

impl Default for Branch {
    fn default() -> Self {
        Branch::Base
    }
}

/// A row that participates in the base/delta merge-by-primary-key
/// discipline common to all four seed tables (spec §4.1, invariant 3 of
/// spec §8).
pub trait SeedRow {
    /// The primary-key type used to group base and delta rows for the
    /// live-view merge. Must be `Eq + Hash` so callers can fold rows into
    /// a map keyed by it.
    type Key: Eq + std::hash::Hash + Clone;

    fn primary_key(&self) -> Self::Key;
    fn is_deleted(&self) -> bool;
    fn branch(&self) -> &Branch;
    fn updated_at(&self) -> &str;
}

/// Applies the base ⊎ delta merge described by spec §4.1 and verified by
/// scenario S3: delta rows win by primary key over base rows, and any row
/// whose winning (highest-priority) copy is a tombstone is dropped from
/// the live view.
pub fn merge_live_view<R: SeedRow + Clone>(base: &[R], delta: &[R]) -> Vec<R> {
    use std::collections::HashMap;

    let mut by_key: HashMap<R::Key, R> = HashMap::with_capacity(base.len() + delta.len());
    for row in base {
        by_key.insert(row.primary_key(), row.clone());
    }
    for row in delta {
        by_key.insert(row.primary_key(), row.clone());
    }
    by_key.into_values().filter(|row| !row.is_deleted()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Row {
        key: u32,
        deleted: bool,
    }

    impl SeedRow for Row {
        type Key = u32;
        fn primary_key(&self) -> u32 {
            self.key
        }
        fn is_deleted(&self) -> bool {
            self.deleted
        }
        fn branch(&self) -> &Branch {
            static BASE: Branch = Branch::Base;
            &BASE
        }
        fn updated_at(&self) -> &str {
            ""
        }
    }

    #[test]
    fn delta_wins_and_tombstones_drop() {
        // Base {N1, N2}; delta {N2' (replaces N2), N3, tombstone(N1)} => live {N2', N3}
        let base = vec![
            Row { key: 1, deleted: false },
            Row { key: 2, deleted: false },
        ];
        let delta = vec![
            Row { key: 2, deleted: false },
            Row { key: 3, deleted: false },
            Row { key: 1, deleted: true },
        ];
        let mut live: Vec<u32> = merge_live_view(&base, &delta).into_iter().map(|r| r.key).collect();
        live.sort();
        assert_eq!(live, vec![2, 3]);
    }
}
