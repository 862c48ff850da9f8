use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Default directories skipped during enumeration regardless of caller
/// configuration (spec §4.5 step 1: "node_modules, build outputs, VCS
/// dirs, .devac").
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/.devac-seed/**",
    "**/dist/**",
    "**/build/**",
    "**/target/**",
    "**/.next/**",
    "**/out/**",
];

/// Compiled include/exclude glob pair used to filter candidate files,
/// mirroring the precedence rule of a compiled include/exclude glob
/// matcher from the retrieval pack: excludes win even over an explicit
/// include.
pub struct IgnoreRules {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl IgnoreRules {
    pub fn new(extra_excludes: &[String], include: &[String]) -> Result<Self, globset::Error> {
        let mut exclude_builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).chain(extra_excludes.iter().cloned()) {
            exclude_builder.add(Glob::new(&pattern)?);
        }
        let include = if include.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in include {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };
        Ok(Self { include, exclude: exclude_builder.build()? })
    }

    pub fn allows(&self, path: &Path) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }
        match &self.include {
            Some(set) => set.is_match(path),
            None => true,
        }
    }
}
