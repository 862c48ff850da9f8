use std::fmt;

/// A stable, content-derived identifier for a graph node.
///
/// Grammar: `repo:package:kind:hash`, where `package` may be `.` to denote
/// the repository root, or the well-known placeholder `unresolved:<name>`
/// used before semantic resolution (spec §3, §6).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity id `{0}` does not match the `repo:package:kind:hash` grammar")]
    BadGrammar(String),
}

impl EntityId {
    pub const UNRESOLVED_PREFIX: &'static str = "unresolved:";

    /// Build an entity id from its parts, formatting the `.` placeholder
    /// for a repo-root package automatically when `package` is empty.
    pub fn new(repo: &str, package: &str, kind: &str, hash: &str) -> Self {
        let package = if package.is_empty() { "." } else { package };
        Self(format!("{repo}:{package}:{kind}:{hash}"))
    }

    /// The well-known placeholder for an edge/ref target that has not yet
    /// been resolved by the semantic resolver.
    pub fn unresolved(display_name: &str) -> Self {
        Self(format!("{}{display_name}", Self::UNRESOLVED_PREFIX))
    }

    pub fn is_unresolved(&self) -> bool {
        self.0.starts_with(Self::UNRESOLVED_PREFIX)
    }

    pub fn parse(s: impl Into<String>) -> Result<Self, EntityIdError> {
        let s = s.into();
        if s.starts_with(Self::UNRESOLVED_PREFIX) {
            return Ok(Self(s));
        }
        let parts: Vec<&str> = s.splitn(4, ':').collect();
        if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(EntityIdError::BadGrammar(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The repository component, or `None` for an `unresolved:*` id.
    pub fn repo(&self) -> Option<&str> {
        if self.is_unresolved() {
            return None;
        }
        self.0.split(':').next()
    }

    pub fn package(&self) -> Option<&str> {
        if self.is_unresolved() {
            return None;
        }
        self.0.splitn(4, ':').nth(1)
    }

    pub fn kind(&self) -> Option<&str> {
        if self.is_unresolved() {
            return None;
        }
        self.0.splitn(4, ':').nth(2)
    }

    pub fn hash(&self) -> Option<&str> {
        if self.is_unresolved() {
            return None;
        }
        self.0.splitn(4, ':').nth(3)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

/// Computes the content-derived hash component of an entity id from a
/// symbol's location and shape, per spec §3 ("hash is a content-derived
/// digest of the symbol's location and shape").
pub fn shape_hash(qualified_name: &str, kind: &str, start_line: u32, start_col: u32) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(qualified_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(kind.as_bytes());
    hasher.update(b"\0");
    hasher.update(start_line.to_le_bytes());
    hasher.update(start_col.to_le_bytes());
    let digest = hasher.finalize();
    hex_prefix(&digest, 16)
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes
        .iter()
        .take(n)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_repo_root_package_as_dot() {
        let id = EntityId::new("acme/widgets", "", "function", "abc123");
        assert_eq!(id.as_str(), "acme/widgets:.:function:abc123");
        assert_eq!(id.package(), Some("."));
    }

    #[test]
    fn unresolved_ids_carry_no_structured_parts() {
        let id = EntityId::unresolved("doThing");
        assert!(id.is_unresolved());
        assert_eq!(id.repo(), None);
        assert_eq!(id.as_str(), "unresolved:doThing");
    }

    #[test]
    fn rejects_malformed_grammar() {
        assert!(EntityId::parse("not-an-entity-id").is_err());
        assert!(EntityId::parse("repo:pkg:kind:").is_err());
    }

    #[test]
    fn shape_hash_is_deterministic() {
        let a = shape_hash("Widget.render", "method", 10, 2);
        let b = shape_hash("Widget.render", "method", 10, 2);
        assert_eq!(a, b);
        let c = shape_hash("Widget.render", "method", 11, 2);
        assert_ne!(a, c);
    }
}
