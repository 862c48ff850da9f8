//! Per-table parquet column layouts, built on top of [`crate::columnar`].

mod edges;
mod effects;
mod external_refs;
mod nodes;

pub use edges::{read_edges, write_edges};
pub use effects::{read_effects, write_effects};
pub use external_refs::{read_external_refs, write_external_refs};
pub use nodes::{read_nodes, write_nodes};

/// Parses a value this crate itself always writes; a malformed file is a
/// store-level bug, not a recoverable condition, hence the panic — callers
/// never construct these parquet files by hand.
pub(crate) fn must_bool(s: &Option<String>) -> bool {
    s.as_deref().map(|v| v == "true").unwrap_or(false)
}

pub(crate) fn must_u32(s: &Option<String>) -> u32 {
    s.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
}

pub(crate) fn must_string(s: &Option<String>) -> String {
    s.clone().unwrap_or_default()
}

/// Round-trips a unit-ish enum through its serde representation so every
/// table can store enums as plain strings without hand-written `FromStr`
/// impls in `devac-model`.
pub(crate) fn enum_to_string<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value).expect("enum serializes") {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

pub(crate) fn string_to_enum<T: serde::de::DeserializeOwned>(s: &str) -> T {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .unwrap_or_else(|e| panic!("invalid enum value `{s}`: {e}"))
}
