use std::path::Path;

use devac_model::{Branch, Edge, EdgeType, EntityId, PropertyBag};

use super::{enum_to_string, must_bool, must_string, must_u32, string_to_enum};
use crate::columnar::{read_columnar_raw, write_columnar, Column, ColumnSpec};
use crate::error::StoreError;

const SCHEMA: &[ColumnSpec] = &[
    ColumnSpec { name: "source_entity_id" },
    ColumnSpec { name: "target_entity_id" },
    ColumnSpec { name: "edge_type" },
    ColumnSpec { name: "source_file_path" },
    ColumnSpec { name: "source_line" },
    ColumnSpec { name: "source_column" },
    ColumnSpec { name: "properties" },
    ColumnSpec { name: "source_file_hash" },
    ColumnSpec { name: "branch" },
    ColumnSpec { name: "is_deleted" },
    ColumnSpec { name: "updated_at" },
];

fn branch_to_string(branch: &Branch) -> String {
    match branch {
        Branch::Base => "base".to_string(),
        Branch::Named(name) => format!("branch:{name}"),
    }
}

fn branch_from_string(s: &str) -> Branch {
    match s.strip_prefix("branch:") {
        Some(name) => Branch::named(name),
        None => Branch::Base,
    }
}

pub fn write_edges(path: &Path, rows: &[Edge]) -> Result<(), StoreError> {
    let mut source_entity_id = Vec::with_capacity(rows.len());
    let mut target_entity_id = Vec::with_capacity(rows.len());
    let mut edge_type = Vec::with_capacity(rows.len());
    let mut source_file_path = Vec::with_capacity(rows.len());
    let mut source_line = Vec::with_capacity(rows.len());
    let mut source_column = Vec::with_capacity(rows.len());
    let mut properties = Vec::with_capacity(rows.len());
    let mut source_file_hash = Vec::with_capacity(rows.len());
    let mut branch = Vec::with_capacity(rows.len());
    let mut is_deleted = Vec::with_capacity(rows.len());
    let mut updated_at = Vec::with_capacity(rows.len());

    for row in rows {
        source_entity_id.push(row.source_entity_id.as_str().to_string());
        target_entity_id.push(row.target_entity_id.as_str().to_string());
        edge_type.push(enum_to_string(&row.edge_type));
        source_file_path.push(row.source_file_path.clone());
        source_line.push(row.source_line as i64);
        source_column.push(row.source_column as i64);
        properties.push(row.properties.to_json_string());
        source_file_hash.push(row.source_file_hash.clone());
        branch.push(branch_to_string(&row.branch));
        is_deleted.push(row.is_deleted);
        updated_at.push(row.updated_at.clone());
    }

    let columns = vec![
        Column::Utf8(source_entity_id),
        Column::Utf8(target_entity_id),
        Column::Utf8(edge_type),
        Column::Utf8(source_file_path),
        Column::I64(source_line),
        Column::I64(source_column),
        Column::Utf8(properties),
        Column::Utf8(source_file_hash),
        Column::Utf8(branch),
        Column::Bool(is_deleted),
        Column::Utf8(updated_at),
    ];

    write_columnar(path, SCHEMA, &columns).map_err(StoreError::from)
}

pub fn read_edges(path: &Path) -> Result<Vec<Edge>, StoreError> {
    let raw = read_columnar_raw(path, SCHEMA)?;
    let len = raw.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(len);

    for i in 0..len {
        out.push(Edge {
            source_entity_id: EntityId::parse(must_string(&raw[0][i]))?,
            target_entity_id: EntityId::parse(must_string(&raw[1][i]))?,
            edge_type: string_to_enum::<EdgeType>(&must_string(&raw[2][i])),
            source_file_path: must_string(&raw[3][i]),
            source_line: must_u32(&raw[4][i]),
            source_column: must_u32(&raw[5][i]),
            properties: PropertyBag::from_json_string(&must_string(&raw[6][i]))
                .unwrap_or_else(|_| PropertyBag::empty()),
            source_file_hash: must_string(&raw[7][i]),
            branch: branch_from_string(&must_string(&raw[8][i])),
            is_deleted: must_bool(&raw[9][i]),
            updated_at: must_string(&raw[10][i]),
        });
    }
    Ok(out)
}
