use std::path::Path;

use devac_model::{Branch, EntityId, Node, NodeFlags, NodeKind, PropertyBag, Visibility};

use super::{enum_to_string, must_bool, must_string, must_u32, string_to_enum};
use crate::columnar::{read_columnar_raw, write_columnar, Column, ColumnSpec};
use crate::error::StoreError;

const SCHEMA: &[ColumnSpec] = &[
    ColumnSpec { name: "entity_id" },
    ColumnSpec { name: "name" },
    ColumnSpec { name: "qualified_name" },
    ColumnSpec { name: "kind" },
    ColumnSpec { name: "file_path" },
    ColumnSpec { name: "start_line" },
    ColumnSpec { name: "start_column" },
    ColumnSpec { name: "end_line" },
    ColumnSpec { name: "end_column" },
    ColumnSpec { name: "visibility" },
    ColumnSpec { name: "is_exported" },
    ColumnSpec { name: "is_default_export" },
    ColumnSpec { name: "is_async" },
    ColumnSpec { name: "is_generator" },
    ColumnSpec { name: "is_static" },
    ColumnSpec { name: "is_abstract" },
    ColumnSpec { name: "type_signature" },
    ColumnSpec { name: "documentation" },
    ColumnSpec { name: "decorators" },
    ColumnSpec { name: "type_parameters" },
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

pub fn write_nodes(path: &Path, rows: &[Node]) -> Result<(), StoreError> {
    let mut entity_id = Vec::with_capacity(rows.len());
    let mut name = Vec::with_capacity(rows.len());
    let mut qualified_name = Vec::with_capacity(rows.len());
    let mut kind = Vec::with_capacity(rows.len());
    let mut file_path = Vec::with_capacity(rows.len());
    let mut start_line = Vec::with_capacity(rows.len());
    let mut start_column = Vec::with_capacity(rows.len());
    let mut end_line = Vec::with_capacity(rows.len());
    let mut end_column = Vec::with_capacity(rows.len());
    let mut visibility = Vec::with_capacity(rows.len());
    let mut is_exported = Vec::with_capacity(rows.len());
    let mut is_default_export = Vec::with_capacity(rows.len());
    let mut is_async = Vec::with_capacity(rows.len());
    let mut is_generator = Vec::with_capacity(rows.len());
    let mut is_static = Vec::with_capacity(rows.len());
    let mut is_abstract = Vec::with_capacity(rows.len());
    let mut type_signature = Vec::with_capacity(rows.len());
    let mut documentation = Vec::with_capacity(rows.len());
    let mut decorators = Vec::with_capacity(rows.len());
    let mut type_parameters = Vec::with_capacity(rows.len());
    let mut properties = Vec::with_capacity(rows.len());
    let mut source_file_hash = Vec::with_capacity(rows.len());
    let mut branch = Vec::with_capacity(rows.len());
    let mut is_deleted = Vec::with_capacity(rows.len());
    let mut updated_at = Vec::with_capacity(rows.len());

    for row in rows {
        entity_id.push(row.entity_id.as_str().to_string());
        name.push(row.name.clone());
        qualified_name.push(row.qualified_name.clone());
        kind.push(enum_to_string(&row.kind));
        file_path.push(row.file_path.clone());
        start_line.push(row.start_line as i64);
        start_column.push(row.start_column as i64);
        end_line.push(row.end_line as i64);
        end_column.push(row.end_column as i64);
        visibility.push(enum_to_string(&row.visibility));
        is_exported.push(row.flags.is_exported);
        is_default_export.push(row.flags.is_default_export);
        is_async.push(row.flags.is_async);
        is_generator.push(row.flags.is_generator);
        is_static.push(row.flags.is_static);
        is_abstract.push(row.flags.is_abstract);
        type_signature.push(row.type_signature.clone());
        documentation.push(row.documentation.clone());
        decorators.push(serde_json::to_string(&row.decorators).unwrap_or_else(|_| "[]".into()));
        type_parameters.push(serde_json::to_string(&row.type_parameters).unwrap_or_else(|_| "[]".into()));
        properties.push(row.properties.to_json_string());
        source_file_hash.push(row.source_file_hash.clone());
        branch.push(branch_to_string(&row.branch));
        is_deleted.push(row.is_deleted);
        updated_at.push(row.updated_at.clone());
    }

    let columns = vec![
        Column::Utf8(entity_id),
        Column::Utf8(name),
        Column::Utf8(qualified_name),
        Column::Utf8(kind),
        Column::Utf8(file_path),
        Column::I64(start_line),
        Column::I64(start_column),
        Column::I64(end_line),
        Column::I64(end_column),
        Column::Utf8(visibility),
        Column::Bool(is_exported),
        Column::Bool(is_default_export),
        Column::Bool(is_async),
        Column::Bool(is_generator),
        Column::Bool(is_static),
        Column::Bool(is_abstract),
        Column::OptUtf8(type_signature),
        Column::OptUtf8(documentation),
        Column::Utf8(decorators),
        Column::Utf8(type_parameters),
        Column::Utf8(properties),
        Column::Utf8(source_file_hash),
        Column::Utf8(branch),
        Column::Bool(is_deleted),
        Column::Utf8(updated_at),
    ];

    write_columnar(path, SCHEMA, &columns).map_err(StoreError::from)
}

pub fn read_nodes(path: &Path) -> Result<Vec<Node>, StoreError> {
    let raw = read_columnar_raw(path, SCHEMA)?;
    let len = raw.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(len);

    for i in 0..len {
        out.push(Node {
            entity_id: EntityId::parse(must_string(&raw[0][i]))?,
            name: must_string(&raw[1][i]),
            qualified_name: must_string(&raw[2][i]),
            kind: string_to_enum::<NodeKind>(&must_string(&raw[3][i])),
            file_path: must_string(&raw[4][i]),
            start_line: must_u32(&raw[5][i]),
            start_column: must_u32(&raw[6][i]),
            end_line: must_u32(&raw[7][i]),
            end_column: must_u32(&raw[8][i]),
            visibility: string_to_enum::<Visibility>(&must_string(&raw[9][i])),
            flags: NodeFlags {
                is_exported: must_bool(&raw[10][i]),
                is_default_export: must_bool(&raw[11][i]),
                is_async: must_bool(&raw[12][i]),
                is_generator: must_bool(&raw[13][i]),
                is_static: must_bool(&raw[14][i]),
                is_abstract: must_bool(&raw[15][i]),
            },
            type_signature: raw[16][i].clone(),
            documentation: raw[17][i].clone(),
            decorators: serde_json::from_str(&must_string(&raw[18][i])).unwrap_or_default(),
            type_parameters: serde_json::from_str(&must_string(&raw[19][i])).unwrap_or_default(),
            properties: PropertyBag::from_json_string(&must_string(&raw[20][i]))
                .unwrap_or_else(|_| PropertyBag::empty()),
            source_file_hash: must_string(&raw[21][i]),
            branch: branch_from_string(&must_string(&raw[22][i])),
            is_deleted: must_bool(&raw[23][i]),
            updated_at: must_string(&raw[24][i]),
        });
    }
    Ok(out)
}
