use std::path::Path;

use devac_model::{Branch, EntityId, ExternalRef, ImportStyle};

use super::{enum_to_string, must_bool, must_string, must_u32, string_to_enum};
use crate::columnar::{read_columnar_raw, write_columnar, Column, ColumnSpec};
use crate::error::StoreError;

const SCHEMA: &[ColumnSpec] = &[
    ColumnSpec { name: "source_entity_id" },
    ColumnSpec { name: "module_specifier" },
    ColumnSpec { name: "imported_symbol" },
    ColumnSpec { name: "local_alias" },
    ColumnSpec { name: "import_style" },
    ColumnSpec { name: "is_type_only" },
    ColumnSpec { name: "source_file_path" },
    ColumnSpec { name: "source_line" },
    ColumnSpec { name: "source_column" },
    ColumnSpec { name: "target_entity_id" },
    ColumnSpec { name: "is_resolved" },
    ColumnSpec { name: "is_reexport" },
    ColumnSpec { name: "export_alias" },
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

pub fn write_external_refs(path: &Path, rows: &[ExternalRef]) -> Result<(), StoreError> {
    let mut source_entity_id = Vec::with_capacity(rows.len());
    let mut module_specifier = Vec::with_capacity(rows.len());
    let mut imported_symbol = Vec::with_capacity(rows.len());
    let mut local_alias = Vec::with_capacity(rows.len());
    let mut import_style = Vec::with_capacity(rows.len());
    let mut is_type_only = Vec::with_capacity(rows.len());
    let mut source_file_path = Vec::with_capacity(rows.len());
    let mut source_line = Vec::with_capacity(rows.len());
    let mut source_column = Vec::with_capacity(rows.len());
    let mut target_entity_id = Vec::with_capacity(rows.len());
    let mut is_resolved = Vec::with_capacity(rows.len());
    let mut is_reexport = Vec::with_capacity(rows.len());
    let mut export_alias = Vec::with_capacity(rows.len());
    let mut source_file_hash = Vec::with_capacity(rows.len());
    let mut branch = Vec::with_capacity(rows.len());
    let mut is_deleted = Vec::with_capacity(rows.len());
    let mut updated_at = Vec::with_capacity(rows.len());

    for row in rows {
        source_entity_id.push(row.source_entity_id.as_str().to_string());
        module_specifier.push(row.module_specifier.clone());
        imported_symbol.push(row.imported_symbol.clone());
        local_alias.push(row.local_alias.clone());
        import_style.push(enum_to_string(&row.import_style));
        is_type_only.push(row.is_type_only);
        source_file_path.push(row.source_file_path.clone());
        source_line.push(row.source_line as i64);
        source_column.push(row.source_column as i64);
        target_entity_id.push(row.target_entity_id.as_ref().map(|id| id.as_str().to_string()));
        is_resolved.push(row.is_resolved);
        is_reexport.push(row.is_reexport);
        export_alias.push(row.export_alias.clone());
        source_file_hash.push(row.source_file_hash.clone());
        branch.push(branch_to_string(&row.branch));
        is_deleted.push(row.is_deleted);
        updated_at.push(row.updated_at.clone());
    }

    let columns = vec![
        Column::Utf8(source_entity_id),
        Column::Utf8(module_specifier),
        Column::Utf8(imported_symbol),
        Column::OptUtf8(local_alias),
        Column::Utf8(import_style),
        Column::Bool(is_type_only),
        Column::Utf8(source_file_path),
        Column::I64(source_line),
        Column::I64(source_column),
        Column::OptUtf8(target_entity_id),
        Column::Bool(is_resolved),
        Column::Bool(is_reexport),
        Column::OptUtf8(export_alias),
        Column::Utf8(source_file_hash),
        Column::Utf8(branch),
        Column::Bool(is_deleted),
        Column::Utf8(updated_at),
    ];

    write_columnar(path, SCHEMA, &columns).map_err(StoreError::from)
}

pub fn read_external_refs(path: &Path) -> Result<Vec<ExternalRef>, StoreError> {
    let raw = read_columnar_raw(path, SCHEMA)?;
    let len = raw.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(len);

    for i in 0..len {
        out.push(ExternalRef {
            source_entity_id: EntityId::parse(must_string(&raw[0][i]))?,
            module_specifier: must_string(&raw[1][i]),
            imported_symbol: must_string(&raw[2][i]),
            local_alias: raw[3][i].clone(),
            import_style: string_to_enum::<ImportStyle>(&must_string(&raw[4][i])),
            is_type_only: must_bool(&raw[5][i]),
            source_file_path: must_string(&raw[6][i]),
            source_line: must_u32(&raw[7][i]),
            source_column: must_u32(&raw[8][i]),
            target_entity_id: raw[9][i].clone().map(EntityId::parse).transpose()?,
            is_resolved: must_bool(&raw[10][i]),
            is_reexport: must_bool(&raw[11][i]),
            export_alias: raw[12][i].clone(),
            source_file_hash: must_string(&raw[13][i]),
            branch: branch_from_string(&must_string(&raw[14][i])),
            is_deleted: must_bool(&raw[15][i]),
            updated_at: must_string(&raw[16][i]),
        });
    }
    Ok(out)
}
