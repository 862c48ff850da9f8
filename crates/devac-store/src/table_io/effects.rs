use std::path::Path;

use devac_model::{Branch, Effect, EffectKind, EntityId, PropertyBag};

use super::must_string;
use crate::columnar::{read_columnar_raw, write_columnar, Column, ColumnSpec};
use crate::error::StoreError;

const SCHEMA: &[ColumnSpec] = &[
    ColumnSpec { name: "effect_id" },
    ColumnSpec { name: "timestamp" },
    ColumnSpec { name: "source_entity_id" },
    ColumnSpec { name: "source_file_path" },
    ColumnSpec { name: "source_line" },
    ColumnSpec { name: "source_column" },
    ColumnSpec { name: "branch" },
    ColumnSpec { name: "properties" },
    ColumnSpec { name: "kind" },
    ColumnSpec { name: "callee_name" },
    ColumnSpec { name: "is_external" },
    ColumnSpec { name: "store_type" },
    ColumnSpec { name: "operation" },
    ColumnSpec { name: "target_resource" },
    ColumnSpec { name: "channel" },
    ColumnSpec { name: "method" },
    ColumnSpec { name: "status_code" },
    ColumnSpec { name: "expression" },
    ColumnSpec { name: "iterable_expression" },
    ColumnSpec { name: "member_count" },
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

/// Per-variant nullable fields, flattened into one column group, per
/// Design Notes ("discriminator plus per-variant nullable fields").
struct VariantFields {
    callee_name: Option<String>,
    is_external: Option<String>,
    store_type: Option<String>,
    operation: Option<String>,
    target_resource: Option<String>,
    channel: Option<String>,
    method: Option<String>,
    status_code: Option<String>,
    expression: Option<String>,
    iterable_expression: Option<String>,
    member_count: Option<String>,
}

impl VariantFields {
    fn empty() -> Self {
        Self {
            callee_name: None,
            is_external: None,
            store_type: None,
            operation: None,
            target_resource: None,
            channel: None,
            method: None,
            status_code: None,
            expression: None,
            iterable_expression: None,
            member_count: None,
        }
    }
}

fn flatten(kind: &EffectKind) -> VariantFields {
    let mut f = VariantFields::empty();
    match kind {
        EffectKind::FunctionCall { callee_name, is_external } => {
            f.callee_name = Some(callee_name.clone());
            f.is_external = Some(is_external.to_string());
        }
        EffectKind::Store { store_type, operation, target_resource } => {
            f.store_type = Some(store_type.clone());
            f.operation = Some(operation.clone());
            f.target_resource = target_resource.clone();
        }
        EffectKind::Retrieve { store_type, operation, target_resource } => {
            f.store_type = Some(store_type.clone());
            f.operation = Some(operation.clone());
            f.target_resource = target_resource.clone();
        }
        EffectKind::Send { channel, target_resource } => {
            f.channel = channel.clone();
            f.target_resource = target_resource.clone();
        }
        EffectKind::Request { method, target_resource } => {
            f.method = method.clone();
            f.target_resource = target_resource.clone();
        }
        EffectKind::Response { status_code } => {
            f.status_code = status_code.map(|v| v.to_string());
        }
        EffectKind::Condition { expression } => {
            f.expression = expression.clone();
        }
        EffectKind::Loop { iterable_expression } => {
            f.iterable_expression = iterable_expression.clone();
        }
        EffectKind::Group { member_count } => {
            f.member_count = Some(member_count.to_string());
        }
    }
    f
}

fn unflatten(discriminator: &str, f: &VariantFields) -> EffectKind {
    match discriminator {
        "function_call" => EffectKind::FunctionCall {
            callee_name: f.callee_name.clone().unwrap_or_default(),
            is_external: f.is_external.as_deref() == Some("true"),
        },
        "store" => EffectKind::Store {
            store_type: f.store_type.clone().unwrap_or_default(),
            operation: f.operation.clone().unwrap_or_default(),
            target_resource: f.target_resource.clone(),
        },
        "retrieve" => EffectKind::Retrieve {
            store_type: f.store_type.clone().unwrap_or_default(),
            operation: f.operation.clone().unwrap_or_default(),
            target_resource: f.target_resource.clone(),
        },
        "send" => EffectKind::Send { channel: f.channel.clone(), target_resource: f.target_resource.clone() },
        "request" => EffectKind::Request { method: f.method.clone(), target_resource: f.target_resource.clone() },
        "response" => EffectKind::Response { status_code: f.status_code.as_deref().and_then(|v| v.parse().ok()) },
        "condition" => EffectKind::Condition { expression: f.expression.clone() },
        "loop" => EffectKind::Loop { iterable_expression: f.iterable_expression.clone() },
        "group" => EffectKind::Group {
            member_count: f.member_count.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0),
        },
        other => panic!("unknown effect discriminator `{other}`"),
    }
}

pub fn write_effects(path: &Path, rows: &[Effect]) -> Result<(), StoreError> {
    let mut effect_id = Vec::with_capacity(rows.len());
    let mut timestamp = Vec::with_capacity(rows.len());
    let mut source_entity_id = Vec::with_capacity(rows.len());
    let mut source_file_path = Vec::with_capacity(rows.len());
    let mut source_line = Vec::with_capacity(rows.len());
    let mut source_column = Vec::with_capacity(rows.len());
    let mut branch = Vec::with_capacity(rows.len());
    let mut properties = Vec::with_capacity(rows.len());
    let mut kind = Vec::with_capacity(rows.len());
    let mut callee_name = Vec::with_capacity(rows.len());
    let mut is_external = Vec::with_capacity(rows.len());
    let mut store_type = Vec::with_capacity(rows.len());
    let mut operation = Vec::with_capacity(rows.len());
    let mut target_resource = Vec::with_capacity(rows.len());
    let mut channel = Vec::with_capacity(rows.len());
    let mut method = Vec::with_capacity(rows.len());
    let mut status_code = Vec::with_capacity(rows.len());
    let mut expression = Vec::with_capacity(rows.len());
    let mut iterable_expression = Vec::with_capacity(rows.len());
    let mut member_count = Vec::with_capacity(rows.len());

    for row in rows {
        effect_id.push(row.effect_id.clone());
        timestamp.push(row.timestamp.clone());
        source_entity_id.push(row.source_entity_id.as_str().to_string());
        source_file_path.push(row.source_file_path.clone());
        source_line.push(row.source_line as i64);
        source_column.push(row.source_column as i64);
        branch.push(branch_to_string(&row.branch));
        properties.push(row.properties.to_json_string());
        kind.push(row.kind.discriminator().to_string());

        let f = flatten(&row.kind);
        callee_name.push(f.callee_name);
        is_external.push(f.is_external);
        store_type.push(f.store_type);
        operation.push(f.operation);
        target_resource.push(f.target_resource);
        channel.push(f.channel);
        method.push(f.method);
        status_code.push(f.status_code);
        expression.push(f.expression);
        iterable_expression.push(f.iterable_expression);
        member_count.push(f.member_count);
    }

    let columns = vec![
        Column::Utf8(effect_id),
        Column::Utf8(timestamp),
        Column::Utf8(source_entity_id),
        Column::Utf8(source_file_path),
        Column::I64(source_line),
        Column::I64(source_column),
        Column::Utf8(branch),
        Column::Utf8(properties),
        Column::Utf8(kind),
        Column::OptUtf8(callee_name),
        Column::OptUtf8(is_external),
        Column::OptUtf8(store_type),
        Column::OptUtf8(operation),
        Column::OptUtf8(target_resource),
        Column::OptUtf8(channel),
        Column::OptUtf8(method),
        Column::OptUtf8(status_code),
        Column::OptUtf8(expression),
        Column::OptUtf8(iterable_expression),
        Column::OptUtf8(member_count),
    ];

    write_columnar(path, SCHEMA, &columns).map_err(StoreError::from)
}

pub fn read_effects(path: &Path) -> Result<Vec<Effect>, StoreError> {
    let raw = read_columnar_raw(path, SCHEMA)?;
    let len = raw.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(len);

    for i in 0..len {
        let discriminator = must_string(&raw[8][i]);
        let f = VariantFields {
            callee_name: raw[9][i].clone(),
            is_external: raw[10][i].clone(),
            store_type: raw[11][i].clone(),
            operation: raw[12][i].clone(),
            target_resource: raw[13][i].clone(),
            channel: raw[14][i].clone(),
            method: raw[15][i].clone(),
            status_code: raw[16][i].clone(),
            expression: raw[17][i].clone(),
            iterable_expression: raw[18][i].clone(),
            member_count: raw[19][i].clone(),
        };

        out.push(Effect {
            effect_id: must_string(&raw[0][i]),
            timestamp: must_string(&raw[1][i]),
            source_entity_id: EntityId::parse(must_string(&raw[2][i]))?,
            source_file_path: must_string(&raw[3][i]),
            source_line: raw[4][i].as_deref().and_then(|v| v.parse().ok()).unwrap_or(0),
            source_column: raw[5][i].as_deref().and_then(|v| v.parse().ok()).unwrap_or(0),
            branch: branch_from_string(&must_string(&raw[6][i])),
            properties: PropertyBag::from_json_string(&must_string(&raw[7][i]))
                .unwrap_or_else(|_| PropertyBag::empty()),
            kind: unflatten(&discriminator, &f),
        });
    }
    Ok(out)
}
