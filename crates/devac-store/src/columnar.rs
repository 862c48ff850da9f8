//! A small generic columnar reader/writer shared by all four seed tables.
//!
//! The `parquet` crate's record API (the same one the sibling `parser`
//! crate's `parquet.rs` format uses for reading) is read-only, so writing
//! goes through the lower-level per-column writer while reading stays on
//! the row-oriented `RowAccessor` API, consistent with how the rest of the
//! corpus consumes parquet files.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::basic::Type as PhysicalType;
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::record::{Field, RowAccessor};
use parquet::schema::types::Type as SchemaType;

#[derive(Debug, thiserror::Error)]
pub enum ColumnarError {
    #[error("parquet I/O error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("parquet column writer produced no writer for this column")]
    MissingColumnWriter,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ColumnarError>;

/// One column's worth of typed values, in row order. Every variant's
/// length must equal the table's row count.
#[derive(Clone, Debug)]
pub enum Column {
    Bool(Vec<bool>),
    Utf8(Vec<String>),
    OptUtf8(Vec<Option<String>>),
    I64(Vec<i64>),
    OptI64(Vec<Option<i64>>),
}

pub struct ColumnSpec {
    pub name: &'static str,
}

/// Writes `columns` (one entry per `schema` column, all the same length)
/// as a single-row-group parquet file at `path`, creating parent
/// directories as needed.
pub fn write_columnar(path: &Path, schema: &[ColumnSpec], columns: &[Column]) -> Result<()> {
    assert_eq!(schema.len(), columns.len(), "schema/column count mismatch");

    let message = build_message_type(schema, columns);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ColumnarError::Parquet(parquet::errors::ParquetError::General(format!(
                "creating {}: {e}",
                parent.display()
            )))
        })?;
    }
    let file = File::create(path)?;
    let props = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(file, Arc::new(message), props)?;
    let mut row_group = writer.next_row_group()?;

    for column in columns {
        let mut col_writer = row_group.next_column()?.ok_or(ColumnarError::MissingColumnWriter)?;
        write_one_column(&mut col_writer, column)?;
        col_writer.close()?;
    }

    row_group.close()?;
    writer.close()?;
    Ok(())
}

fn write_one_column(col_writer: &mut SerializedColumnWriter, column: &Column) -> Result<()> {
    match column {
        Column::Bool(values) => {
            if let ColumnWriter::BoolColumnWriter(ref mut typed) = col_writer.untyped() {
                typed.write_batch(values, None, None)?;
            }
        }
        Column::Utf8(values) => {
            let arrays: Vec<ByteArray> = values.iter().map(|s| ByteArray::from(s.as_str())).collect();
            if let ColumnWriter::ByteArrayColumnWriter(ref mut typed) = col_writer.untyped() {
                typed.write_batch(&arrays, None, None)?;
            }
        }
        Column::OptUtf8(values) => {
            let def_levels: Vec<i16> = values.iter().map(|v| if v.is_some() { 1 } else { 0 }).collect();
            let arrays: Vec<ByteArray> =
                values.iter().filter_map(|v| v.as_deref()).map(ByteArray::from).collect();
            if let ColumnWriter::ByteArrayColumnWriter(ref mut typed) = col_writer.untyped() {
                typed.write_batch(&arrays, Some(&def_levels), None)?;
            }
        }
        Column::I64(values) => {
            if let ColumnWriter::Int64ColumnWriter(ref mut typed) = col_writer.untyped() {
                typed.write_batch(values, None, None)?;
            }
        }
        Column::OptI64(values) => {
            let def_levels: Vec<i16> = values.iter().map(|v| if v.is_some() { 1 } else { 0 }).collect();
            let data: Vec<i64> = values.iter().filter_map(|v| *v).collect();
            if let ColumnWriter::Int64ColumnWriter(ref mut typed) = col_writer.untyped() {
                typed.write_batch(&data, Some(&def_levels), None)?;
            }
        }
    }
    Ok(())
}

fn build_message_type(schema: &[ColumnSpec], columns: &[Column]) -> SchemaType {
    use parquet::schema::types::Type;

    let fields = schema
        .iter()
        .zip(columns)
        .map(|(spec, column)| {
            let (physical, optional, logical) = match column {
                Column::Bool(_) => (PhysicalType::BOOLEAN, false, None),
                Column::Utf8(_) => (PhysicalType::BYTE_ARRAY, false, Some(parquet::basic::LogicalType::String)),
                Column::OptUtf8(_) => (PhysicalType::BYTE_ARRAY, true, Some(parquet::basic::LogicalType::String)),
                Column::I64(_) => (PhysicalType::INT64, false, None),
                Column::OptI64(_) => (PhysicalType::INT64, true, None),
            };
            let repetition = if optional {
                parquet::basic::Repetition::OPTIONAL
            } else {
                parquet::basic::Repetition::REQUIRED
            };
            let mut builder = Type::primitive_type_builder(spec.name, physical).with_repetition(repetition);
            if let Some(logical) = logical {
                builder = builder.with_logical_type(Some(logical));
            }
            Arc::new(builder.build().expect("valid column schema"))
        })
        .collect();

    Type::group_type_builder("devac_seed_row")
        .with_fields(fields)
        .build()
        .expect("valid message schema")
}

/// Reads a parquet file written by [`write_columnar`] back into one
/// `Option<String>` projection per schema column (callers know their own
/// column types and convert back with the usual `FromStr`/bool parses).
/// Returns all-empty columns (never an error) if `path` is absent — a
/// missing seed table is a validation *warning*, not a hard failure
/// (spec §4.1).
pub fn read_columnar_raw(path: &Path, schema: &[ColumnSpec]) -> Result<Vec<Vec<Option<String>>>> {
    if !path.exists() {
        return Ok(schema.iter().map(|_| Vec::new()).collect());
    }

    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let parquet_schema = reader.metadata().file_metadata().schema_descr_ptr();
    let mut columns: Vec<Vec<Option<String>>> = schema.iter().map(|_| Vec::new()).collect();

    for row in reader.get_row_iter(None)? {
        let row = row?;
        for (idx, column) in columns.iter_mut().enumerate() {
            let value = match row.get_column_iter().nth(idx).map(|(_, f)| ((), f.clone())) {
                Some((_, Field::Null)) | None => None,
                Some((_, Field::Bool(b))) => Some(b.to_string()),
                Some((_, Field::Long(v))) => Some(v.to_string()),
                Some((_, Field::Int(v))) => Some(v.to_string()),
                _ => match parquet_schema.column(idx).physical_type() {
                    PhysicalType::BOOLEAN => Some(row.get_bool(idx)?.to_string()),
                    PhysicalType::INT64 | PhysicalType::INT32 => Some(row.get_long(idx)?.to_string()),
                    _ => Some(row.get_string(idx)?.clone()),
                },
            };
            column.push(value);
        }
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        let schema = [
            ColumnSpec { name: "id" },
            ColumnSpec { name: "flag" },
            ColumnSpec { name: "note" },
        ];
        let columns = vec![
            Column::Utf8(vec!["a".into(), "b".into()]),
            Column::Bool(vec![true, false]),
            Column::OptUtf8(vec![Some("x".into()), None]),
        ];
        write_columnar(&path, &schema, &columns).unwrap();

        let raw = read_columnar_raw(&path, &schema).unwrap();
        assert_eq!(raw[0], vec![Some("a".to_string()), Some("b".to_string())]);
        assert_eq!(raw[1], vec![Some("true".to_string()), Some("false".to_string())]);
        assert_eq!(raw[2], vec![Some("x".to_string()), None]);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.parquet");
        let schema = [ColumnSpec { name: "id" }];
        let raw = read_columnar_raw(&path, &schema).unwrap();
        assert_eq!(raw, vec![Vec::<Option<String>>::new()]);
    }
}
