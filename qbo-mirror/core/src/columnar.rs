//! Parquet serialization of a [`FlatTable`] and its single-put upload

use datafusion::arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray,
};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::basic::Compression;
use datafusion::parquet::file::properties::WriterProperties;
use object_store::{path::Path, ObjectStore, PutPayload};
use qbo_mirror_schemas::{ColumnType, Location};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::coerce::{Cell, FlatTable};
use crate::error::{Error, Result};

/// Arrow type a column travels as, temporal columns stay strings
pub fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::String | ColumnType::Date | ColumnType::Timestamp => DataType::Utf8,
        ColumnType::Int32 => DataType::Int32,
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
    }
}

pub fn arrow_schema(table: &FlatTable) -> SchemaRef {
    let fields = table
        .columns
        .iter()
        .map(|column| Field::new(&column.name, arrow_type(column.column_type), column.nullable))
        .collect::<Vec<_>>();

    Arc::new(Schema::new(fields))
}

fn unexpected(column: &str, cell: &Cell) -> Error {
    Error::Encode(format!("column '{column}' holds unexpected value {cell:?}"))
}

fn column_array(table: &FlatTable, index: usize) -> Result<ArrayRef> {
    let column = &table.columns[index];
    let cells = table.rows.iter().map(|row| row.get(index).unwrap_or(&Cell::Null));

    let array: ArrayRef = match arrow_type(column.column_type) {
        DataType::Int32 => Arc::new(
            cells
                .map(|cell| match cell {
                    Cell::Int32(v) => Ok(Some(*v)),
                    Cell::Null => Ok(None),
                    other => Err(unexpected(&column.name, other)),
                })
                .collect::<Result<Int32Array>>()?,
        ),
        DataType::Int64 => Arc::new(
            cells
                .map(|cell| match cell {
                    Cell::Int64(v) => Ok(Some(*v)),
                    Cell::Null => Ok(None),
                    other => Err(unexpected(&column.name, other)),
                })
                .collect::<Result<Int64Array>>()?,
        ),
        DataType::Float64 => Arc::new(
            cells
                .map(|cell| match cell {
                    Cell::Float64(v) => Ok(Some(*v)),
                    Cell::Null => Ok(None),
                    other => Err(unexpected(&column.name, other)),
                })
                .collect::<Result<Float64Array>>()?,
        ),
        DataType::Boolean => Arc::new(
            cells
                .map(|cell| match cell {
                    Cell::Bool(v) => Ok(Some(*v)),
                    Cell::Null => Ok(None),
                    other => Err(unexpected(&column.name, other)),
                })
                .collect::<Result<BooleanArray>>()?,
        ),
        _ => Arc::new(
            cells
                .map(|cell| match cell {
                    Cell::Str(v) => Ok(Some(v.as_str())),
                    Cell::Null => Ok(None),
                    other => Err(unexpected(&column.name, other)),
                })
                .collect::<Result<StringArray>>()?,
        ),
    };

    Ok(array)
}

/// Build a single record batch with the table's columns in order
pub fn to_record_batch(table: &FlatTable) -> Result<RecordBatch> {
    let schema = arrow_schema(table);
    let arrays = (0..table.columns.len())
        .map(|index| column_array(table, index))
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Encode the table as an in-memory Parquet file
#[instrument(skip_all, fields(rows = table.len()))]
pub fn encode_parquet(table: &FlatTable) -> Result<Vec<u8>> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    debug!(bytes = buffer.len(), "encoded parquet");
    Ok(buffer)
}

/// Object-store path of a location, without scheme and bucket
pub fn object_path(location: &Location) -> Result<Path> {
    Ok(Path::from_url_path(location.path()).map_err(object_store::Error::from)?)
}

/// Upload `bytes` to `location` with a single put, replacing any prior object.
///
/// Fails with [`Error::ObjectTooLarge`] before any request when `bytes` exceeds `limit`.
#[instrument(skip(store, bytes), fields(location = %location, bytes = bytes.len()), err)]
pub async fn put_object(
    store: &dyn ObjectStore,
    location: &Location,
    bytes: Vec<u8>,
    limit: usize,
) -> Result<usize> {
    let size = bytes.len();
    if size > limit {
        return Err(Error::ObjectTooLarge { size, limit });
    }

    let path = object_path(location)?;
    store.put(&path, PutPayload::from(bytes)).await?;

    debug!(%path, size, "uploaded object");
    Ok(size)
}

/// Encode and upload a table, returns the number of bytes written
pub async fn write_table(
    store: &dyn ObjectStore,
    location: &Location,
    table: &FlatTable,
    limit: usize,
) -> Result<usize> {
    let bytes = encode_parquet(table)?;
    put_object(store, location, bytes, limit).await
}
