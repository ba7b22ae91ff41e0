//! Projection and explosion of nested records into flat rows.
//!
//! Projection plucks dot-delimited paths out of every record, explosion emits one
//! row per element of the array at `explode_path` and projects each element with
//! `explode_column_map`. Column names come verbatim from the descriptor.

use qbo_mirror_schemas::{ColumnMapping, Descriptor, SchemaError};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Untyped rows in produced-column order: projection targets, then exploded targets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

/// Resolve a dot-delimited path inside `value`.
///
/// A missing key or a null on the way yields `None`. Walking into anything that is
/// neither an object nor null is an error, the descriptor does not match the data.
pub fn lookup<'a>(value: &'a Value, path: &str) -> std::result::Result<Option<&'a Value>, SchemaError> {
    let mut current = value;
    let mut walked = "<record>";

    for (offset, segment) in path_segments(path) {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Ok(None),
            },
            Value::Null => return Ok(None),
            other => {
                return Err(SchemaError::Untraversable {
                    path: path.to_string(),
                    segment: walked.to_string(),
                    found: json_type(other),
                })
            }
        };
        walked = &path[..offset + segment.len()];
    }

    Ok(match current {
        Value::Null => None,
        value => Some(value),
    })
}

fn path_segments(path: &str) -> impl Iterator<Item = (usize, &str)> {
    path.split('.').scan(0, |offset, segment| {
        let start = *offset;
        *offset += segment.len() + 1;
        Some((start, segment))
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn project(
    value: &Value,
    mappings: &[ColumnMapping],
    row: &mut Vec<Value>,
) -> std::result::Result<(), SchemaError> {
    for mapping in mappings {
        let cell = lookup(value, &mapping.source)?.cloned().unwrap_or(Value::Null);
        row.push(cell);
    }

    Ok(())
}

/// Flatten fetched records according to `descriptor`.
///
/// Every record yields at least one row. With an explode path, a record yields one
/// row per array element, or a single row with null exploded columns when the
/// array is empty, null, missing or not an array.
#[instrument(skip_all, fields(entity = %descriptor.entity_name, records = records.len()))]
pub fn flatten(records: &[Value], descriptor: &Descriptor) -> Result<RawTable> {
    let schema_error = |source: SchemaError| Error::Schema {
        entity: descriptor.entity_name.clone(),
        source,
    };

    let columns = descriptor
        .produced_columns()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let width = columns.len();

    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let mut base = Vec::with_capacity(width);
        project(record, &descriptor.projection, &mut base).map_err(schema_error)?;

        let Some(explode_path) = &descriptor.explode_path else {
            rows.push(base);
            continue;
        };

        let elements: &[Value] = match lookup(record, explode_path).map_err(schema_error)? {
            Some(Value::Array(elements)) => elements.as_slice(),
            _ => &[],
        };

        if elements.is_empty() {
            let mut row = base;
            row.resize(width, Value::Null);
            rows.push(row);
            continue;
        }

        for element in elements {
            let mut row = base.clone();
            project(element, &descriptor.explode_column_map, &mut row).map_err(schema_error)?;
            rows.push(row);
        }
    }

    debug!(rows = rows.len(), "flattened records");

    Ok(RawTable { columns, rows })
}
