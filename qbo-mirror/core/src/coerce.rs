//! Enforcement of declared column types and null policies.
//!
//! Output columns follow the warehouse DDL order. Dates and timestamps are
//! validated but stay strings, the warehouse converts them with the descriptor's
//! cast expressions.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use qbo_mirror_schemas::{CoerceErrorPolicy, ColumnType, Descriptor, NullPolicy, SchemaError};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::flatten::RawTable;

/// A typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Str(String),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
}

/// Output column with its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn {
    pub name: String,
    pub column_type: ColumnType,
    /// Only `keep-null` columns may contain nulls
    pub nullable: bool,
}

/// Typed rows in warehouse DDL order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatTable {
    pub columns: Vec<TypedColumn>,
    pub rows: Vec<Vec<Cell>>,
    /// Rows dropped by [`CoerceErrorPolicy::Skip`]
    pub skipped: usize,
}

impl FlatTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}

/// Value that does not fit its declared type, carries the raw text for the error
struct Mismatch(String);

/// Coerce every row of `raw` into the types declared by `descriptor`
#[instrument(skip_all, fields(entity = %descriptor.entity_name, rows = raw.len(), policy = %policy))]
pub fn coerce(raw: &RawTable, descriptor: &Descriptor, policy: CoerceErrorPolicy) -> Result<FlatTable> {
    let schema_error = |source: SchemaError| Error::Schema {
        entity: descriptor.entity_name.clone(),
        source,
    };

    let plan = descriptor
        .column_order()
        .into_iter()
        .map(|name| {
            let index = raw.column_index(name).ok_or_else(|| {
                schema_error(SchemaError::NotProduced {
                    column: name.to_string(),
                })
            })?;
            let column_type = descriptor.column_type(name).ok_or_else(|| {
                schema_error(SchemaError::MissingType {
                    column: name.to_string(),
                })
            })?;
            let null_policy = descriptor.null_policy_for(name);

            Ok((
                index,
                null_policy,
                TypedColumn {
                    name: name.to_string(),
                    column_type,
                    nullable: null_policy == NullPolicy::KeepNull,
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    'rows: for (row_index, raw_row) in raw.rows.iter().enumerate() {
        let mut row = Vec::with_capacity(plan.len());

        for (index, null_policy, column) in &plan {
            let value = raw_row.get(*index).unwrap_or(&Value::Null);

            let cell = match coerce_value(value, column.column_type, *null_policy) {
                Ok(cell) => cell,
                Err(Mismatch(raw)) => match policy {
                    CoerceErrorPolicy::Fail => {
                        return Err(Error::Coercion {
                            column: column.name.clone(),
                            row_index,
                            raw,
                            expected: column.column_type,
                        })
                    }
                    CoerceErrorPolicy::Skip => {
                        warn!(column = %column.name, row_index, raw = %raw, "skipping row");
                        skipped += 1;
                        continue 'rows;
                    }
                    CoerceErrorPolicy::Null => {
                        warn!(column = %column.name, row_index, raw = %raw, "replacing value with null");
                        fill(column.column_type, *null_policy)
                    }
                },
            };

            row.push(cell);
        }

        rows.push(row);
    }

    debug!(rows = rows.len(), skipped, "coerced rows");

    Ok(FlatTable {
        columns: plan.into_iter().map(|(_, _, column)| column).collect(),
        rows,
        skipped,
    })
}

/// Replacement for a missing value
fn fill(column_type: ColumnType, null_policy: NullPolicy) -> Cell {
    match (null_policy, column_type) {
        (NullPolicy::KeepNull, _) => Cell::Null,
        (NullPolicy::FillEmptyString, _) => Cell::Str(String::new()),
        (NullPolicy::FillZero, ColumnType::Int32) => Cell::Int32(0),
        (NullPolicy::FillZero, ColumnType::Int64) => Cell::Int64(0),
        (NullPolicy::FillZero, ColumnType::Float64) => Cell::Float64(0.0),
        (NullPolicy::FillZero, ColumnType::Boolean) => Cell::Bool(false),
        (NullPolicy::FillZero, _) => Cell::Str("0".to_string()),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_value(
    value: &Value,
    column_type: ColumnType,
    null_policy: NullPolicy,
) -> std::result::Result<Cell, Mismatch> {
    if value.is_null() {
        return Ok(fill(column_type, null_policy));
    }

    let mismatch = || Mismatch(raw_text(value));

    match column_type {
        ColumnType::String => Ok(Cell::Str(raw_text(value))),
        ColumnType::Int32 => match as_integer(value).map(i32::try_from) {
            Some(Ok(int)) => Ok(Cell::Int32(int)),
            Some(Err(_)) => Err(mismatch()),
            None if zero_fills(value, null_policy) => Ok(Cell::Int32(0)),
            None => Err(mismatch()),
        },
        ColumnType::Int64 => match as_integer(value) {
            Some(int) => Ok(Cell::Int64(int)),
            None if zero_fills(value, null_policy) => Ok(Cell::Int64(0)),
            None => Err(mismatch()),
        },
        ColumnType::Float64 => as_float(value).map(Cell::Float64).ok_or_else(mismatch),
        ColumnType::Boolean => match value {
            Value::Bool(b) => Ok(Cell::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Cell::Bool(true)),
            Value::String(s) if s == "false" => Ok(Cell::Bool(false)),
            _ => Err(mismatch()),
        },
        ColumnType::Date => match value {
            Value::String(s) if is_date(s) => Ok(Cell::Str(s.clone())),
            _ => Err(mismatch()),
        },
        ColumnType::Timestamp => match value {
            Value::String(s) if is_timestamp(s) => Ok(Cell::Str(s.clone())),
            _ => Err(mismatch()),
        },
    }
}

/// Non-numeric values of a `fill-zero` integer column become 0. Fractional or
/// out-of-range numbers are still mismatches.
fn zero_fills(value: &Value, null_policy: NullPolicy) -> bool {
    null_policy == NullPolicy::FillZero && as_float(value).is_none()
}

fn as_float(value: &Value) -> Option<f64> {
    let float = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    float.is_finite().then_some(float)
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value {
        if let Some(int) = n.as_i64() {
            return Some(int);
        }
    }

    if let Value::String(s) = value {
        if let Ok(int) = s.trim().parse::<i64>() {
            return Some(int);
        }
    }

    // integral floats such as 12.0 or "12.0"
    as_float(value)
        .filter(|float| float.fract() == 0.0 && *float >= i64::MIN as f64 && *float < i64::MAX as f64)
        .map(|float| float as i64)
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_timestamp(s: &str) -> bool {
    is_date(s)
        || DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
}
