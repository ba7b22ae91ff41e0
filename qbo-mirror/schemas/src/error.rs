use thiserror::Error;

use crate::column_types::{ColumnType, NullPolicy};

/// A descriptor that cannot be executed as written.
///
/// Raised when a descriptor is validated and when a source path cannot be
/// traversed uniformly across the fetched records. Both require the descriptor
/// author to fix the descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("entity name must not be empty")]
    EmptyEntity,

    #[error("invalid source path '{path}': paths are dot-delimited keys without empty segments")]
    InvalidPath { path: String },

    #[error("invalid column name '{name}': target columns must be snake_case identifiers")]
    InvalidColumnName { name: String },

    #[error("invalid table name '{name}': expected '<schema>.<table>' or '<table>'")]
    InvalidTableName { name: String },

    #[error("column '{column}' is produced more than once")]
    DuplicateColumn { column: String },

    #[error("explode path '{path}' is consumed by the explosion and cannot also be projected")]
    ExplodePathProjected { path: String },

    #[error("explode_column_map is set but explode_path is missing")]
    ExplodeColumnsWithoutPath,

    #[error("explode_path '{path}' is set but explode_column_map is empty")]
    ExplodePathWithoutColumns { path: String },

    #[error("column '{column}' is produced by the projection but missing from the warehouse DDL")]
    MissingFromDdl { column: String },

    #[error("warehouse DDL column '{column}' is not produced by the projection")]
    NotProduced { column: String },

    #[error("column '{column}' has no declared type")]
    MissingType { column: String },

    #[error("'{column}' is typed or null-filled but is not a warehouse DDL column")]
    UnknownColumn { column: String },

    #[error("null policy {policy:?} cannot be applied to column '{column}' of type {column_type}")]
    IncompatibleNullPolicy {
        column: String,
        column_type: ColumnType,
        policy: NullPolicy,
    },

    #[error("column '{column}' of type {column_type} cannot be loaded into a {sql_type} staging column")]
    WarehouseTypeMismatch {
        column: String,
        column_type: ColumnType,
        sql_type: String,
    },

    #[error("staging table and target table are both '{table}'")]
    StagingIsTarget { table: String },

    #[error("datasets '{first}' and '{second}' share the {resource} '{value}'")]
    SharedResource {
        first: String,
        second: String,
        resource: &'static str,
        value: String,
    },

    #[error("cannot traverse '{path}': '{segment}' holds {found}, expected an object")]
    Untraversable {
        path: String,
        segment: String,
        found: &'static str,
    },
}
