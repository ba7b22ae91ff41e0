//! Dataset descriptors.
//!
//! A descriptor is everything the engine needs to know about one entity: which
//! JSON paths to pluck, which array to explode, how the resulting columns are
//! typed and how they land in the warehouse.

use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::column_types::{CoerceErrorPolicy, ColumnType, NullPolicy, ReplaceStrategy};
use crate::error::SchemaError;
use crate::location::Location;
use crate::serde_helpers::deserialize_mappings;

/// Maps a dot-delimited source path to a target column name
///
/// ```
/// use qbo_mirror_schemas::ColumnMapping;
///
/// let mapping = ColumnMapping::new("VendorRef.value", "vendor_ref_value");
/// assert_eq!(mapping.segments().collect::<Vec<_>>(), vec!["VendorRef", "value"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct ColumnMapping {
    /// Dot-delimited path into the source record, e.g. `CheckPayment.BankAccountRef.value`
    #[serde(alias = "path")]
    pub source: String,

    /// Target column name, snake_case
    #[serde(alias = "column")]
    pub target: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.source.split('.')
    }
}

/// A column of the warehouse table, in DDL order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct WarehouseColumn {
    /// Column name, identical in the staging table and the target table
    pub name: String,

    /// Warehouse type used in the staging table DDL, e.g. `VARCHAR(255)` or `DOUBLE PRECISION`
    #[serde(alias = "type")]
    pub sql_type: String,

    /// SQL expression selecting this column from the staging table in the final insert,
    /// e.g. `TO_DATE(txn_date, 'YYYY-MM-DD')`. Defaults to the bare column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
}

impl WarehouseColumn {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            cast: None,
        }
    }

    pub fn with_cast(mut self, cast: impl Into<String>) -> Self {
        self.cast = Some(cast.into());
        self
    }

    /// Expression used in the `INSERT … SELECT` list
    pub fn cast_expression(&self) -> String {
        match &self.cast {
            Some(cast) => format!("{cast} AS {}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Warehouse side of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct WarehouseSpec {
    /// Ephemeral table the columnar file is copied into, e.g. `finance.temp_qb_bills`
    pub staging_table: String,

    /// Read-visible mirror table, e.g. `finance.qb_bills`
    pub target_table: String,

    /// Ordered column list. This order is the column order of the columnar file.
    #[serde(alias = "target_ddl")]
    pub columns: Vec<WarehouseColumn>,
}

impl WarehouseSpec {
    /// Column definitions for `CREATE TABLE <staging> ( … )`
    pub fn target_ddl(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("{} {}", column.name, column.sql_type))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Per-column select expressions for `INSERT INTO <target> SELECT … FROM <staging>`
    pub fn cast_expressions(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(WarehouseColumn::cast_expression)
            .collect()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }
}

/// Declarative description of one ingestion target.
///
/// # Examples
///
/// ```
/// use qbo_mirror_schemas::*;
/// use std::collections::BTreeMap;
///
/// let descriptor = Descriptor::builder()
///     .entity_name("Deposit".to_string())
///     .projection(vec![
///         ColumnMapping::new("Id", "id"),
///         ColumnMapping::new("TotalAmt", "total_amt"),
///     ])
///     .column_types(BTreeMap::from([
///         ("id".to_string(), ColumnType::Int32),
///         ("total_amt".to_string(), ColumnType::Float64),
///     ]))
///     .warehouse(WarehouseSpec {
///         staging_table: "finance.temp_qb_deposit".to_string(),
///         target_table: "finance.qb_deposit".to_string(),
///         columns: vec![
///             WarehouseColumn::new("id", "INT"),
///             WarehouseColumn::new("total_amt", "DOUBLE PRECISION"),
///         ],
///     })
///     .object_path("s3://datalake/qb/qb_deposit.parquet".try_into().unwrap())
///     .build();
///
/// assert!(descriptor.validate().is_ok());
/// assert_eq!(descriptor.column_order(), vec!["id", "total_amt"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct Descriptor {
    /// Entity name, used as the query's `FROM` clause and as the key under `QueryResponse`
    #[serde(alias = "entity")]
    pub entity_name: String,

    /// Ordered source path to target column mappings
    #[serde(deserialize_with = "deserialize_mappings")]
    pub projection: Vec<ColumnMapping>,

    /// Source path of an array to explode into one row per element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode_path: Option<String>,

    /// Mappings applied to each exploded element
    #[serde(
        default,
        alias = "explode_columns",
        deserialize_with = "deserialize_mappings",
        skip_serializing_if = "Vec::is_empty"
    )]
    #[builder(default)]
    pub explode_column_map: Vec<ColumnMapping>,

    /// Declared semantic type of every target column
    pub column_types: BTreeMap<String, ColumnType>,

    /// Null handling per column, defaults depend on the column type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[builder(default)]
    pub null_policy: BTreeMap<String, NullPolicy>,

    /// Overrides the engine-wide reaction to coercion failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_coerce_error: Option<CoerceErrorPolicy>,

    /// Overrides the engine-wide target replacement statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_strategy: Option<ReplaceStrategy>,

    /// Warehouse tables and DDL
    pub warehouse: WarehouseSpec,

    /// Object-store path the columnar file is written to
    #[serde(alias = "location")]
    pub object_path: Location,
}

impl Descriptor {
    pub fn name(&self) -> &str {
        &self.entity_name
    }

    /// Final column order, identical to the warehouse DDL order
    pub fn column_order(&self) -> Vec<&str> {
        self.warehouse.column_names().collect()
    }

    /// Columns in the order the flattener produces them: projection targets, then exploded targets
    pub fn produced_columns(&self) -> Vec<&str> {
        self.projection
            .iter()
            .chain(self.explode_column_map.iter())
            .map(|mapping| mapping.target.as_str())
            .collect()
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.column_types.get(column).copied()
    }

    /// Declared null policy, falling back to the type default
    pub fn null_policy_for(&self, column: &str) -> NullPolicy {
        match (self.null_policy.get(column), self.column_type(column)) {
            (Some(policy), _) => *policy,
            (None, Some(tpe)) => tpe.default_null_policy(),
            (None, None) => NullPolicy::KeepNull,
        }
    }

    /// Check the descriptor is internally consistent.
    ///
    /// Guarantees on success: every produced column is a DDL column and vice versa,
    /// every DDL column is typed, its staging type fits the columnar type and every
    /// null policy fits its column type.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.entity_name.trim().is_empty() {
            return Err(SchemaError::EmptyEntity);
        }

        for mapping in self.projection.iter().chain(&self.explode_column_map) {
            validate_path(&mapping.source)?;
            validate_column_name(&mapping.target)?;
        }

        match (&self.explode_path, self.explode_column_map.is_empty()) {
            (Some(path), true) => {
                return Err(SchemaError::ExplodePathWithoutColumns { path: path.clone() })
            }
            (None, false) => return Err(SchemaError::ExplodeColumnsWithoutPath),
            (Some(path), false) => {
                validate_path(path)?;
                if self.projection.iter().any(|mapping| &mapping.source == path) {
                    return Err(SchemaError::ExplodePathProjected { path: path.clone() });
                }
            }
            (None, true) => {}
        }

        let mut produced = HashSet::new();
        for column in self.produced_columns() {
            if !produced.insert(column) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.to_string(),
                });
            }
        }

        let mut ddl = HashSet::new();
        for column in self.warehouse.column_names() {
            validate_column_name(column)?;
            if !ddl.insert(column) {
                return Err(SchemaError::DuplicateColumn {
                    column: column.to_string(),
                });
            }
        }

        if let Some(column) = self.produced_columns().into_iter().find(|c| !ddl.contains(c)) {
            return Err(SchemaError::MissingFromDdl {
                column: column.to_string(),
            });
        }

        if let Some(column) = self.column_order().into_iter().find(|c| !produced.contains(c)) {
            return Err(SchemaError::NotProduced {
                column: column.to_string(),
            });
        }

        for ddl_column in &self.warehouse.columns {
            let column = ddl_column.name.as_str();
            let column_type = self
                .column_type(column)
                .ok_or_else(|| SchemaError::MissingType {
                    column: column.to_string(),
                })?;

            if !column_type.accepts_sql_type(&ddl_column.sql_type) {
                return Err(SchemaError::WarehouseTypeMismatch {
                    column: column.to_string(),
                    column_type,
                    sql_type: ddl_column.sql_type.clone(),
                });
            }

            let policy = self.null_policy_for(column);
            if !column_type.accepts_null_policy(policy) {
                return Err(SchemaError::IncompatibleNullPolicy {
                    column: column.to_string(),
                    column_type,
                    policy,
                });
            }
        }

        if let Some(column) = self
            .column_types
            .keys()
            .chain(self.null_policy.keys())
            .find(|column| !ddl.contains(column.as_str()))
        {
            return Err(SchemaError::UnknownColumn {
                column: column.clone(),
            });
        }

        validate_table_name(&self.warehouse.staging_table)?;
        validate_table_name(&self.warehouse.target_table)?;
        if self
            .warehouse
            .staging_table
            .eq_ignore_ascii_case(&self.warehouse.target_table)
        {
            return Err(SchemaError::StagingIsTarget {
                table: self.warehouse.target_table.clone(),
            });
        }

        Ok(())
    }
}

fn validate_path(path: &str) -> Result<(), SchemaError> {
    if path.is_empty() || path.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(SchemaError::InvalidPath {
            path: path.to_string(),
        });
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_column_name(name: &str) -> Result<(), SchemaError> {
    if !is_identifier(name) || name.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(SchemaError::InvalidColumnName {
            name: name.to_string(),
        });
    }

    Ok(())
}

fn validate_table_name(name: &str) -> Result<(), SchemaError> {
    let parts = name.split('.').collect::<Vec<_>>();
    if parts.is_empty() || parts.len() > 2 || !parts.iter().all(|part| is_identifier(part)) {
        return Err(SchemaError::InvalidTableName {
            name: name.to_string(),
        });
    }

    Ok(())
}
