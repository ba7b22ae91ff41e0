//! Semantic column types and the per-column policies that drive coercion.
//!
//! Temporal columns travel as strings and are converted by the warehouse `cast`
//! expression.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type of a target column.
///
/// # Examples
///
/// ```
/// use qbo_mirror_schemas::ColumnType;
/// use std::str::FromStr;
///
/// assert_eq!(ColumnType::from_str("int32").unwrap(), ColumnType::Int32);
/// assert_eq!(ColumnType::from_str("double").unwrap(), ColumnType::Float64);
/// assert_eq!(ColumnType::Timestamp.to_string(), "timestamp");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "schema_gen", schemars(rename_all = "lowercase"))]
pub enum ColumnType {
    String,
    Int32,
    Int64,
    Float64,
    Boolean,
    Date,
    Timestamp,
}

impl ColumnType {
    /// Null handling applied when a descriptor does not declare one for the column
    pub fn default_null_policy(&self) -> NullPolicy {
        match self {
            ColumnType::String => NullPolicy::FillEmptyString,
            ColumnType::Int32 | ColumnType::Int64 | ColumnType::Float64 => NullPolicy::FillZero,
            ColumnType::Boolean | ColumnType::Date | ColumnType::Timestamp => NullPolicy::KeepNull,
        }
    }

    /// Whether values of this type are transported as strings in the columnar file
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            ColumnType::String | ColumnType::Date | ColumnType::Timestamp
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Int32 | ColumnType::Int64 | ColumnType::Float64
        )
    }

    /// Whether `policy` can be applied to this type at all
    pub fn accepts_null_policy(&self, policy: NullPolicy) -> bool {
        match policy {
            NullPolicy::KeepNull => true,
            NullPolicy::FillZero => !matches!(self, ColumnType::Date | ColumnType::Timestamp),
            NullPolicy::FillEmptyString => self.is_string_like(),
        }
    }

    /// Whether a staging column declared as `sql_type` can receive this type from the
    /// columnar file. Length arguments are ignored, `VARCHAR(255)` matches `VARCHAR`.
    pub fn accepts_sql_type(&self, sql_type: &str) -> bool {
        let base = sql_type.split('(').next().unwrap_or_default();
        let base = base
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        match self {
            ColumnType::String | ColumnType::Date | ColumnType::Timestamp => matches!(
                base.as_str(),
                "VARCHAR" | "CHARACTER VARYING" | "NVARCHAR" | "TEXT"
            ),
            ColumnType::Int32 => matches!(base.as_str(), "INT" | "INTEGER" | "INT4"),
            ColumnType::Int64 => matches!(base.as_str(), "BIGINT" | "INT8"),
            ColumnType::Float64 => matches!(base.as_str(), "DOUBLE PRECISION" | "FLOAT8" | "FLOAT"),
            ColumnType::Boolean => matches!(base.as_str(), "BOOLEAN" | "BOOL"),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
        };

        write!(f, "{name}")
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "utf8" | "str" => Ok(ColumnType::String),
            "int32" | "int" | "integer" => Ok(ColumnType::Int32),
            "int64" | "long" | "bigint" => Ok(ColumnType::Int64),
            "float64" | "double" | "float" => Ok(ColumnType::Float64),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            "timestamp" | "datetime" => Ok(ColumnType::Timestamp),
            other => Err(format!("unknown column type '{other}'")),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ColumnType::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// What to store when a column's source value is missing or null
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum NullPolicy {
    /// Replace with `0` (numeric), `false` (boolean) or `"0"` (string)
    #[serde(alias = "fill_zero")]
    FillZero,
    /// Replace with `""`
    #[serde(alias = "fill_empty_string")]
    FillEmptyString,
    /// Keep the null, the warehouse column must be nullable
    #[serde(alias = "keep_null")]
    KeepNull,
}

/// How the engine reacts to a value that cannot be coerced into its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum CoerceErrorPolicy {
    /// Drop the offending row and keep going
    Skip,
    /// Replace the offending value as if it were null
    Null,
    /// Abort the ingestion
    #[default]
    Fail,
}

impl fmt::Display for CoerceErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoerceErrorPolicy::Skip => write!(f, "skip"),
            CoerceErrorPolicy::Null => write!(f, "null"),
            CoerceErrorPolicy::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for CoerceErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(CoerceErrorPolicy::Skip),
            "null" => Ok(CoerceErrorPolicy::Null),
            "fail" => Ok(CoerceErrorPolicy::Fail),
            other => Err(format!(
                "unknown coercion error policy '{other}', expected one of skip, null, fail"
            )),
        }
    }
}

/// How the target table is emptied before the staged rows are inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum ReplaceStrategy {
    /// `TRUNCATE` followed by `INSERT` inside one transaction.
    /// Redshift commits `TRUNCATE` implicitly, which leaves the target visibly empty until the insert commits.
    #[default]
    Truncate,
    /// `DELETE FROM` followed by `INSERT` inside one transaction, atomic on Redshift
    Delete,
}

impl FromStr for ReplaceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(ReplaceStrategy::Truncate),
            "delete" => Ok(ReplaceStrategy::Delete),
            other => Err(format!(
                "unknown replace strategy '{other}', expected truncate or delete"
            )),
        }
    }
}
