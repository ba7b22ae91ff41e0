//! # qbo-mirror schemas
//!
//! Descriptor definitions and configuration types shared by the ingestion
//! engine, the ODBC warehouse adapter and the CLI.

use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod column_types;
pub mod descriptor;
pub mod error;
pub mod location;
pub mod progress;

mod serde_helpers;

pub use column_types::{CoerceErrorPolicy, ColumnType, NullPolicy, ReplaceStrategy};
pub use descriptor::{ColumnMapping, Descriptor, WarehouseColumn, WarehouseSpec};
pub use descriptor::{
    ColumnMappingBuilder, DescriptorBuilder, WarehouseColumnBuilder, WarehouseSpecBuilder,
};
pub use error::SchemaError;
pub use location::Location;
pub use progress::{Phase, ProgressEvent};

use serde_helpers::current_version;

/// A set of dataset descriptors ingested together.
///
/// # Examples
///
/// ```
/// use qbo_mirror_schemas::Catalog;
///
/// let catalog: Catalog = serde_json::from_str(r#"{ "datasets": [] }"#).unwrap();
/// assert_eq!(catalog.version, "v1");
/// assert!(catalog.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct Catalog {
    /// Schema version for migration compatibility
    #[serde(default = "current_version")]
    #[builder(default = current_version())]
    pub version: String,

    /// Dataset descriptors, each one mirrored into its own warehouse table
    pub datasets: Vec<Descriptor>,
}

impl Catalog {
    /// Look a dataset up by entity name or target table, case-insensitive
    pub fn dataset(&self, name: &str) -> Option<&Descriptor> {
        self.datasets.iter().find(|descriptor| {
            descriptor.entity_name.eq_ignore_ascii_case(name)
                || descriptor.warehouse.target_table.eq_ignore_ascii_case(name)
        })
    }

    /// Validate every descriptor and make sure no two datasets share a staging table,
    /// a target table or an object path
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut staging: HashMap<String, &str> = HashMap::new();
        let mut target: HashMap<String, &str> = HashMap::new();
        let mut objects: HashMap<String, &str> = HashMap::new();

        for descriptor in &self.datasets {
            descriptor.validate()?;

            let name = descriptor.name();
            for (seen, resource, value) in [
                (
                    &mut staging,
                    "staging table",
                    descriptor.warehouse.staging_table.to_ascii_lowercase(),
                ),
                (
                    &mut target,
                    "target table",
                    descriptor.warehouse.target_table.to_ascii_lowercase(),
                ),
                (&mut objects, "object path", descriptor.object_path.to_string()),
            ] {
                if let Some(first) = seen.insert(value.clone(), name) {
                    return Err(SchemaError::SharedResource {
                        first: first.to_string(),
                        second: name.to_string(),
                        resource,
                        value,
                    });
                }
            }
        }

        Ok(())
    }
}
