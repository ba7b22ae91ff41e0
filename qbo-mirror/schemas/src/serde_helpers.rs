//! Shared serde helper functions for deserialization and default values.

use crate::descriptor::ColumnMapping;
use serde::{Deserialize, Deserializer};

/// Default catalog version
pub fn current_version() -> String {
    "v1".to_string()
}

/// Custom deserializer for column mappings that handles both tuple and object formats
pub fn deserialize_mappings<'de, D>(deserializer: D) -> Result<Vec<ColumnMapping>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Mapping {
        Tuple(String, String), // (source, target)
        Object {
            #[serde(alias = "path")]
            source: String,
            #[serde(alias = "column")]
            target: String,
        },
    }

    let mappings: Vec<Mapping> = Vec::deserialize(deserializer)?;

    Ok(mappings
        .into_iter()
        .map(|mapping| match mapping {
            Mapping::Tuple(source, target) | Mapping::Object { source, target } => {
                ColumnMapping { source, target }
            }
        })
        .collect())
}
