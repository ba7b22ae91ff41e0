//! Object-store location of a dataset's columnar file

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use url::Url;

/// A location that can be either a local file path or an object-store URL
///
/// Local paths are converted to `file://` URLs during deserialization so that
/// descriptors can point at a scratch directory during development.
///
/// # Examples
///
/// ```
/// use qbo_mirror_schemas::Location;
///
/// let s3: Location = "s3://datalake/to_redshift/qb/qb_bills.parquet".try_into().unwrap();
/// assert_eq!(s3.scheme(), "s3");
///
/// let local: Location = "/tmp/qb_bills.parquet".try_into().unwrap();
/// assert_eq!(local.scheme(), "file");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "schema_gen", derive(schemars::JsonSchema))]
#[cfg_attr(
    feature = "schema_gen",
    schemars(
        with = "String",
        description = "Object path of the columnar file. Examples: 's3://bucket/prefix/qb_bills.parquet', '/tmp/qb_bills.parquet'"
    )
)]
pub struct Location(pub Url);

impl Location {
    /// Last path segment, used in log lines
    pub fn file_name(&self) -> &str {
        self.0
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
    }
}

impl TryFrom<&str> for Location {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if let Ok(url) = Url::parse(s) {
            return Ok(Location(url));
        }

        let path = Path::new(s);
        let url = if path.is_absolute() {
            Url::from_file_path(path)
        } else {
            let current_dir = std::env::current_dir()
                .map_err(|e| format!("Cannot get current directory: {e}"))?;
            Url::from_file_path(current_dir.join(path))
        }
        .map_err(|_| format!("Invalid path: {s}"))?;

        Ok(Location(url))
    }
}

impl TryFrom<String> for Location {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Location::try_from(s.as_str())
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Location(url)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Location::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<Url> for Location {
    fn as_ref(&self) -> &Url {
        &self.0
    }
}

impl std::ops::Deref for Location {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
