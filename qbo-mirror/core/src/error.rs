use miette::Diagnostic;
use qbo_mirror_schemas::{ColumnType, Phase, SchemaError};

use crate::{config::ConfigError, loader::LoadStage, templating::TemplateError};

pub type Result<T> = core::result::Result<T, Error>;

/// Every way an ingestion run can fail
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("credentials unavailable: {0}")]
    #[diagnostic(
        code(qbo_mirror::credentials),
        help("Refresh the access token and make sure CURR_AUTH_TOKEN and REALM_ID are set")
    )]
    Credential(String),

    #[error("request for {entity} at position {position} failed: {source}")]
    #[diagnostic(code(qbo_mirror::transport))]
    Transport {
        entity: String,
        position: usize,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream returned {status} for {entity} at position {position}: {body}")]
    #[diagnostic(code(qbo_mirror::upstream))]
    Upstream {
        status: u16,
        body: String,
        entity: String,
        position: usize,
    },

    #[error("descriptor for {entity} is invalid: {source}")]
    #[diagnostic(code(qbo_mirror::schema))]
    Schema {
        entity: String,
        #[source]
        source: SchemaError,
    },

    #[error("cannot coerce {raw} into {expected} for column '{column}' at row {row_index}")]
    #[diagnostic(
        code(qbo_mirror::coercion),
        help("Set on_coerce_error to 'skip' or 'null' to isolate bad rows")
    )]
    Coercion {
        column: String,
        row_index: usize,
        raw: String,
        expected: ColumnType,
    },

    #[error(transparent)]
    #[diagnostic(code(qbo_mirror::object_store))]
    ObjectStore(#[from] object_store::Error),

    #[error("no object store supports '{scheme}' locations")]
    #[diagnostic(
        code(qbo_mirror::unsupported_location),
        help("Use a file://, memory:// or s3:// object path, s3 requires the 's3' feature")
    )]
    UnsupportedLocation { scheme: String },

    #[error("columnar file is {size} bytes, above the single-put limit of {limit} bytes")]
    #[diagnostic(code(qbo_mirror::object_too_large))]
    ObjectTooLarge { size: usize, limit: usize },

    #[error("failed to encode columnar file: {0}")]
    #[diagnostic(code(qbo_mirror::encode))]
    Encode(String),

    #[error("warehouse statement failed during {stage}: {cause}")]
    #[diagnostic(code(qbo_mirror::warehouse))]
    Warehouse {
        stage: LoadStage,
        sql: String,
        cause: String,
    },

    #[error("staging table {table} already exists")]
    #[diagnostic(
        code(qbo_mirror::staging_collision),
        help("Another run may be in progress. Drop the table manually once it is safe to do so")
    )]
    StagingCollision { table: String },

    #[error("cancelled during {phase}")]
    #[diagnostic(code(qbo_mirror::cancelled))]
    Cancelled { phase: Phase },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(Box<TemplateError>),

    #[error(transparent)]
    #[diagnostic(code(qbo_mirror::config))]
    Config(#[from] ConfigError),
}

impl From<TemplateError> for Error {
    fn from(error: TemplateError) -> Self {
        Error::Template(Box::new(error))
    }
}

impl From<datafusion::arrow::error::ArrowError> for Error {
    fn from(error: datafusion::arrow::error::ArrowError) -> Self {
        Error::Encode(error.to_string())
    }
}

impl From<datafusion::parquet::errors::ParquetError> for Error {
    fn from(error: datafusion::parquet::errors::ParquetError) -> Self {
        Error::Encode(error.to_string())
    }
}

impl Error {
    /// Phase an error is attributed to when it is not raised in a known context
    pub fn phase(&self) -> Phase {
        match self {
            Error::Credential(_) => Phase::Credentials,
            Error::Transport { .. } | Error::Upstream { .. } => Phase::Fetch,
            Error::Schema { .. } | Error::Template(_) | Error::Config(_) => Phase::Flatten,
            Error::Coercion { .. } => Phase::Coerce,
            Error::ObjectStore(_)
            | Error::UnsupportedLocation { .. }
            | Error::ObjectTooLarge { .. }
            | Error::Encode(_) => Phase::Write,
            Error::Warehouse { .. } | Error::StagingCollision { .. } => Phase::Load,
            Error::Cancelled { phase } => *phase,
        }
    }
}
