//! # qbo-mirror core
//!
//! Descriptor-driven ingestion of QuickBooks Online entities into Redshift.
//!
//! One run of a [`Descriptor`] fetches every record of the entity page by page,
//! flattens and explodes the nested JSON into rows, coerces the declared column
//! types, writes a single Parquet object and swaps it into the target table
//! through a staging table.
//!
//! ```rust,no_run
//! use qbo_mirror_core::prelude::*;
//! use std::{collections::HashMap, sync::Arc};
//!
//! # struct MyWarehouse;
//! # #[async_trait::async_trait]
//! # impl Warehouse for MyWarehouse {
//! #     async fn table_exists(&self, _: &str) -> Result<bool, StatementError> { Ok(false) }
//! #     async fn execute(&self, _: &str) -> Result<(), StatementError> { Ok(()) }
//! #     async fn execute_transaction(&self, _: &[String]) -> Result<(), StatementError> { Ok(()) }
//! # }
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = HashMap::from([
//!         ("bucket".to_string(), "datalake".to_string()),
//!         ("prefix".to_string(), "to_redshift".to_string()),
//!         ("schema".to_string(), "finance".to_string()),
//!     ]);
//!     let catalog = Catalog::from_file("descriptors/quickbooks.yml", TemplateFormat::Yaml, params)?;
//!
//!     let config = EngineConfig::builder()
//!         .copy_iam_role("arn:aws:iam::123456789012:role/redshift-copy")
//!         .build()?;
//!     let credentials = Arc::new(StaticCredentials::new("<access token>", "<realm id>"));
//!
//!     let engine = IngestionEngine::builder()
//!         .source(Arc::new(QueryClient::try_new(&config, credentials)?))
//!         .warehouse(Arc::new(MyWarehouse))
//!         .tracker(Arc::new(LoggingProgressTracker))
//!         .config(config)
//!         .build();
//!
//!     for report in engine.run_many(&catalog.datasets, 2, Default::default()).await {
//!         println!("{}: {} rows", report.dataset, report.rows_written);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod coerce;
pub mod columnar;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod progress_tracker;
pub mod store;
pub mod templating;

#[cfg(feature = "odbc")]
pub mod odbc;

pub use config::EngineConfig;
pub use engine::{IngestionEngine, Outcome, Report};
pub use error::{Error, Result};
pub use qbo_mirror_schemas::{Catalog, Descriptor};

/// Prelude to import everything needed to build and run an engine
pub mod prelude {
    pub use crate::client::{QueryClient, RecordSource};
    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::credentials::{CredentialProvider, Credentials, StaticCredentials};
    pub use crate::engine::{IngestionEngine, Outcome, Report};
    pub use crate::error::Error;
    pub use crate::loader::{LoadStage, StatementError, Warehouse};
    pub use crate::progress_tracker::{LoggingProgressTracker, ProgressTracker};
    pub use crate::templating::{format_from_path, TemplateError, TemplateFormat, TemplateLoader};

    #[cfg(feature = "odbc")]
    pub use crate::odbc::{OdbcWarehouse, RedshiftConnection};

    pub use qbo_mirror_schemas::{
        Catalog, CoerceErrorPolicy, ColumnType, Descriptor, NullPolicy, Phase, ProgressEvent,
        ReplaceStrategy,
    };
}
