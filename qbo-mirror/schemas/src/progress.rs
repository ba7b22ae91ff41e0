//! Progress event types for tracking dataset ingestion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ingestion phase of a single dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Credentials,
    Fetch,
    Flatten,
    Coerce,
    Write,
    Load,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Credentials => "credentials",
            Phase::Fetch => "fetch",
            Phase::Flatten => "flatten",
            Phase::Coerce => "coerce",
            Phase::Write => "write",
            Phase::Load => "load",
        };

        write!(f, "{name}")
    }
}

/// Progress events emitted during an ingestion run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Ingestion of a dataset started
    Started {
        /// Entity name of the dataset
        dataset: String,
    },
    /// A page of records has been received
    PageFetched {
        dataset: String,
        /// 1-based start position of the page
        start_position: usize,
        /// Number of records in the page
        records: usize,
    },
    /// Fetched records have been flattened into rows
    Flattened {
        dataset: String,
        /// Number of rows after explosion
        rows: usize,
    },
    /// Rows have been coerced into their declared types
    Coerced {
        dataset: String,
        rows: usize,
        /// Rows dropped by the `skip` coercion error policy
        skipped: usize,
    },
    /// The columnar file has been uploaded
    ObjectWritten {
        dataset: String,
        location: String,
        bytes: usize,
    },
    /// A warehouse statement of the load sequence succeeded
    LoadStageCompleted {
        dataset: String,
        /// One of `create_staging`, `copy`, `truncate` or `delete`, `insert`, `drop_staging`
        stage: String,
    },
    /// Ingestion of a dataset completed and the target table was replaced
    Completed {
        dataset: String,
        rows_written: usize,
        /// Total duration of the ingestion
        duration_ms: u64,
    },
    /// Ingestion of a dataset failed
    Failed {
        dataset: String,
        phase: Phase,
        error: String,
    },
}
