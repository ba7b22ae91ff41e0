//! Staging-table swap into the warehouse.
//!
//! A load runs `CREATE staging`, `COPY staging FROM <object>`, then replaces the
//! target inside one transaction and finally drops the staging table. The staging
//! table is probed first and a pre-existing one is never touched.

use async_trait::async_trait;
use qbo_mirror_schemas::{Descriptor, Phase, ReplaceStrategy};
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

/// Step of a warehouse load a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    CreateStaging,
    Copy,
    Truncate,
    Delete,
    Insert,
    DropStaging,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            LoadStage::CreateStaging => "create_staging",
            LoadStage::Copy => "copy",
            LoadStage::Truncate => "truncate",
            LoadStage::Delete => "delete",
            LoadStage::Insert => "insert",
            LoadStage::DropStaging => "drop_staging",
        };
        write!(f, "{stage}")
    }
}

/// Failure reported by a [`Warehouse`] implementation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{cause}")]
pub struct StatementError {
    /// Position of the failing statement inside a transaction
    pub index: Option<usize>,
    pub cause: String,
}

impl StatementError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            index: None,
            cause: cause.into(),
        }
    }

    pub fn at(index: usize, cause: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            cause: cause.into(),
        }
    }
}

/// SQL endpoint the loader drives
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Whether a possibly schema-qualified table exists
    async fn table_exists(&self, table: &str) -> std::result::Result<bool, StatementError>;

    /// Run one statement in its own committed unit
    async fn execute(&self, sql: &str) -> std::result::Result<(), StatementError>;

    /// Run all statements in one transaction, rolled back when any of them fails
    async fn execute_transaction(
        &self,
        statements: &[String],
    ) -> std::result::Result<(), StatementError>;
}

/// Every statement of one load, rendered from a descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub staging_table: String,
    pub target_table: String,
    pub replace_stage: LoadStage,
    pub create_staging: String,
    pub copy: String,
    pub replace: String,
    pub insert: String,
    pub drop_staging: String,
    pub cleanup: String,
}

impl LoadPlan {
    pub fn new(descriptor: &Descriptor, iam_role: &str, strategy: ReplaceStrategy) -> Self {
        let warehouse = &descriptor.warehouse;
        let staging = &warehouse.staging_table;
        let target = &warehouse.target_table;

        let (replace_stage, replace) = match strategy {
            ReplaceStrategy::Truncate => (LoadStage::Truncate, format!("TRUNCATE TABLE {target}")),
            ReplaceStrategy::Delete => (LoadStage::Delete, format!("DELETE FROM {target}")),
        };

        Self {
            staging_table: staging.clone(),
            target_table: target.clone(),
            replace_stage,
            create_staging: format!("CREATE TABLE {staging} ({})", warehouse.target_ddl()),
            copy: format!(
                "COPY {staging} FROM '{}' IAM_ROLE '{}' FORMAT AS PARQUET",
                descriptor.object_path,
                iam_role.replace('\'', "''")
            ),
            replace,
            insert: format!(
                "INSERT INTO {target} SELECT {} FROM {staging}",
                warehouse.cast_expressions().join(", ")
            ),
            drop_staging: format!("DROP TABLE {staging}"),
            cleanup: format!("DROP TABLE IF EXISTS {staging}"),
        }
    }

    /// Statements of a successful load in execution order
    pub fn statements(&self) -> Vec<&str> {
        vec![
            &self.create_staging,
            &self.copy,
            &self.replace,
            &self.insert,
            &self.drop_staging,
        ]
    }
}

fn warehouse_error(stage: LoadStage, sql: &str, error: StatementError) -> Error {
    Error::Warehouse {
        stage,
        sql: sql.to_string(),
        cause: error.cause,
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled { phase: Phase::Load });
    }
    Ok(())
}

/// Fail with [`Error::StagingCollision`] when the staging table of `plan` already
/// exists. Nothing is written in that case.
#[instrument(skip_all, fields(staging = %plan.staging_table), err)]
pub async fn ensure_staging_free(
    warehouse: &dyn Warehouse,
    plan: &LoadPlan,
    cancel: &CancellationToken,
) -> Result<()> {
    ensure_active(cancel)?;

    let exists = warehouse
        .table_exists(&plan.staging_table)
        .await
        .map_err(|e| warehouse_error(LoadStage::CreateStaging, &plan.create_staging, e))?;
    if exists {
        return Err(Error::StagingCollision {
            table: plan.staging_table.clone(),
        });
    }

    Ok(())
}

/// Run `plan` against `warehouse`, calling `on_stage` after every completed stage.
///
/// Callers check [`ensure_staging_free`] before writing the object. A staging
/// table created in between makes `CREATE TABLE` fail. A failure after the
/// staging table was created drops it again on a best-effort basis. The target
/// table is only touched by the replace transaction.
#[instrument(skip_all, fields(staging = %plan.staging_table, target = %plan.target_table), err)]
pub async fn load(
    warehouse: &dyn Warehouse,
    plan: &LoadPlan,
    cancel: &CancellationToken,
    mut on_stage: impl FnMut(LoadStage) + Send,
) -> Result<()> {
    ensure_active(cancel)?;
    debug!(sql = %plan.create_staging, "creating staging table");
    warehouse
        .execute(&plan.create_staging)
        .await
        .map_err(|e| warehouse_error(LoadStage::CreateStaging, &plan.create_staging, e))?;
    on_stage(LoadStage::CreateStaging);

    match swap(warehouse, plan, cancel, &mut on_stage).await {
        Ok(()) => {
            info!(target_table = %plan.target_table, "target table replaced");
            Ok(())
        }
        Err(err) => {
            if let Err(cleanup_err) = warehouse.execute(&plan.cleanup).await {
                warn!(
                    staging = %plan.staging_table,
                    "could not drop staging table after failure: {cleanup_err}"
                );
            }
            Err(err)
        }
    }
}

async fn swap(
    warehouse: &dyn Warehouse,
    plan: &LoadPlan,
    cancel: &CancellationToken,
    on_stage: &mut (impl FnMut(LoadStage) + Send),
) -> Result<()> {
    ensure_active(cancel)?;
    debug!(sql = %plan.copy, "copying object into staging table");
    warehouse
        .execute(&plan.copy)
        .await
        .map_err(|e| warehouse_error(LoadStage::Copy, &plan.copy, e))?;
    on_stage(LoadStage::Copy);

    ensure_active(cancel)?;
    let transaction = [plan.replace.clone(), plan.insert.clone()];
    debug!(replace = %plan.replace, insert = %plan.insert, "replacing target table");
    warehouse
        .execute_transaction(&transaction)
        .await
        .map_err(|e| match e.index {
            Some(0) => warehouse_error(plan.replace_stage, &plan.replace, e),
            _ => warehouse_error(LoadStage::Insert, &plan.insert, e),
        })?;
    on_stage(plan.replace_stage);
    on_stage(LoadStage::Insert);

    // The target is committed from here on, a failed drop only leaves the staging table behind.
    debug!(sql = %plan.drop_staging, "dropping staging table");
    match warehouse.execute(&plan.drop_staging).await {
        Ok(()) => on_stage(LoadStage::DropStaging),
        Err(e) => warn!(
            staging = %plan.staging_table,
            "target table replaced but the staging table could not be dropped: {e}"
        ),
    }

    Ok(())
}
