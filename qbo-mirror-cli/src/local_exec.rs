use anyhow::{bail, Context};
use qbo_mirror_core::prelude::*;
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Engine settings, every flag can also be given through its environment variable
#[derive(clap::Args)]
pub struct EngineArgs {
    /// Records requested per page
    #[arg(long, env = "PAGE_SIZE", default_value_t = 100)]
    pub page_size: usize,

    /// Timeout of a single page request in seconds
    #[arg(long = "http-timeout", env = "HTTP_TIMEOUT_S", default_value_t = 60)]
    pub http_timeout_s: u64,

    /// Reaction to values that cannot be coerced: fail, skip or null
    #[arg(long, env = "ON_COERCE_ERROR", default_value = "fail")]
    pub on_coerce_error: CoerceErrorPolicy,

    /// Statement emptying the target table: truncate or delete
    #[arg(long, env = "REPLACE_STRATEGY", default_value = "truncate")]
    pub replace_strategy: ReplaceStrategy,

    /// IAM role the warehouse assumes to read the Parquet objects
    #[arg(long, env = "COPY_IAM_ROLE")]
    pub copy_iam_role: String,

    /// Base url of the accounting API
    #[arg(long, env = "QBO_API_BASE", default_value = "https://quickbooks.api.intuit.com")]
    pub api_base: String,

    /// Company (realm) id
    #[arg(long, env = "REALM_ID")]
    pub realm_id: String,

    /// OAuth access token, refreshed outside of this tool
    #[arg(long, env = "CURR_AUTH_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// k=v object store option, e.g. --storage-option region=eu-central-1
    #[arg(long = "storage-option", value_parser = crate::parse_key_val::<String, String>)]
    pub storage_options: Vec<(String, String)>,
}

impl fmt::Debug for EngineArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineArgs")
            .field("page_size", &self.page_size)
            .field("http_timeout_s", &self.http_timeout_s)
            .field("on_coerce_error", &self.on_coerce_error)
            .field("replace_strategy", &self.replace_strategy)
            .field("copy_iam_role", &self.copy_iam_role)
            .field("api_base", &self.api_base)
            .field("realm_id", &self.realm_id)
            .field("access_token", &"***")
            .field("storage_options", &self.storage_options.len())
            .finish()
    }
}

/// Redshift connection settings
#[derive(clap::Args)]
pub struct WarehouseArgs {
    #[arg(long = "redshift-host", env = "REDSHIFT_HOST")]
    pub host: String,

    #[arg(long = "redshift-port", env = "REDSHIFT_PORT", default_value_t = 5439)]
    pub port: u16,

    #[arg(long = "redshift-db", env = "REDSHIFT_DB")]
    pub database: String,

    #[arg(long = "redshift-user", env = "REDSHIFT_USER")]
    pub user: String,

    #[arg(long = "redshift-password", env = "REDSHIFT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Name the ODBC driver is registered under
    #[arg(
        long = "redshift-odbc-driver",
        env = "REDSHIFT_ODBC_DRIVER",
        default_value = "Amazon Redshift (x64)"
    )]
    pub driver: String,
}

impl fmt::Debug for WarehouseArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseArgs")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("driver", &self.driver)
            .finish()
    }
}

#[cfg(feature = "odbc")]
fn connect(args: &WarehouseArgs) -> anyhow::Result<Arc<dyn Warehouse>> {
    let connection = RedshiftConnection::new(&args.host, &args.database, &args.user, &args.password)
        .with_port(args.port)
        .with_driver(&args.driver);
    tracing::debug!("Using warehouse {connection:?}");

    Ok(Arc::new(OdbcWarehouse::new(&connection)))
}

#[cfg(not(feature = "odbc"))]
fn connect(_args: &WarehouseArgs) -> anyhow::Result<Arc<dyn Warehouse>> {
    Err(anyhow::anyhow!(
        "ODBC support is not enabled in this build of qbo-mirror-cli.\n\
        Please reinstall with: cargo install qbo-mirror-cli --features odbc"
    ))
}

fn engine_config(args: &EngineArgs) -> anyhow::Result<EngineConfig> {
    EngineConfig::builder()
        .copy_iam_role(args.copy_iam_role.clone())
        .page_size(args.page_size)
        .http_timeout(Duration::from_secs(args.http_timeout_s))
        .on_coerce_error(args.on_coerce_error)
        .replace_strategy(args.replace_strategy)
        .api_base_url(args.api_base.clone())
        .storage_options(HashMap::from_iter(args.storage_options.clone()))
        .build()
        .context("invalid engine configuration")
}

/// Cancel `token` on Ctrl-C, in-flight requests and statements finish first
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping before the next request or statement");
            token.cancel();
        }
    });
}

pub async fn run_local(
    descriptors: Vec<Descriptor>,
    engine_args: &EngineArgs,
    warehouse_args: &WarehouseArgs,
    parallelism: usize,
) -> anyhow::Result<()> {
    let config = engine_config(engine_args)?;
    let warehouse = connect(warehouse_args)?;
    let credentials = Arc::new(StaticCredentials::new(
        engine_args.access_token.clone(),
        engine_args.realm_id.clone(),
    ));
    let source = QueryClient::try_new(&config, credentials).context("failed to build the API client")?;

    let engine = IngestionEngine::builder()
        .config(config)
        .source(Arc::new(source))
        .warehouse(warehouse)
        .tracker(Arc::new(LoggingProgressTracker))
        .build();

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    info!(
        "Running {} datasets with parallelism {parallelism}",
        descriptors.len()
    );
    let reports = engine.run_many(&descriptors, parallelism, cancel).await;

    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            Outcome::Succeeded => info!(
                "✅ {}: {} rows written, {} skipped ({:.2?})",
                report.dataset, report.rows_written, report.rows_skipped, report.duration
            ),
            Outcome::Failed { phase, error } => {
                failed += 1;
                error!("❌ {}: failed during {phase}: {error}", report.dataset);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} datasets failed", reports.len());
    }

    Ok(())
}
