use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use qbo_mirror_core::prelude::*;
use std::{collections::HashMap, error::Error, path::PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod local_exec;

use local_exec::{EngineArgs, WarehouseArgs};

/// Mirror QuickBooks Online entities into Redshift through Parquet files
#[derive(Debug, Parser)]
#[command(name = "qbo-mirror", version, about, long_about = None)]
struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, clap::Args)]
struct CatalogArgs {
    /// Path to the descriptor catalog
    #[arg(short, long)]
    file: PathBuf,

    /// k=v list of parameters to pass to the catalog file
    /// e.g. qbo-mirror run -f quickbooks.yml -p schema=finance -p bucket=datalake
    #[arg(short, long, value_parser = parse_key_val::<String, String>)]
    params: Option<Vec<(String, String)>>,

    /// Only handle these datasets, by entity name or target table
    #[arg(short, long = "dataset")]
    datasets: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest the datasets of a catalog
    Run {
        #[command(flatten)]
        catalog: CatalogArgs,

        #[command(flatten)]
        engine: EngineArgs,

        #[command(flatten)]
        warehouse: WarehouseArgs,

        /// Number of datasets ingested at the same time
        #[arg(long, default_value_t = 1)]
        parallelism: usize,
    },

    /// Load and validate a catalog without contacting any service
    Validate {
        #[command(flatten)]
        catalog: CatalogArgs,
    },

    /// Print the warehouse statements each dataset would execute
    Sql {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// IAM role used by COPY
        #[arg(long, env = "COPY_IAM_ROLE", default_value = "<COPY_IAM_ROLE>")]
        copy_iam_role: String,

        /// Statement emptying the target table: truncate or delete
        #[arg(long, env = "REPLACE_STRATEGY", default_value = "truncate")]
        replace_strategy: ReplaceStrategy,
    },
}

fn parse_key_val<T, U>(s: &str) -> Result<(T, U), Box<dyn Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// Load the catalog, rendering template errors with their diagnostics
fn load_catalog(args: &CatalogArgs) -> anyhow::Result<Catalog> {
    let params = HashMap::from_iter(args.params.clone().unwrap_or_default());
    let format = format_from_path(&args.file);
    debug!("Loading catalog {} as {format:?}", args.file.display());

    Catalog::from_file(&args.file, format, params).map_err(|error| {
        eprintln!("{:?}", miette::Report::new(error));
        anyhow!("failed to load catalog {}", args.file.display())
    })
}

/// Datasets named on the command line, every dataset when none is named
fn select(catalog: Catalog, names: &[String]) -> anyhow::Result<Vec<Descriptor>> {
    if names.is_empty() {
        return Ok(catalog.datasets);
    }

    names
        .iter()
        .map(|name| {
            catalog
                .dataset(name)
                .cloned()
                .ok_or_else(|| anyhow!("no dataset named '{name}' in the catalog"))
        })
        .collect()
}

fn print_sql(descriptors: &[Descriptor], copy_iam_role: &str, strategy: ReplaceStrategy) {
    for descriptor in descriptors {
        let strategy = descriptor.replace_strategy.unwrap_or(strategy);
        let plan = qbo_mirror_core::loader::LoadPlan::new(descriptor, copy_iam_role, strategy);

        println!("-- {}", descriptor.entity_name);
        for statement in plan.statements() {
            println!("{statement};");
        }
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.log_format);

    match args.command {
        Commands::Run {
            catalog,
            engine,
            warehouse,
            parallelism,
        } => {
            let descriptors = select(load_catalog(&catalog)?, &catalog.datasets)?;
            local_exec::run_local(descriptors, &engine, &warehouse, parallelism)
                .await
                .context("ingestion did not complete")?;
        }
        Commands::Validate { catalog } => {
            let descriptors = select(load_catalog(&catalog)?, &catalog.datasets)?;
            for descriptor in &descriptors {
                info!(
                    "✅ {} -> {} ({} columns)",
                    descriptor.entity_name,
                    descriptor.warehouse.target_table,
                    descriptor.warehouse.columns.len()
                );
            }
            info!("{} datasets are valid", descriptors.len());
        }
        Commands::Sql {
            catalog,
            copy_iam_role,
            replace_strategy,
        } => {
            let descriptors = select(load_catalog(&catalog)?, &catalog.datasets)?;
            print_sql(&descriptors, &copy_iam_role, replace_strategy);
        }
    }

    Ok(())
}
