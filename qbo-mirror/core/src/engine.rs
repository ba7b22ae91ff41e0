//! Orchestration of one ingestion run: fetch, flatten, coerce, write, load.

use bon::Builder;
use futures::{stream, StreamExt};
use object_store::ObjectStore;
use qbo_mirror_schemas::{Descriptor, Phase, ProgressEvent};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::{
    client::{fetch_all, RecordSource},
    coerce::coerce,
    columnar::write_table,
    config::EngineConfig,
    error::{Error, Result},
    flatten::flatten,
    loader::{ensure_staging_free, load, LoadPlan, Warehouse},
    progress_tracker::ProgressTracker,
    store::global_registry,
};

/// Result of a dataset run
#[derive(Debug)]
pub enum Outcome {
    Succeeded,
    Failed { phase: Phase, error: Error },
}

/// Summary of one dataset run, produced whether it succeeded or not
#[derive(Debug)]
pub struct Report {
    pub dataset: String,
    pub rows_fetched: usize,
    pub rows_skipped: usize,
    pub rows_written: usize,
    pub bytes_written: usize,
    pub duration: Duration,
    pub outcome: Outcome,
}

impl Report {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded)
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            Outcome::Succeeded => None,
        }
    }

    pub fn failed_phase(&self) -> Option<Phase> {
        match &self.outcome {
            Outcome::Failed { phase, .. } => Some(*phase),
            Outcome::Succeeded => None,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    rows_fetched: usize,
    rows_skipped: usize,
    rows_written: usize,
    bytes_written: usize,
}

/// Mirrors datasets from a [`RecordSource`] into a [`Warehouse`].
///
/// The columnar file goes to `store` when one is given, otherwise to a store
/// resolved from the object path's scheme.
#[derive(Builder)]
pub struct IngestionEngine {
    config: EngineConfig,
    source: Arc<dyn RecordSource>,
    warehouse: Arc<dyn Warehouse>,
    store: Option<Arc<dyn ObjectStore>>,
    tracker: Option<Arc<dyn ProgressTracker>>,
}

impl IngestionEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tracker) = &self.tracker {
            tracker.on_progress(event);
        }
    }

    fn store_for(&self, descriptor: &Descriptor) -> Result<Arc<dyn ObjectStore>> {
        match &self.store {
            Some(store) => Ok(store.clone()),
            None => global_registry()
                .create_store(&descriptor.object_path, &self.config.storage_options),
        }
    }

    /// Ingest one dataset
    pub async fn run(&self, descriptor: &Descriptor) -> Report {
        self.run_with_cancellation(descriptor, CancellationToken::new())
            .await
    }

    /// Ingest one dataset, stopping at the next request or statement once `cancel` fires.
    ///
    /// The target table is only replaced after every earlier phase succeeded.
    #[instrument(skip_all, fields(dataset = %descriptor.entity_name))]
    pub async fn run_with_cancellation(
        &self,
        descriptor: &Descriptor,
        cancel: CancellationToken,
    ) -> Report {
        let start_time = Instant::now();
        let dataset = descriptor.name().to_string();
        let mut counters = Counters::default();

        self.emit(ProgressEvent::Started {
            dataset: dataset.clone(),
        });

        let result = self.ingest(descriptor, &cancel, &mut counters).await;
        let duration = start_time.elapsed();

        let outcome = match result {
            Ok(()) => {
                info!(
                    "Loaded {} rows into {} ... Elapsed time: {:.2?}",
                    counters.rows_written, descriptor.warehouse.target_table, duration
                );
                self.emit(ProgressEvent::Completed {
                    dataset: dataset.clone(),
                    rows_written: counters.rows_written,
                    duration_ms: duration.as_millis() as u64,
                });
                Outcome::Succeeded
            }
            Err(error) => self.failed(&dataset, error),
        };

        Report {
            dataset,
            rows_fetched: counters.rows_fetched,
            rows_skipped: counters.rows_skipped,
            rows_written: counters.rows_written,
            bytes_written: counters.bytes_written,
            duration,
            outcome,
        }
    }

    fn failed(&self, dataset: &str, error: Error) -> Outcome {
        let phase = error.phase();
        error!(%phase, "Ingestion of {dataset} failed: {error}");

        self.emit(ProgressEvent::Failed {
            dataset: dataset.to_string(),
            phase,
            error: error.to_string(),
        });

        Outcome::Failed { phase, error }
    }

    async fn ingest(
        &self,
        descriptor: &Descriptor,
        cancel: &CancellationToken,
        counters: &mut Counters,
    ) -> Result<()> {
        let dataset = descriptor.name();

        descriptor.validate().map_err(|source| Error::Schema {
            entity: dataset.to_string(),
            source,
        })?;

        let time = Instant::now();
        let records = fetch_all(
            self.source.as_ref(),
            &descriptor.entity_name,
            self.config.page_size,
            cancel,
            |start_position, records| {
                self.emit(ProgressEvent::PageFetched {
                    dataset: dataset.to_string(),
                    start_position,
                    records,
                })
            },
        )
        .await?;
        counters.rows_fetched = records.len();
        info!(
            "Fetched {} {dataset} records ... Elapsed time: {:.2?}",
            records.len(),
            time.elapsed()
        );

        let raw = flatten(&records, descriptor)?;
        drop(records);
        self.emit(ProgressEvent::Flattened {
            dataset: dataset.to_string(),
            rows: raw.len(),
        });

        let policy = descriptor
            .on_coerce_error
            .unwrap_or(self.config.on_coerce_error);
        let table = coerce(&raw, descriptor, policy)?;
        counters.rows_skipped = table.skipped;
        self.emit(ProgressEvent::Coerced {
            dataset: dataset.to_string(),
            rows: table.len(),
            skipped: table.skipped,
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                phase: Phase::Write,
            });
        }

        let strategy = descriptor
            .replace_strategy
            .unwrap_or(self.config.replace_strategy);
        let plan = LoadPlan::new(descriptor, &self.config.copy_iam_role, strategy);
        ensure_staging_free(self.warehouse.as_ref(), &plan, cancel).await?;

        let time = Instant::now();
        let store = self.store_for(descriptor)?;
        let bytes = write_table(
            store.as_ref(),
            &descriptor.object_path,
            &table,
            self.config.max_object_size,
        )
        .await?;
        counters.bytes_written = bytes;
        info!(
            "Wrote {} rows to {} ... Elapsed time: {:.2?}",
            table.len(),
            descriptor.object_path,
            time.elapsed()
        );
        self.emit(ProgressEvent::ObjectWritten {
            dataset: dataset.to_string(),
            location: descriptor.object_path.to_string(),
            bytes,
        });

        let time = Instant::now();
        load(self.warehouse.as_ref(), &plan, cancel, |stage| {
            self.emit(ProgressEvent::LoadStageCompleted {
                dataset: dataset.to_string(),
                stage: stage.to_string(),
            })
        })
        .await?;
        counters.rows_written = table.len();
        info!(
            "Replaced {} ... Elapsed time: {:.2?}",
            plan.target_table,
            time.elapsed()
        );

        Ok(())
    }

    /// Ingest independent datasets with at most `parallelism` running at once.
    ///
    /// Reports come back in input order. Datasets sharing a staging table or an
    /// object path with another dataset of the batch are not run and fail with
    /// [`Error::StagingCollision`].
    #[instrument(skip_all, fields(datasets = descriptors.len(), parallelism = parallelism))]
    pub async fn run_many(
        &self,
        descriptors: &[Descriptor],
        parallelism: usize,
        cancel: CancellationToken,
    ) -> Vec<Report> {
        let conflicting = shared_resources(descriptors);

        stream::iter(descriptors.iter().enumerate())
            .map(|(index, descriptor)| {
                let cancel = cancel.clone();
                let conflicting = &conflicting;

                async move {
                    if conflicting.contains(&index) {
                        self.refuse(descriptor)
                    } else {
                        self.run_with_cancellation(descriptor, cancel).await
                    }
                }
            })
            .buffered(parallelism.max(1))
            .collect()
            .await
    }

    fn refuse(&self, descriptor: &Descriptor) -> Report {
        let dataset = descriptor.name().to_string();
        let error = Error::StagingCollision {
            table: descriptor.warehouse.staging_table.clone(),
        };
        let outcome = self.failed(&dataset, error);

        Report {
            dataset,
            rows_fetched: 0,
            rows_skipped: 0,
            rows_written: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
            outcome,
        }
    }
}

/// Positions of descriptors that share a staging table or object path with another one
fn shared_resources(descriptors: &[Descriptor]) -> HashSet<usize> {
    let mut claims: HashMap<String, Vec<usize>> = HashMap::new();

    for (index, descriptor) in descriptors.iter().enumerate() {
        let staging = descriptor.warehouse.staging_table.to_ascii_lowercase();
        claims
            .entry(format!("table:{staging}"))
            .or_default()
            .push(index);
        claims
            .entry(format!("object:{}", descriptor.object_path))
            .or_default()
            .push(index);
    }

    claims
        .into_values()
        .filter(|claimants| claimants.len() > 1)
        .flatten()
        .collect()
}
