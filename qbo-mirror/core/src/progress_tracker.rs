use qbo_mirror_schemas::ProgressEvent;
use tracing::{error, info, instrument};

/// Receives [`ProgressEvent`]s while datasets are ingested.
///
/// Implementations are shared across concurrently running datasets, every event
/// carries the dataset it belongs to.
///
/// ```rust
/// use qbo_mirror_core::progress_tracker::ProgressTracker;
/// use qbo_mirror_schemas::ProgressEvent;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct PageCounter {
///     pages: AtomicUsize,
/// }
///
/// impl ProgressTracker for PageCounter {
///     fn on_progress(&self, event: ProgressEvent) {
///         if let ProgressEvent::PageFetched { .. } = event {
///             self.pages.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait ProgressTracker: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// Logs every progress event through `tracing`
#[derive(Debug)]
pub struct LoggingProgressTracker;

impl ProgressTracker for LoggingProgressTracker {
    #[instrument(skip_all)]
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { dataset } => {
                info!("🚀 Ingestion of {dataset} started");
            }
            ProgressEvent::PageFetched {
                dataset,
                start_position,
                records,
            } => {
                info!("📥 {dataset}: fetched {records} records at position {start_position}");
            }
            ProgressEvent::Flattened { dataset, rows } => {
                info!("🧩 {dataset}: flattened into {rows} rows");
            }
            ProgressEvent::Coerced {
                dataset,
                rows,
                skipped,
            } => {
                info!("🔢 {dataset}: coerced {rows} rows (skipped: {skipped})");
            }
            ProgressEvent::ObjectWritten {
                dataset,
                location,
                bytes,
            } => {
                info!("📦 {dataset}: wrote {bytes} bytes to {location}");
            }
            ProgressEvent::LoadStageCompleted { dataset, stage } => {
                info!("🏗️  {dataset}: completed {stage}");
            }
            ProgressEvent::Completed {
                dataset,
                rows_written,
                duration_ms,
            } => {
                info!(
                    "🎉 {dataset}: loaded {rows_written} rows (total time: {:.2}s)",
                    duration_ms as f64 / 1000.0
                );
            }
            ProgressEvent::Failed {
                dataset,
                phase,
                error,
            } => {
                error!("❗ {dataset}: failed during {phase}: {error}");
            }
        }
    }
}
