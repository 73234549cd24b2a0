//! The coordinator: drives a [`FilePair`] list to terminal state under
//! worker-slot, cancellation, and progress budgets (spec §4.9).
//!
//! Grounded on the teacher's `async` feature (see `stream.rs`'s bounded
//! concurrent task shape) generalised from a fixed pipeline to a
//! `{mosaic, preview}` operation switch. `tokio::sync::Semaphore` provides
//! the worker-slot budget and `tokio::task::JoinSet` tracks live workers, the
//! closest teacher precedent for bounded concurrent async work. Counters are
//! `AtomicU64`; global progress is throttled via [`crate::progress::ProgressThrottle`],
//! mirroring the teacher's `ProgressTracker` timing fields generalised from a
//! batch counter to a wall-clock gate.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::activity::{ActivityHint, NoOpActivity};
use crate::compositor::MosaicCompositor;
use crate::config::{LayoutMode, PipelineConfig};
use crate::discovery::FilePair;
use crate::encoder::ImageEncoder;
use crate::error::{Disposition, MosaicError};
use crate::layout;
use crate::preview::PreviewAssembler;
use crate::probe::MediaProbe;
use crate::progress::{CancellationLedger, ProgressCallback, ProgressEvent, ProgressKind, ProgressThrottle, Stage};
use crate::sampler::{SeekTolerance, ThumbnailSampler};
use crate::text::TextFont;

/// The operation a coordinator run performs over a [`FilePair`] list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Mosaic,
    Preview,
}

/// The job's terminal state (spec line 208:
/// `{completedSuccess, completedWithErrors, cancelled}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalState {
    #[default]
    CompletedSuccess,
    CompletedWithErrors,
    Cancelled,
}

/// Terminal outcome counters for a finished (or aborted) run. Per spec
/// Invariant #1, `processed == skipped + errored + cancelled + successes`
/// (successes aren't counted separately; they're implied by what's left
/// over) and `processed` always reaches `total` — no pair is silently
/// dropped, whether skipped, errored, or swept up by a cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub processed: u64,
    pub skipped: u64,
    pub errored: u64,
    pub cancelled: u64,
    pub total: u64,
    pub terminal_state: TerminalState,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    skipped: AtomicU64,
    errored: AtomicU64,
    cancelled: AtomicU64,
}

impl Counters {
    fn snapshot(&self, total: u64, was_cancelled: bool) -> RunSummary {
        let processed = self.processed.load(Ordering::SeqCst);
        let skipped = self.skipped.load(Ordering::SeqCst);
        let errored = self.errored.load(Ordering::SeqCst);
        let cancelled = self.cancelled.load(Ordering::SeqCst);
        let terminal_state = if was_cancelled {
            TerminalState::Cancelled
        } else if errored > 0 {
            TerminalState::CompletedWithErrors
        } else {
            TerminalState::CompletedSuccess
        };
        RunSummary { processed, skipped, errored, cancelled, total, terminal_state }
    }
}

/// Drives a batch of [`FilePair`]s through the per-file mosaic/preview
/// pipeline under a bounded worker pool.
pub struct Coordinator {
    config: PipelineConfig,
}

impl Coordinator {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run `operation` over `pairs`, reporting unthrottled per-file events
    /// and a ≤4 Hz global event via `progress`, cooperatively honouring
    /// `cancellation` (spec §4.9's scheduling algorithm).
    pub async fn run(
        &self,
        pairs: Vec<FilePair>,
        operation: OperationKind,
        progress: Arc<dyn ProgressCallback>,
        cancellation: Arc<CancellationLedger>,
    ) -> RunSummary {
        let total = pairs.len() as u64;
        let started = Instant::now();
        let _job_activity = NoOpActivity.acquire("mosaicgen-job");
        let counters = Arc::new(Counters::default());
        let throttle = Arc::new(ProgressThrottle::new());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_operations.max(1)));

        let mut workers: JoinSet<WorkerOutcome> = JoinSet::new();

        let mut pairs = pairs.into_iter();
        while let Some(pair) = pairs.next() {
            if cancellation.is_globally_cancelled() {
                // spec line 126: global cancel aborts the whole job outright.
                // Everything still queued — this pair included — counts as
                // cancelled rather than being silently dropped (Invariant #1).
                let remaining = pairs.len() as u64 + 1;
                counters.cancelled.fetch_add(remaining, Ordering::SeqCst);
                counters.processed.fetch_add(remaining, Ordering::SeqCst);
                Self::emit_global(&progress, &throttle, &counters, total, started, true);
                break;
            }
            if cancellation.is_file_cancelled(&pair.source) {
                counters.cancelled.fetch_add(1, Ordering::SeqCst);
                counters.processed.fetch_add(1, Ordering::SeqCst);
                Self::emit_global(&progress, &throttle, &counters, total, started, true);
                continue;
            }

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                let remaining = pairs.len() as u64 + 1;
                counters.cancelled.fetch_add(remaining, Ordering::SeqCst);
                counters.processed.fetch_add(remaining, Ordering::SeqCst);
                Self::emit_global(&progress, &throttle, &counters, total, started, true);
                break;
            };

            let config = self.config.clone();
            let progress_for_worker = progress.clone();
            let cancellation_for_worker = cancellation.clone();
            let counters_for_worker = counters.clone();
            let throttle_for_worker = throttle.clone();

            workers.spawn(async move {
                let _permit = permit;
                let progress_for_blocking = progress_for_worker.clone();
                let cancellation_for_blocking = cancellation_for_worker.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    run_one(&pair, operation, &config, progress_for_blocking.as_ref(), cancellation_for_blocking.as_ref())
                })
                .await
                .unwrap_or(WorkerOutcome::Errored);

                match outcome {
                    WorkerOutcome::Skipped => {
                        counters_for_worker.skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    WorkerOutcome::Cancelled => {
                        counters_for_worker.cancelled.fetch_add(1, Ordering::SeqCst);
                    }
                    WorkerOutcome::Errored => {
                        counters_for_worker.errored.fetch_add(1, Ordering::SeqCst);
                    }
                    WorkerOutcome::JobFatal => {
                        counters_for_worker.errored.fetch_add(1, Ordering::SeqCst);
                        // spec line 203: job-fatal aborts the whole job rather
                        // than being treated as an ordinary per-file error —
                        // stop dispatching new workers.
                        cancellation_for_worker.cancel();
                    }
                    WorkerOutcome::Success => {}
                }
                counters_for_worker.processed.fetch_add(1, Ordering::SeqCst);

                Self::emit_global(&progress_for_worker, &throttle_for_worker, &counters_for_worker, total, started, false);
                outcome
            });
        }

        while workers.join_next().await.is_some() {}

        let summary = counters.snapshot(total, cancellation.is_globally_cancelled());
        Self::emit_global(&progress, &throttle, &counters, total, started, true);
        summary
    }

    fn emit_global(progress: &Arc<dyn ProgressCallback>, throttle: &ProgressThrottle, counters: &Counters, total: u64, started: Instant, force: bool) {
        if !force && !throttle.should_emit() {
            return;
        }
        let processed = counters.processed.load(Ordering::SeqCst);
        let skipped = counters.skipped.load(Ordering::SeqCst);
        let errored = counters.errored.load(Ordering::SeqCst);
        let fraction = if total == 0 { 0.0 } else { processed as f64 / total as f64 };
        let elapsed = started.elapsed();
        let estimated_remaining = if fraction > 0.0 {
            elapsed.mul_f64((1.0 / fraction) - 1.0)
        } else {
            Duration::ZERO
        };

        progress.on_progress(&ProgressEvent {
            kind: ProgressKind::Global,
            fraction: ProgressEvent::normalise_fraction(fraction),
            current_file: None,
            processed,
            total,
            skipped,
            errored,
            stage: if processed >= total && total > 0 { Stage::Done } else { Stage::Extract },
            elapsed,
            estimated_remaining,
            running: processed < total,
        });
    }
}

/// A worker's terminal outcome — [`Disposition`] extended with a success
/// case, since `Disposition` only classifies *errors* (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerOutcome {
    Success,
    Skipped,
    Errored,
    Cancelled,
    JobFatal,
}

impl From<Disposition> for WorkerOutcome {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Skipped => WorkerOutcome::Skipped,
            Disposition::Errored => WorkerOutcome::Errored,
            Disposition::Cancelled => WorkerOutcome::Cancelled,
            Disposition::JobFatal => WorkerOutcome::JobFatal,
        }
    }
}

fn run_one(pair: &FilePair, operation: OperationKind, config: &PipelineConfig, progress: &dyn ProgressCallback, cancellation: &CancellationLedger) -> WorkerOutcome {
    match run_one_fallible(pair, operation, config, progress, cancellation) {
        Ok(()) => WorkerOutcome::Success,
        Err(error) => WorkerOutcome::from(error.disposition()),
    }
}

fn run_one_fallible(pair: &FilePair, operation: OperationKind, config: &PipelineConfig, progress: &dyn ProgressCallback, cancellation: &CancellationLedger) -> Result<(), MosaicError> {
    let _file_activity = NoOpActivity.acquire(&pair.source.to_string_lossy());

    if cancellation.is_file_cancelled(&pair.source) {
        return Err(MosaicError::Cancelled);
    }

    emit_file(progress, &pair.source, Stage::Probe, 0.2);
    let metadata = MediaProbe::open(&pair.source)?;

    if config.min_duration > 0.0 && metadata.duration_or_zero() < config.min_duration {
        return Err(MosaicError::TooShort { duration: metadata.duration_or_zero(), minimum: config.min_duration });
    }

    match operation {
        OperationKind::Mosaic => run_mosaic(pair, config, &metadata, progress, cancellation),
        OperationKind::Preview => run_preview(pair, config, &metadata, progress, cancellation),
    }
}

fn run_mosaic(pair: &FilePair, config: &PipelineConfig, metadata: &crate::metadata::VideoMetadata, progress: &dyn ProgressCallback, cancellation: &CancellationLedger) -> Result<(), MosaicError> {
    let duration_class = metadata.duration_class();

    // `pair.output_directory` (from discovery) already nests `thDir`,
    // `{width}_{aspectTag}`, and any playlist stem; only the optional
    // per-durationClass subdirectory remains to be appended here, since
    // discovery doesn't probe metadata for a plain directory walk.
    let mut output_directory = pair.output_directory.clone();
    if config.separate_folders {
        output_directory.push(duration_class.tag());
    }
    let filename = ImageEncoder::output_filename(&pair.source, config, config.density, duration_class);
    let output_path = output_directory.join(filename);

    if output_path.exists() && !config.overwrite {
        return Err(MosaicError::ExistingVid(output_path));
    }

    if cancellation.is_file_cancelled(&pair.source) {
        return Err(MosaicError::Cancelled);
    }

    emit_file(progress, &pair.source, Stage::Layout, 0.4);
    let count = layout::thumbnail_count(metadata.duration_or_zero(), config.width, config.density);
    let layout = match config.layout_mode() {
        LayoutMode::Classic => layout::plan_classic(count, config.width, metadata.aspect_ratio(), config.mosaic_aspect_ratio),
        LayoutMode::Custom => layout::plan_custom(config.density, config.width, metadata.aspect_ratio(), config.mosaic_aspect_ratio),
    };

    if cancellation.is_file_cancelled(&pair.source) {
        return Err(MosaicError::Cancelled);
    }

    let tolerance = if config.accurate_timestamps { SeekTolerance::Accurate } else { SeekTolerance::Loose };
    let timestamps = crate::sampler::build_timestamp_set(metadata.duration_or_zero(), layout.thumbnail_count() as u32);
    let sampler = ThumbnailSampler::new(&pair.source, metadata, tolerance);

    let cell_size = layout
        .cells
        .first()
        .map(|cell| (cell.width, cell.height))
        .unwrap_or((config.width, config.width));
    let frames = sampler.extract_many(&timestamps, cell_size.0, cell_size.1)?;

    if cancellation.is_file_cancelled(&pair.source) {
        return Err(MosaicError::Cancelled);
    }

    emit_file(progress, &pair.source, Stage::Composite, 0.6);
    let font = TextFont::load_system().unwrap_or_else(|_| TextFont::fallback());
    let compositor = MosaicCompositor::new(&font);
    let image = compositor.compose(&frames, &layout, metadata)?;

    emit_file(progress, &pair.source, Stage::Save, 0.8);
    ImageEncoder::save(&image, &output_path, config.format, config.compression_quality)?;

    emit_file(progress, &pair.source, Stage::Done, 1.0);
    Ok(())
}

fn run_preview(pair: &FilePair, config: &PipelineConfig, metadata: &crate::metadata::VideoMetadata, progress: &dyn ProgressCallback, cancellation: &CancellationLedger) -> Result<(), MosaicError> {
    let assembler = PreviewAssembler::new(progress, cancellation);
    assembler.assemble(&pair.source, metadata, config)?;
    Ok(())
}

fn emit_file(progress: &dyn ProgressCallback, source: &PathBuf, stage: Stage, fraction: f64) {
    progress.on_progress(&ProgressEvent {
        kind: ProgressKind::File,
        fraction: ProgressEvent::normalise_fraction(fraction),
        current_file: Some(source.clone()),
        processed: 0,
        total: 0,
        skipped: 0,
        errored: 0,
        stage,
        elapsed: Duration::ZERO,
        estimated_remaining: Duration::ZERO,
        running: true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoOpProgress;
    use std::path::PathBuf;

    #[tokio::test]
    async fn empty_batch_completes_with_zero_counts() {
        let coordinator = Coordinator::new(PipelineConfig::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NoOpProgress);
        let cancellation = Arc::new(CancellationLedger::new());
        let summary = coordinator.run(Vec::new(), OperationKind::Mosaic, progress, cancellation).await;
        assert_eq!(summary.total, 0);
        assert_eq!(summary.processed, 0);
    }

    #[tokio::test]
    async fn nonexistent_file_counts_as_errored_not_panic() {
        let coordinator = Coordinator::new(PipelineConfig::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NoOpProgress);
        let cancellation = Arc::new(CancellationLedger::new());
        let pairs = vec![FilePair { source: PathBuf::from("/nonexistent/video.mp4"), output_directory: PathBuf::from("/tmp/out") }];
        let summary = coordinator.run(pairs, OperationKind::Mosaic, progress, cancellation).await;
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.errored, 1);
    }

    #[tokio::test]
    async fn globally_cancelled_file_is_cancelled_not_spawned() {
        let coordinator = Coordinator::new(PipelineConfig::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NoOpProgress);
        let cancellation = Arc::new(CancellationLedger::new());
        cancellation.cancel();
        let pairs = vec![FilePair { source: PathBuf::from("/nonexistent/video.mp4"), output_directory: PathBuf::from("/tmp/out") }];
        let summary = coordinator.run(pairs, OperationKind::Mosaic, progress, cancellation).await;
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.errored, 0);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.terminal_state, TerminalState::Cancelled);
    }

    #[test]
    fn job_fatal_disposition_converts_to_job_fatal_outcome() {
        assert_eq!(WorkerOutcome::from(Disposition::JobFatal), WorkerOutcome::JobFatal);
    }

    #[tokio::test]
    async fn cancelling_mid_batch_stops_dispatch_of_remaining_pairs() {
        let coordinator = Coordinator::new(PipelineConfig::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NoOpProgress);
        let cancellation = Arc::new(CancellationLedger::new());
        // Global cancel is already set before the first pair is even looked
        // at: every pair must still land in `processed` via the `cancelled`
        // bucket rather than being silently dropped (Invariant #1).
        let pairs = vec![
            FilePair { source: PathBuf::from("/nonexistent/a.mp4"), output_directory: PathBuf::from("/tmp/out") },
            FilePair { source: PathBuf::from("/nonexistent/b.mp4"), output_directory: PathBuf::from("/tmp/out") },
            FilePair { source: PathBuf::from("/nonexistent/c.mp4"), output_directory: PathBuf::from("/tmp/out") },
        ];
        cancellation.cancel();
        let summary = coordinator.run(pairs, OperationKind::Mosaic, progress, cancellation).await;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, summary.total);
        assert_eq!(summary.cancelled, 3);
        assert_eq!(summary.errored, 0);
        assert_eq!(summary.terminal_state, TerminalState::Cancelled);
    }
}
