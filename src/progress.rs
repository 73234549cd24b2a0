//! Progress reporting and cancellation support.
//!
//! Provides [`ProgressCallback`] for monitoring job progress,
//! [`CancellationLedger`] for cooperative global/per-file cancellation, and
//! [`ProgressEvent`] for the snapshots delivered to callbacks — modelled on
//! the teacher's `CancellationToken`/`ProgressInfo` pair, but extended to the
//! per-file ledger and throttled-global-event shape spec'd in §3/§4.9.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Which stage of the per-file pipeline a [`ProgressEvent`] describes
/// (spec §4.9's progress aggregation fractions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
    /// Probing container/stream metadata. Emits fraction 0.2.
    Probe,
    /// Planning the mosaic layout. Emits fraction 0.4.
    Layout,
    /// Sampling/decoding thumbnail frames. Emits a running fraction.
    Extract,
    /// Compositing the mosaic raster. Emits fraction 0.6.
    Composite,
    /// Encoding and saving the finished artifact. Emits fraction 0.8.
    Save,
    /// Terminal state. Emits fraction 1.0.
    Done,
    /// The file was skipped (too short, existing output, or cancelled).
    Skipped(&'static str),
}

/// Whether a [`ProgressEvent`] describes the whole job or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// Aggregated across the whole job, throttled to ≤4 Hz (spec §4.9).
    Global,
    /// Scoped to a single in-flight file, forwarded unthrottled.
    File,
}

/// A snapshot of job or per-file progress (spec §3).
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Whether this event is global or scoped to one file.
    pub kind: ProgressKind,
    /// Completion fraction in `[0, 1]`. NaN is normalised to `0.0` before
    /// this struct is constructed.
    pub fraction: f64,
    /// The file currently being processed, if any.
    pub current_file: Option<PathBuf>,
    /// Number of files fully processed (success + skipped + errored).
    pub processed: u64,
    /// Total number of files in the job.
    pub total: u64,
    /// Number of files skipped (expected outcomes: too short, existing,
    /// cancelled).
    pub skipped: u64,
    /// Number of files that errored.
    pub errored: u64,
    /// The pipeline stage this event describes.
    pub stage: Stage,
    /// Wall-clock time elapsed since the job started.
    pub elapsed: Duration,
    /// Estimated remaining time, based on current throughput.
    pub estimated_remaining: Duration,
    /// Whether the job is still running.
    pub running: bool,
}

impl ProgressEvent {
    /// Normalise a possibly-NaN fraction to `0.0` per spec §3.
    pub fn normalise_fraction(fraction: f64) -> f64 {
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }
}

/// Trait for receiving progress updates during a job.
///
/// Implementations must be [`Send`] + [`Sync`]: the coordinator may invoke
/// this from any worker task.
pub trait ProgressCallback: Send + Sync {
    /// Called whenever a [`ProgressEvent`] is emitted.
    fn on_progress(&self, event: &ProgressEvent);
}

/// A no-op implementation, used when the caller registers no callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

#[derive(Default)]
struct LedgerState {
    global_cancelled: bool,
    cancelled_files: HashSet<PathBuf>,
}

/// Process-wide cancellation ledger (spec §3).
///
/// Recast from the source's module-global singleton into an explicit token
/// owned by the [`crate::pipeline::Pipeline`] façade and passed by reference
/// into every worker (spec §9's design note), so test isolation is trivial
/// and there is no hidden global state. A mutex guards both fields; reads
/// are frequent and cheap, matching the "low contention" assumption in
/// spec §3.
///
/// Monotonic set-only-grow during a run; [`reset`](CancellationLedger::reset)
/// clears it at job boundaries.
#[derive(Default)]
pub struct CancellationLedger {
    state: Mutex<LedgerState>,
}

impl CancellationLedger {
    /// Create a fresh, non-cancelled ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request global cancellation. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.state.lock().expect("cancellation ledger poisoned");
        state.global_cancelled = true;
    }

    /// Request cancellation of a single file by path. Idempotent; never
    /// affects other files (spec §4.9).
    pub fn cancel_file(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().expect("cancellation ledger poisoned");
        state.cancelled_files.insert(path.as_ref().to_path_buf());
    }

    /// `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_globally_cancelled(&self) -> bool {
        self.state.lock().expect("cancellation ledger poisoned").global_cancelled
    }

    /// `true` if this specific file has been individually cancelled, or the
    /// whole job has been globally cancelled.
    pub fn is_file_cancelled(&self, path: impl AsRef<Path>) -> bool {
        let state = self.state.lock().expect("cancellation ledger poisoned");
        state.global_cancelled || state.cancelled_files.contains(path.as_ref())
    }

    /// Clear both the global flag and the per-file set. Called by the
    /// façade at job boundaries — never mid-job.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("cancellation ledger poisoned");
        state.global_cancelled = false;
        state.cancelled_files.clear();
    }
}

/// Internal helper that tracks global-progress emission timing so the
/// coordinator can throttle to ≤4 Hz (spec §4.9: "≥250 ms between
/// emissions").
pub(crate) struct ProgressThrottle {
    last_emitted: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl ProgressThrottle {
    pub(crate) fn new() -> Self {
        Self {
            last_emitted: Mutex::new(None),
            min_interval: Duration::from_millis(250),
        }
    }

    /// Returns `true` if enough wall-clock time has passed since the last
    /// emission (or this is the first one) and records this attempt.
    pub(crate) fn should_emit(&self) -> bool {
        let mut last = self.last_emitted.lock().expect("progress throttle poisoned");
        let now = Instant::now();
        let ready = match *last {
            None => true,
            Some(previous) => now.duration_since(previous) >= self.min_interval,
        };
        if ready {
            *last = Some(now);
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_fraction_normalises_to_zero() {
        assert_eq!(ProgressEvent::normalise_fraction(f64::NAN), 0.0);
        assert_eq!(ProgressEvent::normalise_fraction(0.5), 0.5);
        assert_eq!(ProgressEvent::normalise_fraction(-1.0), 0.0);
        assert_eq!(ProgressEvent::normalise_fraction(2.0), 1.0);
    }

    #[test]
    fn per_file_cancel_does_not_affect_other_files() {
        let ledger = CancellationLedger::new();
        ledger.cancel_file("a.mp4");
        assert!(ledger.is_file_cancelled("a.mp4"));
        assert!(!ledger.is_file_cancelled("b.mp4"));
        assert!(!ledger.is_globally_cancelled());
    }

    #[test]
    fn global_cancel_covers_every_file() {
        let ledger = CancellationLedger::new();
        ledger.cancel();
        assert!(ledger.is_file_cancelled("anything.mp4"));
    }

    #[test]
    fn reset_clears_both_global_and_per_file_state() {
        let ledger = CancellationLedger::new();
        ledger.cancel();
        ledger.cancel_file("a.mp4");
        ledger.reset();
        assert!(!ledger.is_globally_cancelled());
        assert!(!ledger.is_file_cancelled("a.mp4"));
    }

    #[test]
    fn cancellation_is_monotonic_within_a_run() {
        let ledger = CancellationLedger::new();
        assert!(!ledger.is_file_cancelled("a.mp4"));
        ledger.cancel_file("a.mp4");
        assert!(ledger.is_file_cancelled("a.mp4"));
        // A subsequent observation never un-cancels within the same run.
        assert!(ledger.is_file_cancelled("a.mp4"));
    }
}
