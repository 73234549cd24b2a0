//! The stateless public façade (spec §4.10).
//!
//! Owns the [`CancellationLedger`] and the current [`PipelineConfig`],
//! forwarding progress via the same [`ProgressCallback`] trait shape the
//! teacher's own `progress` module uses. Every method is a thin delegate to
//! [`FileDiscovery`], [`Coordinator`], or [`PlaylistWriter`] — no state lives
//! here beyond configuration and the cancellation ledger.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};

use crate::config::{MosaicAspect, PipelineConfig};
use crate::coordinator::{Coordinator, OperationKind, RunSummary};
use crate::discovery::{FileDiscovery, FilePair};
use crate::error::MosaicError;
use crate::playlist::PlaylistWriter;
use crate::progress::{CancellationLedger, NoOpProgress, ProgressCallback};

/// The single entry point a caller (CLI, library consumer) needs.
///
/// Cheaply cloneable: the ledger and config live behind `Arc`/`RwLock`, so
/// handing a `Pipeline` to a UI layer and keeping one in a background task
/// is safe.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<RwLock<PipelineConfig>>,
    cancellation: Arc<CancellationLedger>,
    progress: Arc<dyn ProgressCallback>,
}

impl Pipeline {
    /// Build a façade with `config` and a progress callback. Pass
    /// `Arc::new(NoOpProgress)`-equivalent (see [`Self::silent`]) when no
    /// caller is listening.
    pub fn new(config: PipelineConfig, progress: Arc<dyn ProgressCallback>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            cancellation: Arc::new(CancellationLedger::new()),
            progress,
        }
    }

    /// A façade with default configuration and no progress observer.
    pub fn silent() -> Self {
        Self::new(PipelineConfig::default(), Arc::new(NoOpProgress))
    }

    fn config_snapshot(&self) -> PipelineConfig {
        self.config.read().expect("pipeline config lock poisoned").clone()
    }

    /// Enumerate videos under `root` via a directory walk.
    pub fn discover(&self, root: impl AsRef<Path>) -> Vec<FilePair> {
        let config = self.config_snapshot();
        FileDiscovery::new(&config).walk(root, None)
    }

    /// Enumerate videos referenced by an M3U-like playlist file.
    pub fn discover_playlist(&self, playlist_path: impl AsRef<Path>) -> Result<Vec<FilePair>, MosaicError> {
        let config = self.config_snapshot();
        FileDiscovery::new(&config).expand_playlist(playlist_path)
    }

    /// Enumerate videos created today (UTC) under `root`.
    pub fn discover_today(&self, root: impl AsRef<Path>) -> Vec<FilePair> {
        let config = self.config_snapshot();
        FileDiscovery::new(&config).today(root, Utc::now())
    }

    /// Enumerate videos created in `[start, end)` under `root`.
    pub fn discover_date_range(&self, root: impl AsRef<Path>, start: NaiveDate, end: NaiveDate) -> Vec<FilePair> {
        let config = self.config_snapshot();
        FileDiscovery::new(&config).date_range(root, start, end)
    }

    /// Generate mosaics for every pair in `pairs`.
    pub async fn generate_mosaics(&self, pairs: Vec<FilePair>) -> RunSummary {
        let config = self.config_snapshot();
        Coordinator::new(config).run(pairs, OperationKind::Mosaic, self.progress.clone(), self.cancellation.clone()).await
    }

    /// Generate previews for every pair in `pairs`.
    pub async fn generate_previews(&self, pairs: Vec<FilePair>) -> RunSummary {
        let config = self.config_snapshot();
        Coordinator::new(config).run(pairs, OperationKind::Preview, self.progress.clone(), self.cancellation.clone()).await
    }

    /// Write a standard playlist (one file per source directory).
    pub fn create_playlist(&self, directory: &Path, pairs: &[FilePair]) -> Result<PathBuf, MosaicError> {
        PlaylistWriter::write_standard(directory, pairs)
    }

    /// Write a date-range playlist.
    pub fn create_date_range_playlist(&self, directory: &Path, start: NaiveDate, end: NaiveDate, pairs: &[FilePair]) -> Result<PathBuf, MosaicError> {
        PlaylistWriter::write_dated(directory, start, Some(end), pairs)
    }

    /// Write a today playlist.
    pub fn create_today_playlist(&self, directory: &Path, pairs: &[FilePair]) -> Result<PathBuf, MosaicError> {
        PlaylistWriter::write_dated(directory, Utc::now().date_naive(), None, pairs)
    }

    /// Request global cancellation of any in-flight run.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Request cancellation of a single file.
    pub fn cancel_file(&self, path: impl AsRef<Path>) {
        self.cancellation.cancel_file(path);
    }

    /// Replace the active configuration wholesale.
    pub fn update_config(&self, config: PipelineConfig) {
        *self.config.write().expect("pipeline config lock poisoned") = config;
    }

    /// Adjust the worker-slot budget without disturbing other settings.
    pub fn update_max_concurrency(&self, max_concurrent_operations: usize) {
        self.config.write().expect("pipeline config lock poisoned").max_concurrent_operations = max_concurrent_operations.max(1);
    }

    /// Adjust the target mosaic aspect ratio without disturbing other settings.
    pub fn update_mosaic_aspect(&self, aspect: MosaicAspect) {
        self.config.write().expect("pipeline config lock poisoned").mosaic_aspect_ratio = aspect;
    }

    /// Clear all cancellation state, ready for a fresh run.
    pub fn reset(&self) {
        self.cancellation.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_pipeline_starts_uncancelled() {
        let pipeline = Pipeline::silent();
        assert!(!pipeline.cancellation.is_globally_cancelled());
    }

    #[test]
    fn cancel_then_reset_clears_state() {
        let pipeline = Pipeline::silent();
        pipeline.cancel();
        assert!(pipeline.cancellation.is_globally_cancelled());
        pipeline.reset();
        assert!(!pipeline.cancellation.is_globally_cancelled());
    }

    #[test]
    fn update_max_concurrency_floors_at_one() {
        let pipeline = Pipeline::silent();
        pipeline.update_max_concurrency(0);
        assert_eq!(pipeline.config_snapshot().max_concurrent_operations, 1);
    }

    #[test]
    fn update_mosaic_aspect_changes_config() {
        let pipeline = Pipeline::silent();
        pipeline.update_mosaic_aspect(MosaicAspect::Square);
        assert_eq!(pipeline.config_snapshot().mosaic_aspect_ratio, MosaicAspect::Square);
    }
}
