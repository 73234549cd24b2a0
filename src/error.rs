//! Error types for the `mosaicgen` crate.
//!
//! This module defines [`MosaicError`], the unified error type returned by all
//! fallible operations. Variants carry enough context to diagnose the
//! problem without additional logging, and document which coordinator
//! disposition (skip, error, cancel, job-fatal) they map to per the error
//! taxonomy.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `mosaicgen` operations.
///
/// Every public method that can fail returns `Result<T, MosaicError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MosaicError {
    /// The input path does not exist at the point of use. Fatal for that file.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The container could not be opened or gave no indication of being
    /// playable.
    #[error("not a video file at {}: {reason}", .path.display())]
    NotAVideoFile {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container opened but carries no video track.
    #[error("no video track in {}", .0.display())]
    NoVideoTrack(PathBuf),

    /// Neither a video nor an audio track could be found.
    #[error("no video or audio track in {}", .0.display())]
    NoVideoOrAudioTrack(PathBuf),

    /// Probed duration is shorter than the configured minimum. Expected
    /// steady-state outcome — counted as *skipped*, not errored.
    #[error("source shorter than minimum duration ({duration:.1}s < {minimum:.1}s)")]
    TooShort {
        /// Probed duration in seconds.
        duration: f64,
        /// Configured minimum duration in seconds.
        minimum: f64,
    },

    /// The deterministic output path already exists and overwrite is
    /// disabled. Expected steady-state outcome — counted as *skipped*.
    #[error("output already exists: {}", .0.display())]
    ExistingVid(PathBuf),

    /// The compositor failed to allocate or prepare a raster context.
    #[error("unable to create mosaic context: {0}")]
    UnableToCreateContext(String),

    /// The compositor failed to produce a finished raster image.
    #[error("unable to generate mosaic: {0}")]
    UnableToGenerateMosaic(String),

    /// The encoder failed to persist the finished mosaic.
    #[error("unable to save mosaic: {0}")]
    UnableToSaveMosaic(String),

    /// The requested output format identifier is not recognised. Fatal for
    /// the whole job — bad configuration, not a per-file fault.
    #[error("unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    /// Every timestamp sampled from the source failed to decode.
    #[error("partial failure sampling frames: {success} succeeded, {failed} failed")]
    PartialFailure {
        /// Number of timestamps that decoded successfully (always 0 when
        /// this variant is raised — see spec §4.2).
        success: u32,
        /// Number of timestamps that failed to decode.
        failed: u32,
    },

    /// The preview exporter did not finish within its allotted time.
    #[error("preview export timed out")]
    ExportTimeout,

    /// The preview exporter could not be constructed.
    #[error("unable to create export session: {0}")]
    UnableToCreateExportSession(String),

    /// The preview exporter could not build its composition tracks.
    #[error("unable to create composition tracks: {0}")]
    UnableToCreateCompositionTracks(String),

    /// The operation was cancelled, globally or for this file, via the
    /// [`CancellationLedger`](crate::progress::CancellationLedger).
    #[error("operation cancelled")]
    Cancelled,

    /// A video frame could not be decoded.
    #[error("failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("ffmpeg error: {0}")]
    FfmpegError(String),

    /// An error from the `image` crate during frame conversion or encoding.
    #[error("image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for MosaicError {
    fn from(error: FfmpegError) -> Self {
        MosaicError::FfmpegError(error.to_string())
    }
}

/// How the coordinator should account for a worker's terminal error, per
/// spec §4.9's scheduling algorithm and §7's propagation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Increment the `skipped` counter; not a fault.
    Skipped,
    /// Increment the `errored` counter; other files continue.
    Errored,
    /// Cooperative cancellation observed; logged distinctly but counted
    /// alongside skips per spec §4.9.
    Cancelled,
    /// Aborts the whole job (bad configuration propagated from outside the
    /// per-file worker loop).
    JobFatal,
}

impl MosaicError {
    /// Classify this error into a coordinator-visible outcome.
    pub fn disposition(&self) -> Disposition {
        match self {
            MosaicError::ExistingVid(_) | MosaicError::TooShort { .. } => Disposition::Skipped,
            MosaicError::Cancelled => Disposition::Cancelled,
            MosaicError::UnsupportedOutputFormat(_) => Disposition::JobFatal,
            _ => Disposition::Errored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_and_too_short_are_skips() {
        assert_eq!(
            MosaicError::ExistingVid(PathBuf::from("x")).disposition(),
            Disposition::Skipped
        );
        assert_eq!(
            MosaicError::TooShort {
                duration: 1.0,
                minimum: 30.0
            }
            .disposition(),
            Disposition::Skipped
        );
    }

    #[test]
    fn cancelled_is_distinct_from_skipped() {
        assert_eq!(MosaicError::Cancelled.disposition(), Disposition::Cancelled);
    }

    #[test]
    fn unsupported_format_is_job_fatal() {
        assert_eq!(
            MosaicError::UnsupportedOutputFormat("tga".into()).disposition(),
            Disposition::JobFatal
        );
    }

    #[test]
    fn decode_error_is_errored() {
        assert_eq!(
            MosaicError::VideoDecodeError("boom".into()).disposition(),
            Disposition::Errored
        );
    }
}
