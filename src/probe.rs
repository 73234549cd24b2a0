//! Media probing.
//!
//! [`MediaProbe`] opens a source file with FFmpeg just long enough to read
//! container/stream metadata, mirroring the open-time metadata extraction in
//! the teacher's `MediaUnbundler::open`, but narrowed to what the mosaic/
//! preview pipeline actually needs (spec §4.1).

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::error::MosaicError;
use crate::metadata::VideoMetadata;

/// Stateless prober: opens a file, reads its metadata, and closes it again.
///
/// Unlike the teacher's `MediaUnbundler`, `MediaProbe` does not stay open for
/// later frame extraction — each sampled frame reopens its own decode
/// context (see [`crate::sampler::ThumbnailSampler`]), matching how the
/// teacher's `video.rs::frame` rebuilds a fresh `CodecContext` per seek.
pub struct MediaProbe;

impl MediaProbe {
    /// Open `path` and extract its [`VideoMetadata`].
    ///
    /// # Errors
    /// - [`MosaicError::InputNotFound`] if `path` does not exist.
    /// - [`MosaicError::NotAVideoFile`] if FFmpeg cannot open the container.
    /// - [`MosaicError::NoVideoTrack`] if the container has no video stream.
    pub fn open(path: impl AsRef<Path>) -> Result<VideoMetadata, MosaicError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MosaicError::InputNotFound(path.to_path_buf()));
        }

        ffmpeg_next::init().map_err(|error| MosaicError::NotAVideoFile {
            path: path.to_path_buf(),
            reason: format!("ffmpeg init failed: {error}"),
        })?;

        let input_context: Input = ffmpeg_next::format::input(&path).map_err(|error| MosaicError::NotAVideoFile {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let video_stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| MosaicError::NoVideoTrack(path.to_path_buf()))?;

        let codec_parameters = video_stream.parameters();
        let decoder_context = CodecContext::from_parameters(codec_parameters).map_err(|error| MosaicError::NotAVideoFile {
            path: path.to_path_buf(),
            reason: format!("failed to read video codec parameters: {error}"),
        })?;
        let video_decoder = decoder_context.decoder().video().map_err(|error| MosaicError::NotAVideoFile {
            path: path.to_path_buf(),
            reason: format!("failed to create video decoder: {error}"),
        })?;

        let width = video_decoder.width();
        let height = video_decoder.height();

        drop(video_stream);

        let duration_microseconds = input_context.duration();
        let duration_seconds = if duration_microseconds > 0 {
            Some(duration_microseconds as f64 / 1_000_000.0)
        } else {
            None
        };

        let codec_names: Vec<String> = input_context
            .streams()
            .filter_map(|stream| {
                let medium = stream.parameters().medium();
                if medium != Type::Video && medium != Type::Audio {
                    return None;
                }
                let codec_context = CodecContext::from_parameters(stream.parameters()).ok()?;
                let codec_name = codec_context.id().name();
                let medium_name = if medium == Type::Video { "video" } else { "audio" };
                Some(format!("{medium_name}/{codec_name}"))
            })
            .collect();
        let codec = if codec_names.is_empty() {
            "unknown".to_string()
        } else {
            codec_names.join(",")
        };

        let container_format = input_context.format().name().to_string();

        let creation_date = input_context
            .metadata()
            .get("creation_time")
            .and_then(parse_creation_time);

        Ok(VideoMetadata {
            source_path: path.to_path_buf(),
            duration_seconds,
            width,
            height,
            codec,
            container_format,
            creation_date,
        })
    }

    /// Probe only for an openability check, without building full metadata.
    /// Used by [`crate::discovery::FileDiscovery`] fast-path filtering.
    pub fn can_open(path: impl AsRef<Path>) -> bool {
        Self::open(path).is_ok()
    }
}

fn parse_creation_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_local_datetime(&naive).single();
    }
    None
}
