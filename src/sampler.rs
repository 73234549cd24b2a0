//! Thumbnail sampling.
//!
//! [`ThumbnailSampler`] extracts still frames at computed timestamps. Each
//! call opens its own decode context and seeks independently, mirroring the
//! teacher's `VideoExtractor::frame`/`frame_at` pattern rather than keeping a
//! single demuxer open across samples — this is what makes per-timestamp
//! parallel extraction (grounded on the teacher's `parallel.rs`) safe to fan
//! out across threads.

use std::path::Path;

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    media::Type,
    software::scaling::{context::Context as ScalingContext, flag::Flags as ScalingFlags},
    util::frame::Video as VideoFrame,
};
use image::RgbaImage;

use crate::error::MosaicError;
use crate::metadata::VideoMetadata;
use crate::util::{format_hhmmss, frame_to_rgb_buffer};

/// Seek tolerance (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub enum SeekTolerance {
    /// Decode forward until the exact target frame is reached.
    Accurate,
    /// Accept the first decoded frame within ±2 seconds of the target.
    Loose,
}

impl SeekTolerance {
    fn window_seconds(self) -> f64 {
        match self {
            SeekTolerance::Accurate => 0.0,
            SeekTolerance::Loose => 2.0,
        }
    }
}

/// One sampled thumbnail: its pixels and the actual timestamp it landed on.
#[derive(Clone)]
pub struct SampledFrame {
    /// Decoded (or blank, on failure) image, sized to the requested bounds.
    pub image: RgbaImage,
    /// `HH:MM:SS` of the decoded frame, or `"00:00:00"` on failure.
    pub timestamp_label: String,
    /// Whether this slot is a blank fill rather than a real decode.
    pub is_blank: bool,
}

/// Build the thirds-weighted timestamp set for a mosaic of `count` frames
/// over a source of `duration_seconds` (spec §4.2).
///
/// The working window is `[0.05·D, 0.95·D]` (effective duration `E = 0.90·D`),
/// split into three bands — `0.20·N` points in the first third, `0.60·N` in
/// the middle, and the remainder in the last third — each evenly spaced
/// within its own band. This produces a denser cluster near the edges
/// without abandoning the middle of the video.
pub fn build_timestamp_set(duration_seconds: f64, count: u32) -> Vec<f64> {
    if count == 0 || duration_seconds <= 0.0 {
        return Vec::new();
    }

    let window_start = 0.05 * duration_seconds;
    let effective_duration = 0.90 * duration_seconds;

    let first_count = (0.20 * count as f64).floor() as u32;
    let middle_count = (0.60 * count as f64).floor() as u32;
    let last_count = count - first_count - middle_count;

    let mut timestamps = Vec::with_capacity(count as usize);
    timestamps.extend(evenly_spaced(window_start, effective_duration, 0.00, 0.33, first_count));
    timestamps.extend(evenly_spaced(window_start, effective_duration, 0.33, 0.67, middle_count));
    timestamps.extend(evenly_spaced(window_start, effective_duration, 0.67, 1.00, last_count));
    timestamps
}

fn evenly_spaced(window_start: f64, effective_duration: f64, band_start: f64, band_end: f64, count: u32) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    (0..count)
        .map(|index| {
            let fraction = if count == 1 {
                (band_start + band_end) / 2.0
            } else {
                band_start + (band_end - band_start) * (index as f64) / ((count - 1) as f64)
            };
            window_start + fraction * effective_duration
        })
        .collect()
}

/// Extracts still frames from a video file at arbitrary timestamps.
pub struct ThumbnailSampler<'a> {
    path: &'a Path,
    metadata: &'a VideoMetadata,
    tolerance: SeekTolerance,
}

impl<'a> ThumbnailSampler<'a> {
    /// Build a sampler for `path`, using `metadata` for duration clamping.
    pub fn new(path: &'a Path, metadata: &'a VideoMetadata, tolerance: SeekTolerance) -> Self {
        Self { path, metadata, tolerance }
    }

    /// Extract every timestamp in `timestamps_seconds`, in input order,
    /// scaled to `target_width` x `target_height`.
    ///
    /// Per-timestamp failures fill a blank transparent frame at
    /// `"00:00:00"` so the mosaic stays rectangular (spec §4.2). Only when
    /// every timestamp fails does this return
    /// [`MosaicError::PartialFailure`].
    #[cfg(feature = "parallel")]
    pub fn extract_many(&self, timestamps_seconds: &[f64], target_width: u32, target_height: u32) -> Result<Vec<SampledFrame>, MosaicError> {
        use rayon::prelude::*;

        let results: Vec<SampledFrame> = timestamps_seconds
            .par_iter()
            .map(|&timestamp| self.extract_one(timestamp, target_width, target_height))
            .collect();
        self.finish(results)
    }

    /// Sequential fallback used when the `parallel` feature is disabled.
    #[cfg(not(feature = "parallel"))]
    pub fn extract_many(&self, timestamps_seconds: &[f64], target_width: u32, target_height: u32) -> Result<Vec<SampledFrame>, MosaicError> {
        let results: Vec<SampledFrame> = timestamps_seconds
            .iter()
            .map(|&timestamp| self.extract_one(timestamp, target_width, target_height))
            .collect();
        self.finish(results)
    }

    fn finish(&self, results: Vec<SampledFrame>) -> Result<Vec<SampledFrame>, MosaicError> {
        let total = results.len() as u32;
        let failed = results.iter().filter(|frame| frame.is_blank).count() as u32;
        if total > 0 && failed == total {
            return Err(MosaicError::PartialFailure { success: 0, failed });
        }
        Ok(results)
    }

    /// Extract a single timestamp, falling back to a blank frame on failure
    /// rather than propagating the error — blanks are accounted for by the
    /// caller via [`SampledFrame::is_blank`].
    fn extract_one(&self, timestamp_seconds: f64, target_width: u32, target_height: u32) -> SampledFrame {
        match self.decode_at(timestamp_seconds, target_width, target_height) {
            Ok(frame) => frame,
            Err(_) => SampledFrame {
                image: RgbaImage::new(target_width, target_height),
                timestamp_label: "00:00:00".to_string(),
                is_blank: true,
            },
        }
    }

    fn decode_at(&self, timestamp_seconds: f64, target_width: u32, target_height: u32) -> Result<SampledFrame, MosaicError> {
        ffmpeg_next::init()?;
        let mut input_context: Input = ffmpeg_next::format::input(&self.path)?;

        let video_stream_index = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index())
            .ok_or_else(|| MosaicError::NoVideoTrack(self.path.to_path_buf()))?;

        let time_base = input_context
            .stream(video_stream_index)
            .expect("stream index from best()")
            .time_base();
        let codec_parameters = input_context
            .stream(video_stream_index)
            .expect("stream index from best()")
            .parameters();
        let decoder_context = CodecContext::from_parameters(codec_parameters)?;
        let mut decoder = decoder_context.decoder().video()?;

        let mut scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            target_width,
            target_height,
            ScalingFlags::BILINEAR,
        )?;

        let clamped_seconds = timestamp_seconds.clamp(0.0, self.metadata.duration_or_zero().max(0.0));
        let target_timestamp = crate::util::seconds_to_stream_timestamp(clamped_seconds, time_base);
        input_context.seek(target_timestamp, ..target_timestamp)?;

        let tolerance_seconds = self.tolerance.window_seconds();

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();

        for (stream, packet) in input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.pts().unwrap_or(0);
                let current_seconds = crate::util::pts_to_seconds(pts, time_base);
                if current_seconds + tolerance_seconds >= clamped_seconds {
                    scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return Ok(sampled_frame_from_rgb(&rgb_frame, target_width, target_height, current_seconds));
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            let pts = decoded_frame.pts().unwrap_or(0);
            let current_seconds = crate::util::pts_to_seconds(pts, time_base);
            return Ok(sampled_frame_from_rgb(&rgb_frame, target_width, target_height, current_seconds));
        }

        Err(MosaicError::VideoDecodeError(format!(
            "no frame found at or after {clamped_seconds:.3}s in {}",
            self.path.display()
        )))
    }
}

fn sampled_frame_from_rgb(frame: &VideoFrame, width: u32, height: u32, actual_seconds: f64) -> SampledFrame {
    let buffer = frame_to_rgb_buffer(frame, width, height);
    let mut image = RgbaImage::new(width, height);
    for (rgba, rgb) in image.pixels_mut().zip(buffer.chunks_exact(3)) {
        *rgba = image::Rgba([rgb[0], rgb[1], rgb[2], 255]);
    }
    SampledFrame {
        image,
        timestamp_label: format_hhmmss(actual_seconds),
        is_blank: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_metadata() -> VideoMetadata {
        VideoMetadata {
            source_path: PathBuf::from("fixture.mp4"),
            duration_seconds: Some(120.0),
            width: 1920,
            height: 1080,
            codec: "video/h264".into(),
            container_format: "mov".into(),
            creation_date: None,
        }
    }

    #[test]
    fn timestamp_set_has_requested_count_and_stays_in_window() {
        let timestamps = build_timestamp_set(100.0, 20);
        assert_eq!(timestamps.len(), 20);
        for &timestamp in &timestamps {
            assert!(timestamp >= 5.0 - 1e-9 && timestamp <= 95.0 + 1e-9, "{timestamp} out of window");
        }
    }

    #[test]
    fn timestamp_set_splits_into_thirds_by_floor() {
        // count=10 -> first=floor(2.0)=2, middle=floor(6.0)=6, last=10-2-6=2
        let timestamps = build_timestamp_set(300.0, 10);
        assert_eq!(timestamps.len(), 10);
    }

    #[test]
    fn zero_count_or_duration_yields_no_timestamps() {
        assert!(build_timestamp_set(100.0, 0).is_empty());
        assert!(build_timestamp_set(0.0, 10).is_empty());
    }

    #[test]
    fn missing_file_surfaces_as_a_blank_fill_not_a_panic() {
        let metadata = fixture_metadata();
        let path = PathBuf::from("/nonexistent/fixture.mp4");
        let sampler = ThumbnailSampler::new(&path, &metadata, SeekTolerance::Accurate);
        let result = sampler.extract_many(&[1.0, 2.0, 3.0], 320, 180);
        assert!(matches!(result, Err(MosaicError::PartialFailure { success: 0, failed: 3 })));
    }
}
