//! Preview video assembly.
//!
//! Grounded on the teacher's `remux.rs` (stream-copy packet pump: add
//! matching output streams, rescale PTS/DTS, `write_interleaved`) and
//! `encode.rs`/`transcode.rs` (progress-tracked export loop). Preview
//! assembly splices several short clips from one source into a single
//! output container via the same copy-packets-without-re-encoding idiom,
//! repeated once per extract and offset by a running PTS accumulator.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ffmpeg_next::{Rational, codec::Id, media::Type};

use crate::config::{Density, PipelineConfig};
use crate::error::MosaicError;
use crate::metadata::VideoMetadata;
use crate::progress::{CancellationLedger, ProgressCallback, ProgressEvent, ProgressKind, Stage};
use crate::util::seconds_to_stream_timestamp;

/// Derived extract plan for a preview (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractPlan {
    /// Number of extracts, K.
    pub extract_count: u32,
    /// Per-extract length in seconds, ℓ.
    pub extract_length: f64,
    /// Final preview length, ℓ·K.
    pub total_length: f64,
}

/// Derive the extract count/length for a preview of `requested_seconds`
/// drawn from a source of `duration_seconds`, at `density`, with a
/// `min_extract_seconds` floor (spec §4.6).
///
/// `rate(D) = (12 / (1 + 0.2·(D/60))) / density.multiplier`, floored at 12
/// extracts/minute when `D <= 0`.
pub fn derive_extract_plan(duration_seconds: f64, requested_seconds: f64, min_extract_seconds: f64, density: Density) -> ExtractPlan {
    let rate_per_minute = if duration_seconds <= 0.0 {
        12.0
    } else {
        (12.0 / (1.0 + 0.2 * (duration_seconds / 60.0))) / density.extracts_multiplier()
    };

    let extract_count = ((duration_seconds / 60.0) * rate_per_minute).ceil().max(1.0) as u32;
    let extract_length = min_extract_seconds.max(requested_seconds / extract_count as f64);
    let total_length = extract_length * extract_count as f64;

    ExtractPlan { extract_count, extract_length, total_length }
}

/// Evenly spaced start points for `plan.extract_count` clips of
/// `plan.extract_length` seconds across a source of `duration_seconds`.
pub fn evenly_spaced_starts(duration_seconds: f64, plan: &ExtractPlan) -> Vec<f64> {
    let span = (duration_seconds - plan.extract_length).max(0.0);
    if plan.extract_count <= 1 {
        return vec![0.0];
    }
    (0..plan.extract_count)
        .map(|index| span * index as f64 / (plan.extract_count - 1) as f64)
        .collect()
}

/// Splices evenly spaced clips from a source into a single preview file.
pub struct PreviewAssembler<'a> {
    progress: &'a dyn ProgressCallback,
    cancellation: &'a CancellationLedger,
}

impl<'a> PreviewAssembler<'a> {
    pub fn new(progress: &'a dyn ProgressCallback, cancellation: &'a CancellationLedger) -> Self {
        Self { progress, cancellation }
    }

    /// Output path for a preview: `{stem}-amprv-{density}-{K}.mp4`, placed in
    /// a sibling `amprv` directory next to the source (spec §6).
    pub fn output_path(source_path: &Path, density: Density, extract_count: u32) -> PathBuf {
        let parent = source_path.parent().unwrap_or(Path::new("."));
        let directory = parent.join("amprv");
        let stem = source_path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "output".to_string());
        directory.join(format!("{stem}-amprv-{}-{extract_count}.mp4", density.raw_value()))
    }

    /// Assemble a preview from `source_path`, writing to the deterministic
    /// output path derived from `density` and the plan's extract count.
    ///
    /// Time-scaling each inserted range (spec §4.6's `speedMultiplier`) is
    /// preserved as a parameter defaulting to `1.0`; the source application
    /// never wired it to anything else, so this implementation passes it
    /// through to timestamp rescaling and otherwise leaves it unused
    /// (Design Notes §9).
    pub fn assemble(&self, source_path: &Path, metadata: &VideoMetadata, config: &PipelineConfig) -> Result<PathBuf, MosaicError> {
        let duration = metadata.duration_or_zero();
        let plan = derive_extract_plan(duration, config.preview_duration, 1.0, config.density);
        let starts = evenly_spaced_starts(duration, &plan);
        let output_path = Self::output_path(source_path, config.density, plan.extract_count);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.emit(Stage::Extract, 0.0, Some(source_path));

        let speed_multiplier = 1.0_f64;
        let result = self.splice(source_path, &output_path, &starts, plan.extract_length, speed_multiplier);

        if result.is_err() || self.cancellation.is_file_cancelled(source_path) {
            let _ = fs::remove_file(&output_path);
        }
        if self.cancellation.is_file_cancelled(source_path) {
            return Err(MosaicError::Cancelled);
        }

        result?;
        self.emit(Stage::Done, 1.0, Some(source_path));
        Ok(output_path)
    }

    fn splice(&self, source_path: &Path, output_path: &Path, starts: &[f64], extract_length: f64, speed_multiplier: f64) -> Result<(), MosaicError> {
        ffmpeg_next::init()?;

        let mut output_context = ffmpeg_next::format::output(&output_path)
            .map_err(|error| MosaicError::UnableToCreateExportSession(error.to_string()))?;

        let mut stream_map: Vec<Option<usize>> = Vec::new();
        {
            let input_context = ffmpeg_next::format::input(&source_path).map_err(|error| MosaicError::NotAVideoFile {
                path: source_path.to_path_buf(),
                reason: error.to_string(),
            })?;

            let mut output_stream_count = 0usize;
            for stream in input_context.streams() {
                let medium = stream.parameters().medium();
                let include = matches!(medium, Type::Video | Type::Audio);
                if include {
                    let mut out_stream = output_context
                        .add_stream(ffmpeg_next::encoder::find(Id::None))
                        .map_err(|error| MosaicError::UnableToCreateCompositionTracks(error.to_string()))?;
                    out_stream.set_parameters(stream.parameters());
                    unsafe {
                        (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
                    }
                    stream_map.push(Some(output_stream_count));
                    output_stream_count += 1;
                } else {
                    stream_map.push(None);
                }
            }
        }

        output_context.write_header().map_err(|error| MosaicError::UnableToCreateExportSession(error.to_string()))?;

        let mut pts_offset_per_stream: Vec<i64> = vec![0; stream_map.len()];
        let started = Instant::now();
        let mut last_probe = Instant::now();
        let mut failed_segments = 0u32;

        for (segment_index, &start_seconds) in starts.iter().enumerate() {
            if self.cancellation.is_file_cancelled(source_path) {
                return Err(MosaicError::Cancelled);
            }

            let segment_result = self.copy_segment(
                source_path,
                &mut output_context,
                &stream_map,
                &mut pts_offset_per_stream,
                start_seconds,
                extract_length,
                speed_multiplier,
            );

            if segment_result.is_err() {
                failed_segments += 1;
                log::warn!("preview segment {segment_index} failed to insert for {}", source_path.display());
            }

            if last_probe.elapsed().as_millis() >= 500 {
                self.emit(Stage::Extract, (segment_index + 1) as f64 / starts.len().max(1) as f64, Some(source_path));
                last_probe = Instant::now();
            }
        }

        if failed_segments as usize == starts.len() && !starts.is_empty() {
            output_context.write_trailer().ok();
            return Err(MosaicError::PartialFailure { success: 0, failed: failed_segments });
        }

        output_context.write_trailer().map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
        let _ = started;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_segment(
        &self,
        source_path: &Path,
        output_context: &mut ffmpeg_next::format::context::Output,
        stream_map: &[Option<usize>],
        pts_offset_per_stream: &mut [i64],
        start_seconds: f64,
        extract_length: f64,
        speed_multiplier: f64,
    ) -> Result<(), MosaicError> {
        let mut input_context = ffmpeg_next::format::input(&source_path).map_err(|error| MosaicError::NotAVideoFile {
            path: source_path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let end_seconds = start_seconds + extract_length;

        for stream_index in 0..input_context.streams().count() {
            let time_base = input_context.stream(stream_index).expect("valid index").time_base();
            let target = seconds_to_stream_timestamp(start_seconds, time_base);
            let _ = input_context.seek(target, ..target);
        }

        for (stream, mut packet) in input_context.packets() {
            let input_index = stream.index();
            let Some(output_index) = stream_map.get(input_index).copied().flatten() else {
                continue;
            };

            let input_time_base = stream.time_base();
            let current_seconds = packet.pts().map(|pts| crate::util::pts_to_seconds(pts, input_time_base)).unwrap_or(0.0);
            if current_seconds > end_seconds {
                break;
            }
            if current_seconds < start_seconds {
                continue;
            }

            let output_time_base = output_context.stream(output_index).expect("added above").time_base();
            let rescaled_time_base = Rational::new(
                (input_time_base.numerator() as f64 * speed_multiplier.max(1e-9)).round() as i32,
                input_time_base.denominator(),
            );

            packet.set_stream(output_index);
            packet.rescale_ts(rescaled_time_base, output_time_base);

            if let Some(pts) = packet.pts() {
                packet.set_pts(Some(pts + pts_offset_per_stream[output_index]));
            }
            if let Some(dts) = packet.dts() {
                packet.set_dts(Some(dts + pts_offset_per_stream[output_index]));
            }
            packet.set_position(-1);
            packet
                .write_interleaved(output_context)
                .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
        }

        let segment_ticks = seconds_to_stream_timestamp(extract_length, Rational::new(1, 1));
        for offset in pts_offset_per_stream.iter_mut() {
            *offset += segment_ticks.max(1);
        }

        Ok(())
    }

    fn emit(&self, stage: Stage, fraction: f64, current_file: Option<&Path>) {
        self.progress.on_progress(&ProgressEvent {
            kind: ProgressKind::File,
            fraction: ProgressEvent::normalise_fraction(fraction),
            current_file: current_file.map(Path::to_path_buf),
            processed: 0,
            total: 0,
            skipped: 0,
            errored: 0,
            stage,
            elapsed: std::time::Duration::ZERO,
            estimated_remaining: std::time::Duration::ZERO,
            running: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_floors_at_twelve_for_non_positive_duration() {
        let plan = derive_extract_plan(0.0, 30.0, 1.0, Density::M);
        assert_eq!(plan.extract_count, 1);
    }

    #[test]
    fn extract_length_respects_minimum_floor() {
        let plan = derive_extract_plan(600.0, 5.0, 2.0, Density::M);
        assert!(plan.extract_length >= 2.0);
        assert_eq!(plan.total_length, plan.extract_length * plan.extract_count as f64);
    }

    #[test]
    fn denser_density_multiplies_extract_rate_down() {
        let sparse = derive_extract_plan(600.0, 30.0, 1.0, Density::Xxl);
        let dense = derive_extract_plan(600.0, 30.0, 1.0, Density::Xxs);
        assert!(dense.extract_count >= sparse.extract_count);
    }

    #[test]
    fn evenly_spaced_starts_span_the_available_window() {
        let plan = ExtractPlan { extract_count: 4, extract_length: 2.0, total_length: 8.0 };
        let starts = evenly_spaced_starts(100.0, &plan);
        assert_eq!(starts.len(), 4);
        assert_eq!(starts[0], 0.0);
        assert!((starts[3] - 98.0).abs() < 1e-9);
    }

    #[test]
    fn single_extract_starts_at_zero() {
        let plan = ExtractPlan { extract_count: 1, extract_length: 5.0, total_length: 5.0 };
        let starts = evenly_spaced_starts(100.0, &plan);
        assert_eq!(starts, vec![0.0]);
    }

    #[test]
    fn output_path_encodes_density_and_extract_count() {
        let path = PreviewAssembler::output_path(Path::new("/x/movie.mp4"), Density::L, 6);
        assert_eq!(path.file_name().unwrap().to_string_lossy(), "movie-amprv-L-6.mp4");
    }

    #[test]
    fn output_path_nests_in_a_sibling_amprv_directory() {
        let path = PreviewAssembler::output_path(Path::new("/x/movie.mp4"), Density::L, 6);
        assert_eq!(path.parent().unwrap(), Path::new("/x/amprv"));
    }
}
