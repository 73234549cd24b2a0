//! Pipeline configuration.
//!
//! [`PipelineConfig`] is a builder that threads every option recognised by
//! the core (spec §6) through the façade and coordinator without polluting
//! every function signature — modelled on the teacher's `ExtractionConfig`
//! builder.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::error::MosaicError;

/// Sampling/layout density (spec §3).
///
/// Ordered from sparsest ([`Density::Xxs`]) to densest ([`Density::Xxl`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Density {
    /// Sparsest: fewest thumbnails, most extracts-per-minute headroom.
    Xxs,
    Xs,
    S,
    /// Default density.
    M,
    L,
    Xl,
    /// Densest: most thumbnails, fewest preview extracts.
    Xxl,
}

impl Density {
    /// Canonical uppercase name, e.g. `"XXS"`.
    pub fn raw_value(self) -> &'static str {
        match self {
            Density::Xxs => "XXS",
            Density::Xs => "XS",
            Density::S => "S",
            Density::M => "M",
            Density::L => "L",
            Density::Xl => "XL",
            Density::Xxl => "XXL",
        }
    }

    /// Parse a canonical name back into a [`Density`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "XXS" => Some(Density::Xxs),
            "XS" => Some(Density::Xs),
            "S" => Some(Density::S),
            "M" => Some(Density::M),
            "L" => Some(Density::L),
            "XL" => Some(Density::Xl),
            "XXL" => Some(Density::Xxl),
            _ => None,
        }
    }

    /// Sampling factor: scales mosaic thumbnail count inversely (spec §3).
    pub fn sampling_factor(self) -> f64 {
        match self {
            Density::Xxs => 0.25,
            Density::Xs => 0.5,
            Density::S => 0.75,
            Density::M => 1.0,
            Density::L => 2.0,
            Density::Xl => 3.0,
            Density::Xxl => 4.0,
        }
    }

    /// Extracts multiplier for previews: reciprocal-ish of the sampling
    /// factor (spec §3).
    pub fn extracts_multiplier(self) -> f64 {
        match self {
            Density::Xxs => 3.0,
            Density::Xs => 2.0,
            Density::S => 1.5,
            Density::M => 1.0,
            Density::L => 0.75,
            Density::Xl => 0.5,
            Density::Xxl => 0.25,
        }
    }

    /// Custom-layout geometry template: `(large_cols, large_rows, small_cols, small_rows)`.
    pub fn layout_template(self) -> (u32, u32, u32, u32) {
        match self {
            Density::Xxs => (1, 1, 2, 1),
            Density::Xs => (2, 1, 3, 2),
            Density::S => (3, 1, 6, 3),
            Density::M => (4, 2, 8, 4),
            Density::L => (4, 3, 10, 5),
            Density::Xl => (3, 2, 6, 3),
            Density::Xxl => (2, 1, 4, 2),
        }
    }
}

impl Default for Density {
    fn default() -> Self {
        Density::M
    }
}

/// Target mosaic aspect ratio, exposed as the `1x1|16x9|9x16` output tag
/// (spec §4.7, §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MosaicAspect {
    /// 1:1 square.
    Square,
    /// 16:9 landscape.
    Wide,
    /// 9:16 portrait.
    Tall,
}

impl MosaicAspect {
    /// The numeric aspect ratio (`width / height`).
    pub fn ratio(self) -> f64 {
        match self {
            MosaicAspect::Square => 1.0,
            MosaicAspect::Wide => 16.0 / 9.0,
            MosaicAspect::Tall => 9.0 / 16.0,
        }
    }

    /// The directory/filename tag, e.g. `"16x9"`.
    pub fn tag(self) -> &'static str {
        match self {
            MosaicAspect::Square => "1x1",
            MosaicAspect::Wide => "16x9",
            MosaicAspect::Tall => "9x16",
        }
    }

    /// Pick the tag matching a ratio exactly `1.0`, else the closest of the
    /// three canonical tags (testable property #14).
    pub fn from_ratio(ratio: f64) -> Self {
        if (ratio - 1.0).abs() < f64::EPSILON {
            MosaicAspect::Square
        } else if ratio >= 1.0 {
            MosaicAspect::Wide
        } else {
            MosaicAspect::Tall
        }
    }
}

/// Mosaic output raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// HEIC, the primary format (requires the `heic` feature).
    Heic,
    /// JPEG, lossy with a quality knob.
    Jpeg,
    /// PNG, lossless.
    Png,
}

impl OutputFormat {
    /// Parse a configuration string into an [`OutputFormat`].
    ///
    /// # Errors
    /// Returns [`MosaicError::UnsupportedOutputFormat`] for anything else.
    pub fn parse(value: &str) -> Result<Self, MosaicError> {
        match value.to_ascii_lowercase().as_str() {
            "heic" => Ok(OutputFormat::Heic),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(MosaicError::UnsupportedOutputFormat(other.to_string())),
        }
    }

    /// File extension used in generated filenames.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Heic => "heic",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }
}

/// Geometry mode for [`crate::layout::LayoutPlanner`] (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Row-search geometry balancing fill ratio against requested count.
    Classic,
    /// Density-indexed template geometry with portrait/landscape growth.
    Custom,
}

/// Configuration for a mosaic/preview/playlist job (spec §6's option table).
///
/// All fields have sensible defaults; a default-constructed config matches
/// the source application's factory defaults.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Mosaic pixel width.
    pub width: u32,
    /// Sampling/layout density.
    pub density: Density,
    /// Output encoding.
    pub format: OutputFormat,
    /// HEIC/JPEG quality, `[0, 1]`.
    pub compression_quality: f64,
    /// Skip sources shorter than this many seconds.
    pub min_duration: f64,
    /// Target preview length in seconds.
    pub preview_duration: f64,
    /// Replace existing output rather than skipping with `ExistingVid`.
    pub overwrite: bool,
    /// Use the custom density-template planner instead of classic row-search.
    pub custom_layout: bool,
    /// Encode the full source path (hyphen-joined) into the output filename
    /// instead of the bare file stem.
    pub add_full_path: bool,
    /// Also write a playlist after a mosaic batch completes.
    pub summary: bool,
    /// Nest outputs in a per-`DurationClass` subdirectory.
    pub separate_folders: bool,
    /// Place outputs next to the input root rather than next to each source.
    pub save_at_root: bool,
    /// Zero-tolerance seeks (accurate) vs. ±2s tolerance (loose).
    pub accurate_timestamps: bool,
    /// Worker slot budget; must be ≥ 1.
    pub max_concurrent_operations: usize,
    /// Target mosaic aspect ratio.
    pub mosaic_aspect_ratio: MosaicAspect,
    /// Opaque preset string passed through verbatim to the preview exporter.
    pub video_export_preset: String,
    /// Subdirectory name videos are nested under (`ThDir`).
    pub thumbnail_subdirectory: String,
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineConfig")
            .field("width", &self.width)
            .field("density", &self.density)
            .field("format", &self.format)
            .field("compression_quality", &self.compression_quality)
            .field("min_duration", &self.min_duration)
            .field("preview_duration", &self.preview_duration)
            .field("overwrite", &self.overwrite)
            .field("custom_layout", &self.custom_layout)
            .field("max_concurrent_operations", &self.max_concurrent_operations)
            .field("mosaic_aspect_ratio", &self.mosaic_aspect_ratio)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 2000,
            density: Density::M,
            format: OutputFormat::Jpeg,
            compression_quality: 0.8,
            min_duration: 0.0,
            preview_duration: 30.0,
            overwrite: false,
            custom_layout: false,
            add_full_path: false,
            summary: false,
            separate_folders: false,
            save_at_root: false,
            accurate_timestamps: false,
            max_concurrent_operations: 4,
            mosaic_aspect_ratio: MosaicAspect::Wide,
            video_export_preset: "AVAssetExportPresetMediumQuality".to_string(),
            thumbnail_subdirectory: "ThDir".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mosaic pixel width.
    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the sampling/layout density.
    #[must_use]
    pub fn with_density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    /// Set the output encoding format.
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set HEIC/JPEG compression quality, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_compression_quality(mut self, quality: f64) -> Self {
        self.compression_quality = quality.clamp(0.0, 1.0);
        self
    }

    /// Set the minimum source duration gate, in seconds.
    #[must_use]
    pub fn with_min_duration(mut self, seconds: f64) -> Self {
        self.min_duration = seconds.max(0.0);
        self
    }

    /// Set the target preview length, in seconds.
    #[must_use]
    pub fn with_preview_duration(mut self, seconds: f64) -> Self {
        self.preview_duration = seconds.max(0.0);
        self
    }

    /// Control whether existing outputs are replaced.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Select the custom density-template planner.
    #[must_use]
    pub fn with_custom_layout(mut self, custom: bool) -> Self {
        self.custom_layout = custom;
        self
    }

    /// Control whether the full source path is encoded into filenames.
    #[must_use]
    pub fn with_add_full_path(mut self, add_full_path: bool) -> Self {
        self.add_full_path = add_full_path;
        self
    }

    /// Control whether a playlist is written after a mosaic batch.
    #[must_use]
    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    /// Control per-`DurationClass` subdirectory nesting.
    #[must_use]
    pub fn with_separate_folders(mut self, separate: bool) -> Self {
        self.separate_folders = separate;
        self
    }

    /// Control whether outputs land next to the root rather than each source.
    #[must_use]
    pub fn with_save_at_root(mut self, save_at_root: bool) -> Self {
        self.save_at_root = save_at_root;
        self
    }

    /// Control zero-tolerance (accurate) vs. ±2s (loose) seeking.
    #[must_use]
    pub fn with_accurate_timestamps(mut self, accurate: bool) -> Self {
        self.accurate_timestamps = accurate;
        self
    }

    /// Set the worker slot budget, clamped to a minimum of 1.
    #[must_use]
    pub fn with_max_concurrent_operations(mut self, slots: usize) -> Self {
        self.max_concurrent_operations = slots.max(1);
        self
    }

    /// Set the target mosaic aspect ratio.
    #[must_use]
    pub fn with_mosaic_aspect_ratio(mut self, aspect: MosaicAspect) -> Self {
        self.mosaic_aspect_ratio = aspect;
        self
    }

    /// Set the opaque video export preset string.
    #[must_use]
    pub fn with_video_export_preset(mut self, preset: impl Into<String>) -> Self {
        self.video_export_preset = preset.into();
        self
    }

    /// Geometry mode implied by [`custom_layout`](Self::custom_layout).
    pub fn layout_mode(&self) -> LayoutMode {
        if self.custom_layout {
            LayoutMode::Custom
        } else {
            LayoutMode::Classic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_round_trips_through_raw_value() {
        for density in [
            Density::Xxs,
            Density::Xs,
            Density::S,
            Density::M,
            Density::L,
            Density::Xl,
            Density::Xxl,
        ] {
            let name = density.raw_value();
            assert_eq!(Density::from_name(name).unwrap(), density);
        }
    }

    #[test]
    fn density_extremes_have_expected_factors() {
        assert_eq!(Density::Xxl.sampling_factor(), 4.0);
        assert_eq!(Density::Xxs.sampling_factor(), 0.25);
        assert_eq!(Density::Xxl.extracts_multiplier(), 0.25);
        assert_eq!(Density::Xxs.extracts_multiplier(), 3.0);
    }

    #[test]
    fn aspect_square_exactly_one() {
        assert_eq!(MosaicAspect::from_ratio(1.0).tag(), "1x1");
        assert_eq!(MosaicAspect::from_ratio(16.0 / 9.0).tag(), "16x9");
        assert_eq!(MosaicAspect::from_ratio(9.0 / 16.0).tag(), "9x16");
    }

    #[test]
    fn format_parse_rejects_unknown() {
        assert!(OutputFormat::parse("tga").is_err());
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("HEIC").unwrap(), OutputFormat::Heic);
    }

    #[test]
    fn builder_clamps_quality_and_slots() {
        let config = PipelineConfig::new()
            .with_compression_quality(5.0)
            .with_max_concurrent_operations(0);
        assert_eq!(config.compression_quality, 1.0);
        assert_eq!(config.max_concurrent_operations, 1);
    }
}
