//! Media metadata types.
//!
//! [`VideoMetadata`] is produced once by [`crate::probe::MediaProbe::open`]
//! and consumed by the layout planner, the sampler, and the compositor's
//! metadata strip.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Coarse duration bucket used in filenames, directory nesting, and
/// duration-bucketed playlists (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationClass {
    /// Shorter than 60 seconds.
    Xs,
    /// 60 to 300 seconds.
    S,
    /// 300 to 900 seconds.
    M,
    /// 900 to 1800 seconds.
    L,
    /// 1800 seconds or longer.
    Xl,
    /// Duration could not be determined (non-finite or negative). Used only
    /// by [`crate::playlist::PlaylistWriter`].
    Unknown,
}

impl DurationClass {
    /// Classify a probed duration in seconds.
    pub fn classify(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds < 0.0 {
            return DurationClass::Unknown;
        }
        if seconds < 60.0 {
            DurationClass::Xs
        } else if seconds < 300.0 {
            DurationClass::S
        } else if seconds < 900.0 {
            DurationClass::M
        } else if seconds < 1800.0 {
            DurationClass::L
        } else {
            DurationClass::Xl
        }
    }

    /// The canonical short tag used in filenames and playlist names.
    pub fn tag(self) -> &'static str {
        match self {
            DurationClass::Xs => "XS",
            DurationClass::S => "S",
            DurationClass::M => "M",
            DurationClass::L => "L",
            DurationClass::Xl => "XL",
            DurationClass::Unknown => "U",
        }
    }

    /// All classes used by duration-bucketed playlist generation, in the
    /// order PlaylistWriter emits them.
    pub fn bucketed_order() -> [DurationClass; 6] {
        [
            DurationClass::Xs,
            DurationClass::S,
            DurationClass::M,
            DurationClass::L,
            DurationClass::Xl,
            DurationClass::Unknown,
        ]
    }
}

/// Metadata for a probed video file.
///
/// Immutable once created by [`crate::probe::MediaProbe::open`]. Consumed by
/// [`crate::layout::LayoutPlanner`] and [`crate::compositor::MosaicCompositor`].
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Absolute or caller-relative path to the source file.
    pub source_path: PathBuf,
    /// Duration in seconds. `None` when the container reported a
    /// non-finite or negative duration (classified as [`DurationClass::Unknown`]).
    pub duration_seconds: Option<f64>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Codec descriptor, `"type/subtype"` pairs comma-joined across all
    /// streams of the relevant medium (spec §4.1).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub container_format: String,
    /// Content-creation timestamp, if tagged by the container.
    pub creation_date: Option<DateTime<Utc>>,
}

impl VideoMetadata {
    /// Aspect ratio `width / height`. Returns `1.0` for degenerate
    /// (zero-height) metadata rather than dividing by zero.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// This video's [`DurationClass`].
    pub fn duration_class(&self) -> DurationClass {
        match self.duration_seconds {
            Some(seconds) => DurationClass::classify(seconds),
            None => DurationClass::Unknown,
        }
    }

    /// Duration in seconds, or `0.0` for unknown/non-finite durations —
    /// the value layout/sampler arithmetic should use (never NaN/negative).
    pub fn duration_or_zero(&self) -> f64 {
        self.duration_seconds
            .filter(|value| value.is_finite() && *value >= 0.0)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_class_boundaries_use_ge_not_gt() {
        assert_eq!(DurationClass::classify(59.999).tag(), "XS");
        assert_eq!(DurationClass::classify(60.0).tag(), "S");
        assert_eq!(DurationClass::classify(300.0).tag(), "M");
        assert_eq!(DurationClass::classify(900.0).tag(), "L");
        assert_eq!(DurationClass::classify(1800.0).tag(), "XL");
    }

    #[test]
    fn non_finite_or_negative_is_unknown() {
        assert_eq!(DurationClass::classify(f64::NAN).tag(), "U");
        assert_eq!(DurationClass::classify(f64::INFINITY).tag(), "U");
        assert_eq!(DurationClass::classify(-1.0).tag(), "U");
    }

    #[test]
    fn aspect_ratio_handles_zero_height() {
        let meta = VideoMetadata {
            source_path: PathBuf::from("x.mp4"),
            duration_seconds: Some(10.0),
            width: 100,
            height: 0,
            codec: "video/avc1".into(),
            container_format: "mov".into(),
            creation_date: None,
        };
        assert_eq!(meta.aspect_ratio(), 1.0);
    }
}
