//! Shared helpers: timestamp formatting, filename derivation, and FFmpeg
//! time-base conversions carried over from the teacher's `utilities` module.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Format a duration in seconds as `HH:MM:SS` (spec §8 property #11).
///
/// Negative or non-finite input is treated as zero.
pub fn format_hhmmss(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Parse an `HH:MM:SS` string back into whole seconds.
pub fn parse_hhmmss(value: &str) -> Option<u64> {
    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Derive a deterministic, bounded output filename (spec §3, §4.5).
///
/// `base` is either the bare file stem or the full path with separators
/// replaced by hyphens, depending on `add_full_path`. The final name is
/// `{truncated_base}-{density}-{duration_class}.{extension}`, left-truncated
/// so the whole name never exceeds 128 characters.
pub fn derive_filename(base: &str, density_tag: &str, duration_tag: &str, extension: &str) -> String {
    const MAX_LEN: usize = 128;
    let suffix = format!("-{density_tag}-{duration_tag}.{extension}");
    if suffix.len() >= MAX_LEN {
        // Degenerate configuration; truncate the suffix itself rather than
        // panicking on an empty base budget.
        return suffix.chars().rev().take(MAX_LEN).collect::<Vec<_>>().into_iter().rev().collect();
    }
    let budget = MAX_LEN - suffix.len();
    let truncated_base = left_truncate_chars(base, budget);
    format!("{truncated_base}{suffix}")
}

/// Keep at most `max_chars` trailing characters of `value`.
fn left_truncate_chars(value: &str, max_chars: usize) -> String {
    let char_count = value.chars().count();
    if char_count <= max_chars {
        return value.to_string();
    }
    value.chars().skip(char_count - max_chars).collect()
}

/// Build the hyphen-joined full-path base used when `add_full_path` is set.
pub fn path_to_hyphenated_base(path: &std::path::Path) -> String {
    path.to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "-")
        .trim_start_matches('-')
        .to_string()
}

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB
/// buffer, stripping any per-row stride padding.
pub fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Convert a [`Duration`] to a timestamp in the stream's time base.
pub fn duration_to_stream_timestamp(duration: Duration, time_base: Rational) -> i64 {
    let seconds = duration.as_secs_f64();
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator() as f64;
    (seconds * denominator / numerator) as i64
}

/// Convert seconds to a timestamp in the stream's time base.
pub fn seconds_to_stream_timestamp(seconds: f64, time_base: Rational) -> i64 {
    duration_to_stream_timestamp(Duration::from_secs_f64(seconds.max(0.0)), time_base)
}

/// Rescale a PTS value from stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_parse_round_trips_whole_seconds() {
        for seconds in [0.0, 1.0, 59.9, 60.0, 3599.0, 3600.0, 86399.0] {
            let formatted = format_hhmmss(seconds);
            assert!(
                formatted.len() == 8 && formatted.chars().filter(|c| *c == ':').count() == 2,
                "format {formatted} did not match HH:MM:SS"
            );
            assert_eq!(parse_hhmmss(&formatted).unwrap(), seconds.floor() as u64);
        }
    }

    #[test]
    fn negative_or_nan_formats_as_zero() {
        assert_eq!(format_hhmmss(-5.0), "00:00:00");
        assert_eq!(format_hhmmss(f64::NAN), "00:00:00");
    }

    #[test]
    fn filename_never_exceeds_128_chars() {
        let long_base = "a".repeat(500);
        let name = derive_filename(&long_base, "XXL", "XL", "jpeg");
        assert!(name.len() <= 128, "name length {} exceeds 128", name.len());
        assert!(name.ends_with("-XXL-XL.jpeg"));
    }

    #[test]
    fn filename_keeps_short_base_unmodified() {
        let name = derive_filename("movie", "M", "S", "heic");
        assert_eq!(name, "movie-M-S.heic");
    }

    #[test]
    fn left_truncation_keeps_the_tail() {
        let truncated = left_truncate_chars("abcdefgh", 3);
        assert_eq!(truncated, "fgh");
    }
}
