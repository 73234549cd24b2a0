//! Mosaic compositing.
//!
//! Grounded on the teacher's `image::DynamicImage` compositing idiom (see
//! `thumbnail.rs`'s `grid`/`grid_with_options`, even though that file is not
//! wired into the teacher's own `lib.rs` — its blit-into-canvas pattern is
//! the closest precedent in the pack for what this module does).

use std::path::Path;

use image::{Rgba, RgbaImage, imageops::FilterType};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::error::MosaicError;
use crate::layout::MosaicLayout;
use crate::metadata::VideoMetadata;
use crate::sampler::SampledFrame;
use crate::util::format_hhmmss;

const GOLDEN_RATIO: f32 = 1.618;
const BACKGROUND: Rgba<u8> = Rgba([26, 26, 26, 255]);
const TIMESTAMP_BAND: Rgba<u8> = Rgba([0, 0, 0, 160]);
const TIMESTAMP_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const METADATA_STRIP: Rgba<u8> = Rgba([20, 50, 120, 190]);
const METADATA_TEXT: Rgba<u8> = Rgba([235, 240, 255, 255]);

/// Paints sampled frames, per-cell timestamp labels, and the metadata strip
/// into a single raster image.
pub struct MosaicCompositor<'a> {
    font: &'a crate::text::TextFont,
}

impl<'a> MosaicCompositor<'a> {
    pub fn new(font: &'a crate::text::TextFont) -> Self {
        Self { font }
    }

    /// Composite `frames` (one per `layout.cells`, same order) onto a
    /// background-filled canvas of `layout`'s size, then draw the metadata
    /// strip along the bottom 10%.
    ///
    /// # Errors
    /// Returns [`MosaicError::UnableToGenerateMosaic`] if `frames.len()`
    /// does not match `layout.cells.len()`.
    pub fn compose(&self, frames: &[SampledFrame], layout: &MosaicLayout, metadata: &VideoMetadata) -> Result<RgbaImage, MosaicError> {
        if frames.len() != layout.cells.len() {
            return Err(MosaicError::UnableToGenerateMosaic(format!(
                "frame count {} does not match layout cell count {}",
                frames.len(),
                layout.cells.len()
            )));
        }

        // The strip occupies the bottom 10% of the *final* canvas (spec line
        // 83), not 10% of the mosaic on top of it — so total = mosaic / 0.9,
        // i.e. strip = mosaic / 9.
        let strip_height = (layout.mosaic_height as f64 / 9.0).round().max(1.0) as u32;
        let total_height = layout.mosaic_height + strip_height;

        let mut canvas = RgbaImage::from_pixel(layout.mosaic_width, total_height, BACKGROUND);

        // Resizing each sampled frame to its cell size is independent work;
        // fan it out over rayon when available, mirroring the teacher's
        // `parallel_extract_frames` concurrency idiom. The canvas blit
        // itself stays sequential since every cell writes into one buffer.
        let resized = self.resize_cells(frames, layout);

        for (cell, image) in layout.cells.iter().zip(resized.iter()) {
            image::imageops::overlay(&mut canvas, image, cell.x as i64, cell.y as i64);
        }

        for (cell, frame) in layout.cells.iter().zip(frames.iter()) {
            self.draw_timestamp_band(&mut canvas, cell.x, cell.y, cell.width, cell.height, &frame.timestamp_label);
        }

        self.draw_metadata_strip(&mut canvas, layout.mosaic_height, layout.mosaic_width, strip_height, metadata);

        Ok(canvas)
    }

    #[cfg(feature = "parallel")]
    fn resize_cells(&self, frames: &[SampledFrame], layout: &MosaicLayout) -> Vec<RgbaImage> {
        use rayon::prelude::*;
        frames
            .par_iter()
            .zip(layout.cells.par_iter())
            .map(|(frame, cell)| resize_to_cell(&frame.image, cell.width, cell.height))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn resize_cells(&self, frames: &[SampledFrame], layout: &MosaicLayout) -> Vec<RgbaImage> {
        frames
            .iter()
            .zip(layout.cells.iter())
            .map(|(frame, cell)| resize_to_cell(&frame.image, cell.width, cell.height))
            .collect()
    }

    /// Draw a cell's timestamp label bottom-right with a semi-transparent
    /// dark band behind it. Font size is `cellHeight / 6 / φ` (spec §4.4).
    fn draw_timestamp_band(&self, canvas: &mut RgbaImage, cell_x: u32, cell_y: u32, cell_width: u32, cell_height: u32, label: &str) {
        let font_size = (cell_height as f32 / 6.0 / GOLDEN_RATIO).max(6.0);
        let band_height = (font_size * 1.6).round() as u32;
        let band_width = cell_width.min((label.len() as f32 * font_size * 0.62) as u32 + 8);

        let band_x = cell_x + cell_width.saturating_sub(band_width);
        let band_y = cell_y + cell_height.saturating_sub(band_height);

        draw_filled_rect_mut(
            canvas,
            Rect::at(band_x as i32, band_y as i32).of_size(band_width.max(1), band_height.max(1)),
            TIMESTAMP_BAND,
        );

        self.font.draw(canvas, TIMESTAMP_TEXT, band_x as i32 + 4, band_y as i32 + 2, font_size, label);
    }

    /// Draw the bottom metadata strip: translucent blue fill, four lines —
    /// path, codec, resolution, formatted duration (spec §4.4).
    fn draw_metadata_strip(&self, canvas: &mut RgbaImage, strip_top: u32, mosaic_width: u32, strip_height: u32, metadata: &VideoMetadata) {
        draw_filled_rect_mut(
            canvas,
            Rect::at(0, strip_top as i32).of_size(mosaic_width, strip_height),
            METADATA_STRIP,
        );

        let line_height = (strip_height as f32 / 4.2).max(8.0);
        let font_size = (line_height * 0.8).max(6.0);

        let lines = [
            display_path(&metadata.source_path),
            metadata.codec.clone(),
            format!("{}x{}", metadata.width, metadata.height),
            format_hhmmss(metadata.duration_or_zero()),
        ];

        for (index, line) in lines.iter().enumerate() {
            let y = strip_top as i32 + (index as f32 * line_height) as i32 + 2;
            self.font.draw(canvas, METADATA_TEXT, 6, y, font_size, line);
        }
    }
}

fn resize_to_cell(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if width == 0 || height == 0 {
        return RgbaImage::new(1, 1);
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Placement;
    use std::path::PathBuf;

    fn fixture_metadata() -> VideoMetadata {
        VideoMetadata {
            source_path: PathBuf::from("movie.mp4"),
            duration_seconds: Some(95.0),
            width: 1920,
            height: 1080,
            codec: "video/h264".into(),
            container_format: "mov".into(),
            creation_date: None,
        }
    }

    #[test]
    fn mismatched_frame_and_cell_counts_error() {
        let font = crate::text::TextFont::fallback();
        let compositor = MosaicCompositor::new(&font);
        let layout = MosaicLayout {
            mosaic_width: 100,
            mosaic_height: 100,
            cells: vec![Placement { x: 0, y: 0, width: 100, height: 100 }],
        };
        let result = compositor.compose(&[], &layout, &fixture_metadata());
        assert!(matches!(result, Err(MosaicError::UnableToGenerateMosaic(_))));
    }

    #[test]
    fn compose_produces_canvas_with_strip_added() {
        let font = crate::text::TextFont::fallback();
        let compositor = MosaicCompositor::new(&font);
        let layout = MosaicLayout {
            mosaic_width: 100,
            mosaic_height: 100,
            cells: vec![Placement { x: 0, y: 0, width: 100, height: 100 }],
        };
        let frame = SampledFrame {
            image: RgbaImage::new(100, 100),
            timestamp_label: "00:00:10".to_string(),
            is_blank: false,
        };
        let result = compositor.compose(&[frame], &layout, &fixture_metadata()).unwrap();
        assert_eq!(result.width(), 100);
        // strip = mosaic_height / 9, rounded: 100 / 9 = 11.11 -> 11
        assert_eq!(result.height(), 111);
    }

    #[test]
    fn metadata_strip_occupies_a_tenth_of_the_final_canvas() {
        let font = crate::text::TextFont::fallback();
        let compositor = MosaicCompositor::new(&font);
        let layout = MosaicLayout {
            mosaic_width: 900,
            mosaic_height: 900,
            cells: vec![Placement { x: 0, y: 0, width: 900, height: 900 }],
        };
        let frame = SampledFrame {
            image: RgbaImage::new(900, 900),
            timestamp_label: "00:01:00".to_string(),
            is_blank: false,
        };
        let result = compositor.compose(&[frame], &layout, &fixture_metadata()).unwrap();
        let total_height = result.height() as f64;
        let strip_height = total_height - layout.mosaic_height as f64;
        let ratio = strip_height / total_height;
        assert!((ratio - 0.10).abs() < 0.01, "strip ratio {ratio} should be ~10% of the final canvas");
    }
}
