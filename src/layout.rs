//! Mosaic layout planning.
//!
//! Pure, side-effect-free: no FFmpeg or `image` dependency, so every rule
//! here is exhaustively unit-testable. Implements both the *classic*
//! row-search geometry and the *custom* density-template geometry.

use crate::config::{Density, MosaicAspect};

/// A thumbnail's placement within the mosaic raster, in pixels, using a
/// top-left origin (the compositor is responsible for the bottom-left ->
/// top-left y-flip the source raster format requires).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A planned mosaic: its overall raster size and every cell's placement, in
/// the order thumbnails should be sampled and drawn.
#[derive(Debug, Clone)]
pub struct MosaicLayout {
    pub mosaic_width: u32,
    pub mosaic_height: u32,
    pub cells: Vec<Placement>,
}

impl MosaicLayout {
    /// Number of thumbnail slots in this layout.
    pub fn thumbnail_count(&self) -> usize {
        self.cells.len()
    }

    /// True if every cell lies within the mosaic bounds and no two cells'
    /// rectangles overlap (testable property #2).
    pub fn is_well_formed(&self) -> bool {
        for cell in &self.cells {
            if cell.x + cell.width > self.mosaic_width || cell.y + cell.height > self.mosaic_height {
                return false;
            }
        }
        for (index, a) in self.cells.iter().enumerate() {
            for b in &self.cells[index + 1..] {
                if rectangles_overlap(a, b) {
                    return false;
                }
            }
        }
        true
    }
}

fn rectangles_overlap(a: &Placement, b: &Placement) -> bool {
    let a_right = a.x + a.width;
    let a_bottom = a.y + a.height;
    let b_right = b.x + b.width;
    let b_bottom = b.y + b.height;
    a.x < b_right && b.x < a_right && a.y < b_bottom && b.y < a_bottom
}

/// Decide how many thumbnails to sample for a mosaic (spec §4.3).
///
/// `duration_seconds < 5.0` always yields `4`. Otherwise
/// `min(800, floor((width/200 + 10·ln(duration)) / density.sampling_factor()))`,
/// clamped to a minimum of 4 so invariant #4 (`thumbnailCount ∈ [4, 800]`)
/// holds across every density.
pub fn thumbnail_count(duration_seconds: f64, width: u32, density: Density) -> u32 {
    if duration_seconds < 5.0 {
        return 4;
    }
    let raw = (width as f64 / 200.0 + 10.0 * duration_seconds.ln()) / density.sampling_factor();
    let bounded = raw.floor().clamp(4.0, 800.0);
    bounded as u32
}

const MAX_GROWTH_STEPS: u32 = 64;

/// Plan a *classic* row-search layout: search row counts from 1 upward,
/// keeping the configuration that best balances vertical fill ratio against
/// absolute deviation from the requested thumbnail count, and stop once a
/// candidate's total height reaches the mosaic's target height.
pub fn plan_classic(count: u32, mosaic_width: u32, source_aspect: f64, target_aspect: MosaicAspect) -> MosaicLayout {
    if count == 0 || mosaic_width == 0 {
        return MosaicLayout { mosaic_width, mosaic_height: 0, cells: Vec::new() };
    }

    let safe_aspect = if source_aspect.is_finite() && source_aspect > 0.0 { source_aspect } else { 1.0 };
    let target_height = mosaic_width as f64 / target_aspect.ratio();

    let mut best_rows = 1u32;
    let mut best_cols = count;
    let mut best_score = f64::INFINITY;

    for rows in 1..=count {
        let cols = (count as f64 / rows as f64).ceil() as u32;
        let cell_width = mosaic_width as f64 / cols as f64;
        let cell_height = cell_width / safe_aspect;
        let total_height = cell_height * rows as f64;

        let fill_ratio = total_height / target_height;
        let deviation = ((count as i64) - (rows as i64 * cols as i64)).unsigned_abs() as f64;
        let score = (1.0 - fill_ratio).abs() + 0.01 * deviation;

        if score < best_score {
            best_score = score;
            best_rows = rows;
            best_cols = cols;
        }

        if total_height >= target_height {
            break;
        }
    }

    let cell_width = mosaic_width as f64 / best_cols as f64;
    let cell_height = cell_width / safe_aspect;

    let mut cells = Vec::with_capacity(count as usize);
    for index in 0..count {
        let row = index / best_cols;
        let col = index % best_cols;
        cells.push(Placement {
            x: (col as f64 * cell_width).round() as u32,
            y: (row as f64 * cell_height).round() as u32,
            width: cell_width.round().max(1.0) as u32,
            height: cell_height.round().max(1.0) as u32,
        });
    }

    let mosaic_height = (cell_height * best_rows as f64).round().max(1.0) as u32;
    MosaicLayout { mosaic_width, mosaic_height, cells }
}

/// Plan a *custom* density-template layout (spec §4.3).
pub fn plan_custom(density: Density, mosaic_width: u32, source_aspect: f64, target_aspect: MosaicAspect) -> MosaicLayout {
    if mosaic_width == 0 {
        return MosaicLayout { mosaic_width, mosaic_height: 0, cells: Vec::new() };
    }

    let (mut large_cols, mut large_rows, mut small_cols, mut small_rows) = density.layout_template();
    let safe_aspect = if source_aspect.is_finite() && source_aspect > 0.0 { source_aspect } else { 1.0 };
    let is_portrait = safe_aspect < 1.0;

    if is_portrait {
        large_cols *= 2;
        small_cols *= 2;
        if small_rows >= 2 {
            small_rows /= 2;
        }

        for _ in 0..MAX_GROWTH_STEPS {
            let assembled_aspect = assembled_aspect(large_cols, small_cols, large_rows, small_rows, safe_aspect);
            if assembled_aspect >= target_aspect.ratio() {
                break;
            }
            small_cols += 1;
            large_cols += 1;
        }
    } else {
        let target_height = mosaic_width as f64 / target_aspect.ratio();
        let mut grow_large = true;
        for _ in 0..MAX_GROWTH_STEPS {
            let current_height = rows_height(large_cols, small_cols, large_rows, small_rows, mosaic_width, safe_aspect);
            if current_height >= target_height {
                break;
            }
            if grow_large {
                large_rows += 1;
            } else {
                small_rows += 1;
            }
            grow_large = !grow_large;
        }
    }

    build_custom_layout(mosaic_width, safe_aspect, large_cols, large_rows, small_cols, small_rows)
}

fn small_cell_width(mosaic_width: u32, small_cols: u32) -> f64 {
    mosaic_width as f64 / small_cols.max(1) as f64
}

fn assembled_aspect(large_cols: u32, small_cols: u32, large_rows: u32, small_rows: u32, source_aspect: f64) -> f64 {
    let mosaic_width = small_cols.max(large_cols) as f64;
    let small_width = 1.0;
    let large_width = 2.0;
    let small_height = small_width / source_aspect;
    let large_height = large_width / source_aspect;
    let height = small_rows as f64 * small_height + large_rows as f64 * large_height;
    if height <= 0.0 {
        return mosaic_width;
    }
    (small_cols.max(large_cols) as f64) / height
}

fn rows_height(large_cols: u32, small_cols: u32, large_rows: u32, small_rows: u32, mosaic_width: u32, source_aspect: f64) -> f64 {
    let _ = large_cols;
    let small_width = small_cell_width(mosaic_width, small_cols);
    let small_height = small_width / source_aspect;
    let large_height = 2.0 * small_height;
    small_rows as f64 * small_height + large_rows as f64 * large_height
}

fn build_custom_layout(mosaic_width: u32, source_aspect: f64, large_cols: u32, large_rows: u32, small_cols: u32, small_rows: u32) -> MosaicLayout {
    let small_width = small_cell_width(mosaic_width, small_cols);
    let small_height = small_width / source_aspect;
    let large_width = 2.0 * small_width;
    let large_height = 2.0 * small_height;

    let top_small_rows = small_rows / 2;
    let bottom_small_rows = small_rows - top_small_rows;

    let mut cells = Vec::new();
    let mut cursor_y = 0.0_f64;

    for _ in 0..top_small_rows {
        place_row(&mut cells, &mut cursor_y, small_cols, small_width, small_height);
    }
    for _ in 0..large_rows {
        place_row(&mut cells, &mut cursor_y, large_cols, large_width, large_height);
    }
    for _ in 0..bottom_small_rows {
        place_row(&mut cells, &mut cursor_y, small_cols, small_width, small_height);
    }

    let mosaic_height = cursor_y.round().max(1.0) as u32;
    MosaicLayout { mosaic_width, mosaic_height, cells }
}

fn place_row(cells: &mut Vec<Placement>, cursor_y: &mut f64, cols: u32, cell_width: f64, cell_height: f64) {
    let y = cursor_y.round() as u32;
    let height = cell_height.round().max(1.0) as u32;
    for col in 0..cols {
        cells.push(Placement {
            x: (col as f64 * cell_width).round() as u32,
            y,
            width: cell_width.round().max(1.0) as u32,
            height,
        });
    }
    *cursor_y += cell_height;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_count_short_video_is_four() {
        assert_eq!(thumbnail_count(4.9, 2000, Density::M), 4);
    }

    #[test]
    fn thumbnail_count_matches_scenario_s1() {
        assert_eq!(thumbnail_count(12.0, 2000, Density::M), 34);
    }

    #[test]
    fn thumbnail_count_is_always_in_bounds() {
        for duration in [5.0, 30.0, 600.0, 100_000.0] {
            for density in [Density::Xxs, Density::Xs, Density::S, Density::M, Density::L, Density::Xl, Density::Xxl] {
                let count = thumbnail_count(duration, 2000, density);
                assert!((4..=800).contains(&count), "count {count} out of bounds for {density:?}/{duration}");
            }
        }
    }

    #[test]
    fn classic_layout_is_well_formed_and_has_exact_cell_count() {
        let layout = plan_classic(34, 2000, 1280.0 / 720.0, MosaicAspect::Wide);
        assert_eq!(layout.thumbnail_count(), 34);
        assert!(layout.is_well_formed());
    }

    #[test]
    fn classic_layout_handles_zero_count() {
        let layout = plan_classic(0, 2000, 1.0, MosaicAspect::Wide);
        assert_eq!(layout.thumbnail_count(), 0);
        assert_eq!(layout.mosaic_height, 0);
    }

    #[test]
    fn custom_layout_is_well_formed_for_density_extremes() {
        for density in [Density::Xxs, Density::Xxl] {
            for aspect in [0.5_f64, 1.0, 2.0] {
                let layout = plan_custom(density, 2000, aspect, MosaicAspect::Wide);
                assert!(layout.is_well_formed(), "{density:?}/{aspect} not well formed");
                assert!(!layout.cells.is_empty());
            }
        }
    }

    #[test]
    fn portrait_growth_loop_actually_grows_columns_toward_the_target_aspect() {
        let (_, _, small_cols, _) = Density::M.layout_template();
        let layout = plan_custom(Density::M, 2000, 0.5, MosaicAspect::Wide);
        // The first placed row always uses whichever template (small or large) comes
        // first in `build_custom_layout`; its cell count reflects the post-growth
        // column count. After portrait pre-scaling alone (no growth), that count
        // would be exactly `small_cols * 2` — the growth loop must push it higher to
        // reach the Wide target aspect, so it must not stop there.
        let first_row_cells = layout.cells.iter().filter(|cell| cell.y == 0).count() as u32;
        assert!(first_row_cells > small_cols * 2, "expected growth beyond the doubled pre-scale column count, got {first_row_cells}");
        assert!(layout.is_well_formed());
    }

    #[test]
    fn mosaic_aspect_exactly_one_picks_square_tag() {
        assert_eq!(MosaicAspect::from_ratio(1.0).tag(), "1x1");
    }

    #[test]
    fn non_overlapping_cells_are_detected_as_well_formed() {
        let layout = MosaicLayout {
            mosaic_width: 100,
            mosaic_height: 100,
            cells: vec![
                Placement { x: 0, y: 0, width: 50, height: 50 },
                Placement { x: 50, y: 0, width: 50, height: 50 },
            ],
        };
        assert!(layout.is_well_formed());
    }

    #[test]
    fn overlapping_cells_are_detected_as_malformed() {
        let layout = MosaicLayout {
            mosaic_width: 100,
            mosaic_height: 100,
            cells: vec![
                Placement { x: 0, y: 0, width: 50, height: 50 },
                Placement { x: 25, y: 25, width: 50, height: 50 },
            ],
        };
        assert!(!layout.is_well_formed());
    }
}
