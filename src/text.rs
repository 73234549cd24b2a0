//! Text rendering for the compositor's timestamp labels and metadata strip.
//!
//! The source application draws text via a platform text system (spec
//! Design Notes §9: "an implementation may choose any text-rendering
//! primitive that produces the same band/placement contract"). This crate
//! uses `imageproc`'s `ab_glyph`-backed drawing, pulled in from the
//! `modern-format-boost` example pack, which already depends on `imageproc`
//! for exactly this kind of raster annotation.

use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::error::MosaicError;

/// Common system font locations, checked in order. Overridable via the
/// `MOSAICGEN_FONT_PATH` environment variable.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A loaded font, or a no-op fallback when none could be found.
///
/// The fallback exists so the compositor can still produce a (textless)
/// mosaic in headless/test environments with no system fonts installed,
/// rather than failing the whole job over a missing font file.
pub enum TextFont {
    Loaded(FontVec),
    Unavailable,
}

impl TextFont {
    /// Load the first available system font, or honour
    /// `MOSAICGEN_FONT_PATH` if set.
    pub fn load_system() -> Result<Self, MosaicError> {
        if let Ok(path) = std::env::var("MOSAICGEN_FONT_PATH") {
            return Self::load_path(PathBuf::from(path));
        }
        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Self::load_path(path);
            }
        }
        log::warn!("no system font found; mosaic timestamps and metadata strip will render without text");
        Ok(TextFont::Unavailable)
    }

    /// The textless fallback, used by tests and as `load_system`'s last resort.
    pub fn fallback() -> Self {
        TextFont::Unavailable
    }

    fn load_path(path: PathBuf) -> Result<Self, MosaicError> {
        let bytes = std::fs::read(&path)?;
        let font = FontVec::try_from_vec(bytes).map_err(|_| {
            MosaicError::UnableToGenerateMosaic(format!("not a valid font file: {}", path.display()))
        })?;
        Ok(TextFont::Loaded(font))
    }

    /// Draw `text` at `(x, y)` in `color`, sized to `px_size`. A no-op when
    /// no font is available.
    pub fn draw(&self, canvas: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, px_size: f32, text: &str) {
        match self {
            TextFont::Loaded(font) => {
                let scale = PxScale::from(px_size);
                draw_text_mut(canvas, color, x, y, scale, font, text);
            }
            TextFont::Unavailable => {}
        }
    }
}

/// Convenience accessor for embedding a font at compile time is
/// deliberately not offered here: no royalty-free font binary ships in this
/// crate, so text rendering depends on a system font being present (see
/// [`TextFont::load_system`]) or a caller-supplied path.
pub fn describe_search_path() -> Vec<&'static str> {
    SYSTEM_FONT_CANDIDATES.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_draw_does_not_panic_without_a_font() {
        let font = TextFont::fallback();
        let mut canvas = RgbaImage::new(10, 10);
        font.draw(&mut canvas, Rgba([255, 255, 255, 255]), 0, 0, 12.0, "hi");
    }

    #[test]
    fn search_path_is_non_empty() {
        assert!(!describe_search_path().is_empty());
    }
}
