//! Mosaic encoding and filename/path derivation.
//!
//! PNG/JPEG go through `image`'s own encoders (already a teacher
//! dependency). HEIC is an enrichment — pulled in from `modern-format-boost`
//! (`libheif-rs`), since the teacher crate never encodes HEIC itself.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage, codecs::jpeg::JpegEncoder};

use crate::config::{Density, OutputFormat, PipelineConfig};
use crate::error::MosaicError;
use crate::metadata::DurationClass;
use crate::util::{derive_filename, path_to_hyphenated_base};

/// Encodes a finished mosaic raster to disk at a deterministic path.
pub struct ImageEncoder;

impl ImageEncoder {
    /// Derive the deterministic output filename for `source_path` (spec §4.5).
    ///
    /// The output *directory* is not this module's concern: [`FileDiscovery`]
    /// (`discovery.rs`) already derives it per pair at enumeration time
    /// (including the playlist-stem nesting this module never needed to
    /// know about), and the coordinator appends the duration-class segment
    /// once metadata is probed. Keeping a second, diverging directory
    /// deriver here invited exactly that divergence, so this module only
    /// derives the filename.
    ///
    /// [`FileDiscovery`]: crate::discovery::FileDiscovery
    pub fn output_filename(source_path: &Path, config: &PipelineConfig, density: Density, duration_class: DurationClass) -> String {
        let base = if config.add_full_path {
            path_to_hyphenated_base(source_path)
        } else {
            source_path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_else(|| "output".to_string())
        };
        derive_filename(&base, density.raw_value(), duration_class.tag(), config.format.extension())
    }

    /// Encode `image` to `path` using `format`, creating the parent
    /// directory if absent.
    ///
    /// # Errors
    /// [`MosaicError::UnableToSaveMosaic`] on any I/O or codec failure,
    /// [`MosaicError::UnsupportedOutputFormat`] should never occur here
    /// since `format` is already a validated [`OutputFormat`].
    pub fn save(image: &RgbaImage, path: &Path, format: OutputFormat, quality: f64) -> Result<(), MosaicError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match format {
            OutputFormat::Png => {
                image
                    .save_with_format(path, ImageFormat::Png)
                    .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
            }
            OutputFormat::Jpeg => {
                let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                let quality_percent = (quality.clamp(0.0, 1.0) * 100.0).round() as u8;
                let mut buffer = Vec::new();
                {
                    let mut encoder = JpegEncoder::new_with_quality(&mut Cursor::new(&mut buffer), quality_percent);
                    encoder
                        .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
                        .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
                }
                fs::write(path, buffer)?;
            }
            OutputFormat::Heic => {
                save_heic(image, path, quality)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "heic")]
fn save_heic(image: &RgbaImage, path: &Path, quality: f64) -> Result<(), MosaicError> {
    use libheif_rs::{Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image as HeifImage, LibHeif, RgbChroma};

    let width = image.width();
    let height = image.height();

    let mut heif_image =
        HeifImage::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
    heif_image
        .create_plane(Channel::Interleaved, width, height, 8)
        .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;

    {
        let planes = heif_image.planes_mut();
        let plane = planes
            .interleaved
            .ok_or_else(|| MosaicError::UnableToSaveMosaic("no interleaved plane on freshly created HEIF image".to_string()))?;
        let stride = plane.stride;
        for (row, src_row) in image.rows().enumerate() {
            let row_start = row * stride;
            for (col, pixel) in src_row.enumerate() {
                let offset = row_start + col * 3;
                plane.data[offset] = pixel[0];
                plane.data[offset + 1] = pixel[1];
                plane.data[offset + 2] = pixel[2];
            }
        }
    }

    let lib_heif = LibHeif::new();
    let mut encoder = lib_heif
        .encoder_for_format(CompressionFormat::Hevc)
        .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
    encoder
        .set_quality(EncoderQuality::Lossy((quality.clamp(0.0, 1.0) * 100.0).round() as u8))
        .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;

    let mut context = HeifContext::new().map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
    context
        .encode_image(&heif_image, &mut encoder, None)
        .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;
    context
        .write_to_file(&path.to_string_lossy())
        .map_err(|error| MosaicError::UnableToSaveMosaic(error.to_string()))?;

    Ok(())
}

#[cfg(not(feature = "heic"))]
fn save_heic(_image: &RgbaImage, _path: &Path, _quality: f64) -> Result<(), MosaicError> {
    Err(MosaicError::UnsupportedOutputFormat("heic (crate built without the \"heic\" feature)".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn output_filename_encodes_stem_density_and_duration_class() {
        let config = PipelineConfig::new();
        let source = PathBuf::from("/videos/clip.mp4");
        let filename = ImageEncoder::output_filename(&source, &config, Density::M, DurationClass::Xl);
        assert!(filename.starts_with("clip-"));
        assert!(filename.contains("XL"));
    }

    #[test]
    fn full_path_mode_hyphenates_the_whole_source_path() {
        let config = PipelineConfig::new().with_add_full_path(true);
        let source = PathBuf::from("/videos/nested/clip.mp4");
        let filename = ImageEncoder::output_filename(&source, &config, Density::M, DurationClass::S);
        assert!(!filename.starts_with("clip-"), "full-path mode should not reduce to the bare stem");
    }

    #[test]
    fn save_with_unbuilt_heic_feature_is_handled_gracefully() {
        // Exercises the save() dispatch path without requiring a real encoder.
        let image = RgbaImage::new(4, 4);
        let path = std::env::temp_dir().join("mosaicgen_encoder_test_output.png");
        let result = ImageEncoder::save(&image, &path, OutputFormat::Png, 0.8);
        assert!(result.is_ok());
        let _ = fs::remove_file(&path);
    }
}
