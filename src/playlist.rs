//! M3U8 playlist writing (spec §4.8).
//!
//! Grounded on the teacher's "create on first write" resource-scope policy
//! (§5) — files are opened lazily and written atomically via a
//! temp-file-then-rename so a concurrent reader never observes a
//! half-written manifest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::discovery::FilePair;
use crate::error::MosaicError;
use crate::metadata::DurationClass;
use crate::probe::MediaProbe;

const HEADER: &str = "#EXTM3U\n";

/// Writes standard, duration-bucketed, and dated playlist manifests.
pub struct PlaylistWriter;

impl PlaylistWriter {
    /// Standard playlist: one file per source directory, named
    /// `{dirName}.m3u8`, listing every pair whose source lives directly
    /// under `directory`.
    pub fn write_standard(directory: &Path, pairs: &[FilePair]) -> Result<PathBuf, MosaicError> {
        let dir_name = directory.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| "playlist".to_string());
        let output_path = directory.join(format!("{dir_name}.m3u8"));
        Self::write_atomic(&output_path, pairs.iter().map(|pair| pair.source.as_path()))?;
        Ok(output_path)
    }

    /// Duration-bucketed playlists: one file per [`DurationClass`] present
    /// among `pairs`, named `{class}-{dirName}.m3u8`.
    pub fn write_bucketed(directory: &Path, pairs: &[FilePair]) -> Result<Vec<PathBuf>, MosaicError> {
        let dir_name = directory.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| "playlist".to_string());

        let mut written = Vec::new();
        for class in DurationClass::bucketed_order() {
            let bucket: Vec<&Path> = pairs
                .iter()
                .filter(|pair| MediaProbe::open(&pair.source).map(|metadata| metadata.duration_class()).unwrap_or(DurationClass::Unknown) == class)
                .map(|pair| pair.source.as_path())
                .collect();

            if bucket.is_empty() {
                continue;
            }

            let output_path = directory.join(format!("{}-{dir_name}.m3u8", class.tag()));
            Self::write_atomic(&output_path, bucket.into_iter())?;
            written.push(output_path);
        }
        Ok(written)
    }

    /// A dated playlist stem: `{YYYYMMDD}.m3u8` for a single day, or
    /// `{YYYYMMDD}-{YYYYMMDD}.m3u8` for a range.
    pub fn write_dated(directory: &Path, start: NaiveDate, end: Option<NaiveDate>, pairs: &[FilePair]) -> Result<PathBuf, MosaicError> {
        let stem = match end {
            Some(end) => format!("{}-{}", start.format("%Y%m%d"), end.format("%Y%m%d")),
            None => start.format("%Y%m%d").to_string(),
        };
        let output_path = directory.join(format!("{stem}.m3u8"));
        Self::write_atomic(&output_path, pairs.iter().map(|pair| pair.source.as_path()))?;
        Ok(output_path)
    }

    fn write_atomic<'a>(output_path: &Path, sources: impl Iterator<Item = &'a Path>) -> Result<(), MosaicError> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut body = String::from(HEADER);
        for source in sources {
            let filename = source.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| source.to_string_lossy().into_owned());
            body.push_str(&format!("#EXTINF:-1,{filename}\n"));
            body.push_str(&source.to_string_lossy());
            body.push('\n');
        }

        let temp_path = output_path.with_extension("m3u8.tmp");
        {
            let mut temp_file = fs::File::create(&temp_path)?;
            temp_file.write_all(body.as_bytes())?;
            temp_file.sync_all()?;
        }
        fs::rename(&temp_path, output_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn pair(path: &str) -> FilePair {
        FilePair { source: PathBuf::from(path), output_directory: PathBuf::from("/out") }
    }

    #[test]
    fn standard_playlist_has_header_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = vec![pair("/videos/a.mp4"), pair("/videos/b.mkv")];
        let output_path = PlaylistWriter::write_standard(dir.path(), &pairs).unwrap();

        let contents = fs::read_to_string(&output_path).unwrap();
        assert!(contents.starts_with("#EXTM3U\n"));
        assert!(contents.contains("#EXTINF:-1,a.mp4\n/videos/a.mp4\n"));
        assert!(contents.contains("#EXTINF:-1,b.mkv\n/videos/b.mkv\n"));
    }

    #[test]
    fn standard_playlist_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        PlaylistWriter::write_standard(dir.path(), &[pair("/videos/a.mp4")]).unwrap();
        let output_path = PlaylistWriter::write_standard(dir.path(), &[pair("/videos/b.mp4")]).unwrap();

        let contents = fs::read_to_string(&output_path).unwrap();
        assert!(!contents.contains("a.mp4"));
        assert!(contents.contains("b.mp4"));
    }

    #[test]
    fn dated_playlist_formats_single_day_stem() {
        let dir = tempfile::tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 11, 7).unwrap();
        let output_path = PlaylistWriter::write_dated(dir.path(), start, None, &[]).unwrap();
        assert_eq!(output_path.file_name().unwrap().to_string_lossy(), "20241107.m3u8");
    }

    #[test]
    fn dated_playlist_formats_range_stem() {
        let dir = tempfile::tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 11, 7).unwrap();
        let output_path = PlaylistWriter::write_dated(dir.path(), start, Some(end), &[]).unwrap();
        assert_eq!(output_path.file_name().unwrap().to_string_lossy(), "20241101-20241107.m3u8");
    }
}
