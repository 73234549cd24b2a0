//! Enumerating video files: directory walks, playlist expansion, and
//! date-range queries (spec §4.7).
//!
//! The teacher crate has no directory-walking code of its own; `walkdir` is
//! pulled in from `modern-format-boost`, which already depends on it for the
//! same purpose. The OS-indexed fast path is modelled as a capability trait
//! ([`IndexedDiscovery`]) with a no-op default, wrapped in a bounded
//! `tokio::time::timeout` that falls back to the plain walk — platforms
//! without a native content index simply never implement the trait.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use walkdir::WalkDir;

use crate::config::{MosaicAspect, PipelineConfig};
use crate::error::MosaicError;
use crate::probe::MediaProbe;

const RECOGNISED_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "mpg", "mpeg", "avi", "mkv"];
const PREVIEW_TAG: &str = "amprv";
const FAST_PATH_TIMEOUT: Duration = Duration::from_secs(5);

/// A (source video, output directory) pair, as produced by discovery and
/// consumed by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub source: PathBuf,
    pub output_directory: PathBuf,
}

/// Optional discovery-progress callback, reporting a running count.
pub trait DiscoveryProgress: Send + Sync {
    fn on_discovered(&self, count: u64);
}

impl<F> DiscoveryProgress for F
where
    F: Fn(u64) + Send + Sync,
{
    fn on_discovered(&self, count: u64) {
        self(count)
    }
}

/// A capability for OS-indexed file search (e.g. Spotlight, a search
/// index service). No platform in this crate implements one; the default
/// is `None`, which always falls through to the plain walk.
pub trait IndexedDiscovery: Send + Sync {
    /// Attempt an indexed lookup under `root`. `None` means "unavailable",
    /// signalling the caller to fall back to a plain walk.
    fn search(&self, root: &Path) -> Option<Vec<PathBuf>>;
}

/// The always-unavailable default, used when no platform index exists.
pub struct NoIndex;

impl IndexedDiscovery for NoIndex {
    fn search(&self, _root: &Path) -> Option<Vec<PathBuf>> {
        None
    }
}

/// Enumerates video files via directory walk, playlist expansion, or
/// date-range query.
pub struct FileDiscovery<'a> {
    config: &'a PipelineConfig,
    index: &'a dyn IndexedDiscovery,
}

impl<'a> FileDiscovery<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config, index: &NoIndex }
    }

    pub fn with_index(config: &'a PipelineConfig, index: &'a dyn IndexedDiscovery) -> Self {
        Self { config, index }
    }

    /// Recursively enumerate video files under `root`, honouring the
    /// `amprv` exclusion. Tries the indexed fast path first (bounded to 5s
    /// by the caller via [`Self::walk_with_timeout`]); this synchronous
    /// entry point always uses the plain walk.
    pub fn walk(&self, root: impl AsRef<Path>, progress: Option<&dyn DiscoveryProgress>) -> Vec<FilePair> {
        let root = root.as_ref();
        let mut found = Vec::new();
        let mut count = 0u64;

        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if is_recognised_video(path) {
                found.push(self.pair_for(path, root, None));
                count += 1;
                if let Some(progress) = progress {
                    progress.on_discovered(count);
                }
            }
        }
        found
    }

    /// Async wrapper honouring the 5s indexed-fast-path budget (spec §4.7):
    /// try [`IndexedDiscovery::search`] under a timeout, falling back to
    /// [`Self::walk`] on timeout or `None`.
    pub async fn walk_with_timeout(&self, root: impl AsRef<Path>, progress: Option<&dyn DiscoveryProgress>) -> Vec<FilePair> {
        let root = root.as_ref();
        let indexed = tokio::time::timeout(FAST_PATH_TIMEOUT, async { self.index.search(root) }).await;

        match indexed {
            Ok(Some(paths)) => {
                let mut count = 0u64;
                paths
                    .into_iter()
                    .filter(|path| is_recognised_video(path))
                    .map(|path| {
                        count += 1;
                        if let Some(progress) = progress {
                            progress.on_discovered(count);
                        }
                        self.pair_for(&path, root, None)
                    })
                    .collect()
            }
            _ => self.walk(root, progress),
        }
    }

    /// Parse an M3U-like playlist: drop `#`-prefixed and empty lines; each
    /// remaining line is a local path. Output directories nest the
    /// playlist stem (spec §4.7).
    pub fn expand_playlist(&self, playlist_path: impl AsRef<Path>) -> Result<Vec<FilePair>, MosaicError> {
        let playlist_path = playlist_path.as_ref();
        let contents = fs::read_to_string(playlist_path)?;
        let stem = playlist_path.file_stem().map(|s| s.to_string_lossy().into_owned());

        let pairs = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| self.pair_for(Path::new(line), playlist_path.parent().unwrap_or(Path::new(".")), stem.as_deref()))
            .collect();

        Ok(pairs)
    }

    /// Videos whose content-creation date falls in `[start, end)`, scanning
    /// `root` with the same exclusions as [`Self::walk`].
    pub fn date_range(&self, root: impl AsRef<Path>, start: NaiveDate, end: NaiveDate) -> Vec<FilePair> {
        self.filter_by_date(root, |created| created >= start && created < end)
    }

    /// Videos created "today" in UTC: `[today, tomorrow)`.
    pub fn today(&self, root: impl AsRef<Path>, now: DateTime<Utc>) -> Vec<FilePair> {
        let today = now.date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        self.date_range(root, today, tomorrow)
    }

    fn filter_by_date(&self, root: impl AsRef<Path>, matches: impl Fn(NaiveDate) -> bool) -> Vec<FilePair> {
        let root = root.as_ref();
        WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_recognised_video(path))
            .filter(|path| {
                MediaProbe::open(path)
                    .ok()
                    .and_then(|metadata| metadata.creation_date)
                    .is_some_and(|created| matches(created.date_naive()))
            })
            .map(|path| self.pair_for(&path, root, None))
            .collect()
    }

    fn pair_for(&self, source: &Path, discovery_root: &Path, playlist_stem: Option<&str>) -> FilePair {
        let output_directory = self.output_directory_for(source, discovery_root, playlist_stem);
        FilePair { source: source.to_path_buf(), output_directory }
    }

    /// Output directory derivation: pure function of the source path, the
    /// configured `thDir` subdirectory, width, aspect tag, and
    /// `saveAtRoot` — nesting the playlist stem when the source came from
    /// playlist expansion (spec §4.7).
    fn output_directory_for(&self, source: &Path, discovery_root: &Path, playlist_stem: Option<&str>) -> PathBuf {
        let base = if self.config.save_at_root {
            discovery_root
        } else {
            source.parent().unwrap_or(Path::new("."))
        };

        let mut directory = base.join(&self.config.thumbnail_subdirectory);
        if let Some(stem) = playlist_stem {
            directory.push(stem);
        }
        directory.push(format!("{}_{}", self.config.width, self.config.mosaic_aspect_ratio.tag()));
        directory
    }
}

fn is_recognised_video(path: &Path) -> bool {
    let Some(file_name) = path.file_name().map(|name| name.to_string_lossy().to_lowercase()) else {
        return false;
    };
    if file_name.contains(PREVIEW_TAG) {
        return false;
    }
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| RECOGNISED_EXTENSIONS.contains(&extension.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn recognises_common_video_extensions() {
        assert!(is_recognised_video(Path::new("clip.mp4")));
        assert!(is_recognised_video(Path::new("clip.MKV")));
        assert!(!is_recognised_video(Path::new("clip.txt")));
    }

    #[test]
    fn excludes_preview_tagged_files_case_insensitively() {
        assert!(!is_recognised_video(Path::new("movie-AMPRV-M-4.mp4")));
        assert!(!is_recognised_video(Path::new("movie-amprv-m-4.mp4")));
    }

    #[test]
    fn playlist_expansion_drops_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let playlist_path = dir.path().join("favorites.m3u8");
        let mut file = File::create(&playlist_path).unwrap();
        writeln!(file, "#EXTM3U").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "/videos/a.mp4").unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "/videos/b.mkv").unwrap();

        let config = PipelineConfig::new();
        let discovery = FileDiscovery::new(&config);
        let pairs = discovery.expand_playlist(&playlist_path).unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].source, PathBuf::from("/videos/a.mp4"));
        assert_eq!(pairs[1].source, PathBuf::from("/videos/b.mkv"));
    }

    #[test]
    fn playlist_output_directory_nests_the_playlist_stem() {
        let config = PipelineConfig::new();
        let discovery = FileDiscovery::new(&config);
        let pair = discovery.pair_for(Path::new("/videos/a.mp4"), Path::new("/videos"), Some("favorites"));
        assert!(pair.output_directory.to_string_lossy().contains("favorites"));
    }

    #[test]
    fn walk_finds_nested_recognised_videos_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("keep.mp4")).unwrap();
        File::create(dir.path().join("skip.txt")).unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("also-keep.mkv")).unwrap();

        let config = PipelineConfig::new();
        let discovery = FileDiscovery::new(&config);
        let pairs = discovery.walk(dir.path(), None);

        assert_eq!(pairs.len(), 2);
    }
}
