//! # mosaicgen
//!
//! Concurrent generation of video mosaics (grid-of-thumbnails preview
//! images), short preview clips, and M3U playlists over a corpus of video
//! files, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mosaicgen::config::PipelineConfig;
//! use mosaicgen::pipeline::Pipeline;
//!
//! # async fn run() {
//! let pipeline = Pipeline::silent();
//! let pairs = pipeline.discover("/videos");
//! let summary = pipeline.generate_mosaics(pairs).await;
//! println!("{} processed, {} skipped, {} errored", summary.processed, summary.skipped, summary.errored);
//! # }
//! ```
//!
//! ## Components
//!
//! - [`probe`] — open a container and extract [`metadata::VideoMetadata`]
//! - [`layout`] — plan a mosaic's grid geometry
//! - [`sampler`] — extract still frames at computed timestamps
//! - [`compositor`] — paint frames, timestamp labels, and a metadata strip
//! - [`encoder`] — derive deterministic output paths and save the raster
//! - [`preview`] — splice evenly spaced clips into a single preview video
//! - [`discovery`] — enumerate videos (directory walk, playlist, date range)
//! - [`playlist`] — write M3U8 manifests
//! - [`coordinator`] — drive a batch under worker-slot/cancellation/progress budgets
//! - [`pipeline`] — the stateless public façade
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system. See the
//! README for platform-specific instructions.

pub mod activity;
pub mod compositor;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod playlist;
pub mod preview;
pub mod probe;
pub mod progress;
pub mod sampler;
pub mod text;
pub mod util;

pub use config::{Density, LayoutMode, MosaicAspect, OutputFormat, PipelineConfig};
pub use coordinator::{Coordinator, OperationKind, RunSummary, TerminalState};
pub use discovery::{FileDiscovery, FilePair};
pub use encoder::ImageEncoder;
pub use error::{Disposition, MosaicError};
pub use layout::{MosaicLayout, Placement};
pub use metadata::{DurationClass, VideoMetadata};
pub use pipeline::Pipeline;
pub use playlist::PlaylistWriter;
pub use preview::{ExtractPlan, PreviewAssembler};
pub use probe::MediaProbe;
pub use progress::{CancellationLedger, ProgressCallback, ProgressEvent, ProgressKind, Stage};
pub use sampler::{SampledFrame, SeekTolerance, ThumbnailSampler};
