//! `mosaicgen` CLI: generate mosaics/previews, enumerate videos, and write
//! playlists over a video corpus.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use mosaicgen::config::PipelineConfig;
use mosaicgen::pipeline::Pipeline;
use mosaicgen::progress::{ProgressCallback, ProgressEvent, ProgressKind};

#[derive(Parser)]
#[command(name = "mosaicgen", about = "Generate video mosaics, previews, and playlists", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Mosaic pixel width.
    #[arg(long, global = true, default_value_t = 2000)]
    width: u32,

    /// Output directory subdirectory name.
    #[arg(long, global = true, default_value = "ThDir")]
    thumbnail_subdirectory: String,

    /// Worker slot budget.
    #[arg(long, global = true, default_value_t = 4)]
    max_concurrent_operations: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Generate mosaics for every video under `root`.
    Mosaics { root: PathBuf },
    /// Generate preview clips for every video under `root`.
    Previews { root: PathBuf },
    /// Write a standard playlist for every video under `root`.
    Playlist { root: PathBuf },
    /// Write a date-range playlist.
    PlaylistRange {
        root: PathBuf,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Write a today playlist.
    PlaylistToday { root: PathBuf },
    /// List videos discovered under `root` without generating anything.
    Discover { root: PathBuf },
}

struct CliProgress {
    bar: ProgressBar,
}

impl ProgressCallback for CliProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if event.kind != ProgressKind::Global {
            return;
        }
        if self.bar.length().is_none() && event.total > 0 {
            self.bar.set_length(event.total);
        }
        self.bar.set_position(event.processed);
        self.bar.set_message(format!(
            "{} {} {}",
            format!("{} ok", event.processed).green(),
            format!("{} skipped", event.skipped).yellow(),
            format!("{} errored", event.errored).red(),
        ));
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = PipelineConfig::new().with_width(cli.width).with_max_concurrent_operations(cli.max_concurrent_operations);
    config.thumbnail_subdirectory = cli.thumbnail_subdirectory;

    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}").unwrap_or_else(|_| ProgressStyle::default_bar()));
    let progress: Arc<dyn ProgressCallback> = Arc::new(CliProgress { bar: bar.clone() });
    let pipeline = Pipeline::new(config, progress);

    match cli.command {
        Command::Mosaics { root } => {
            let pairs = pipeline.discover(&root);
            let summary = pipeline.generate_mosaics(pairs).await;
            bar.finish_and_clear();
            println!(
                "{} processed, {} skipped, {} errored",
                summary.processed.to_string().green(),
                summary.skipped.to_string().yellow(),
                summary.errored.to_string().red()
            );
        }
        Command::Previews { root } => {
            let pairs = pipeline.discover(&root);
            let summary = pipeline.generate_previews(pairs).await;
            bar.finish_and_clear();
            println!(
                "{} processed, {} skipped, {} errored",
                summary.processed.to_string().green(),
                summary.skipped.to_string().yellow(),
                summary.errored.to_string().red()
            );
        }
        Command::Playlist { root } => {
            let pairs = pipeline.discover(&root);
            match pipeline.create_playlist(&root, &pairs) {
                Ok(path) => println!("wrote {}", path.display().to_string().green()),
                Err(error) => eprintln!("{}: {error}", "error".red()),
            }
        }
        Command::PlaylistRange { root, start, end } => {
            let pairs = pipeline.discover(&root);
            match pipeline.create_date_range_playlist(&root, start, end, &pairs) {
                Ok(path) => println!("wrote {}", path.display().to_string().green()),
                Err(error) => eprintln!("{}: {error}", "error".red()),
            }
        }
        Command::PlaylistToday { root } => {
            let pairs = pipeline.discover(&root);
            match pipeline.create_today_playlist(&root, &pairs) {
                Ok(path) => println!("wrote {}", path.display().to_string().green()),
                Err(error) => eprintln!("{}: {error}", "error".red()),
            }
        }
        Command::Discover { root } => {
            let pairs = pipeline.discover(&root);
            for pair in &pairs {
                println!("{}", pair.source.display());
            }
            println!("{} videos found", pairs.len().to_string().green());
        }
    }
}
