//! # Image Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (default, file, override CLI)
//! - Avvio della pipeline e rendering degli eventi
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, quality, min-size, workers, etc.)
//! 2. Configura il logging su stderr (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica l'eventuale file di configurazione e applica gli override
//! 4. Avvia la run e collega Ctrl+C allo stop cooperativo
//! 5. Consuma lo stream di eventi: progress bar interattiva o NDJSON
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-compressor /path/to/photos --quality 85 --workers 4 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use image_compressor::{CompressionPipeline, PipelineEvent, RunConfig, RunHandle, Scanner};

#[derive(Parser)]
#[command(name = "image-compressor")]
#[command(about = "Recursively compress the images in a directory with parallel workers")]
struct Args {
    /// Directory containing images to compress
    directory: PathBuf,

    /// Compression quality for JPEG and WebP (1-100)
    #[arg(short, long)]
    quality: Option<u8>,

    /// Skip files smaller than this many kilobytes
    #[arg(short, long)]
    min_size_kb: Option<u64>,

    /// Number of parallel workers (clamped to the CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Load defaults from a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit newline-delimited JSON events on stdout instead of a progress bar
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging goes to stderr so --json keeps stdout machine-readable
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path).await?,
        None => RunConfig::default(),
    };

    config.directory = args.directory;
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(min_size_kb) = args.min_size_kb {
        config.min_file_size_bytes = min_size_kb * 1024;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.workers = config.workers.clamp(1, num_cpus::get());

    info!("Compressing images in {}", config.directory.display());

    let pipeline = CompressionPipeline::new();
    let handle = pipeline.start(config)?;

    // First Ctrl+C asks for a cooperative stop, a second one aborts
    let stop = handle.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && stop.trigger() {
            info!("Stop requested, letting in-flight files finish...");
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    if args.json {
        run_json(handle).await
    } else {
        run_interactive(handle).await
    }
}

/// Render the event stream as a progress bar. Log events are skipped
/// here: the notifier already mirrors them to tracing.
async fn run_interactive(mut handle: RunHandle) -> Result<()> {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = handle.next_event().await {
        match event {
            PipelineEvent::Progress {
                processed, total, ..
            } => {
                let bar = bar.get_or_insert_with(|| build_progress_bar(total as u64));
                bar.set_position(processed as u64);
            }
            PipelineEvent::Stats { stats } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!("saved {}", format_saved(stats.total_saved_bytes)));
                }
            }
            PipelineEvent::Finished { .. } => {
                if let Some(bar) = &bar {
                    bar.finish_and_clear();
                }
            }
            PipelineEvent::Log { .. } => {}
        }
    }

    Ok(())
}

/// Emit every event as one JSON object per line
async fn run_json(mut handle: RunHandle) -> Result<()> {
    while let Some(event) = handle.next_event().await {
        println!("{}", event.to_json());
    }

    Ok(())
}

fn build_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Human-readable byte delta; runs that grew files show a minus sign
fn format_saved(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", Scanner::format_size(bytes.unsigned_abs()))
    } else {
        Scanner::format_size(bytes as u64)
    }
}
