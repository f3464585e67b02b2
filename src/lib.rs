//! # Image Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per le diverse operazioni
//! - `scanner`: Discovery ricorsiva delle immagini da comprimere
//! - `compressor`: Ricompressione per-file (JPEG/PNG/WebP/conversioni)
//! - `stats`: Aggregazione risultati e metriche derivate
//! - `events`: Vocabolario di eventi verso l'osservatore esterno
//! - `notifier`: Throttling di log e snapshot di avanzamento
//! - `pipeline`: Worker pool e coordinatore della run
//!
//! ## Utilizzo:
//! ```no_run
//! use image_compressor::{CompressionPipeline, PipelineEvent, RunConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = RunConfig {
//!     directory: "./photos".into(),
//!     ..RunConfig::default()
//! };
//!
//! let pipeline = CompressionPipeline::new();
//! let mut run = pipeline.start(config)?;
//!
//! while let Some(event) = run.next_event().await {
//!     if let PipelineEvent::Finished { stats, stopped } = event {
//!         println!("processed {} images (stopped: {})", stats.processed_images, stopped);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod compressor;
pub mod config;
pub mod error;
pub mod events;
pub mod notifier;
pub mod pipeline;
pub mod scanner;
pub mod stats;

pub use compressor::{CompressionResult, Compressor};
pub use config::RunConfig;
pub use error::CompressError;
pub use events::{LogLevel, PipelineEvent};
pub use pipeline::{CompressionPipeline, RunHandle, RunState, StopFlag};
pub use scanner::{ImageTask, Scanner};
pub use stats::RunStatistics;
