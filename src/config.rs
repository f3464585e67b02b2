//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione di una run di compressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `RunConfig` con tutti i parametri della run
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `directory`: Directory radice da scansionare (ricorsivo)
//! - `quality`: Qualità di ricompressione lossy (1-100, default: 85)
//! - `min_file_size_bytes`: Dimensione minima per entrare nella run (default: 50 KB)
//! - `workers`: Numero di worker paralleli (default: min(4, core disponibili))
//!
//! ## Validazione:
//! - Controlla che quality sia 1-100
//! - Controlla che workers sia > 0
//! - Controlla che directory esista e sia una directory
//!
//! ## Esempio:
//! ```rust
//! use image_compressor::RunConfig;
//!
//! let config = RunConfig {
//!     quality: 70,
//!     workers: 8,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use crate::error::CompressError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a compression run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root directory scanned for images
    pub directory: PathBuf,
    /// Re-encoding quality for lossy formats (1-100)
    pub quality: u8,
    /// Files smaller than this are never scheduled
    pub min_file_size_bytes: u64,
    /// Number of parallel workers
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            quality: 85,
            min_file_size_bytes: 50 * 1024,
            workers: Self::default_workers(),
        }
    }
}

impl RunConfig {
    /// Default worker count: up to four, never more than the CPU count
    pub fn default_workers() -> usize {
        num_cpus::get().min(4)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(CompressError::Validation(
                "Quality must be between 1 and 100".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(CompressError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        if !self.directory.exists() {
            return Err(CompressError::Validation(format!(
                "Directory does not exist: {}",
                self.directory.display()
            )));
        }

        if !self.directory.is_dir() {
            return Err(CompressError::Validation(format!(
                "Not a directory: {}",
                self.directory.display()
            )));
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: RunConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
