//! # Image Discovery Module
//!
//! Questo modulo gestisce la discovery ricorsiva delle immagini da comprimere.
//!
//! ## Responsabilità:
//! - Scansione ricorsiva della directory di input
//! - Filtro per estensione supportata e dimensione minima
//! - Creazione dei task di lavoro per il worker pool
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - JPG, JPEG, PNG, BMP, GIF, TIFF, WebP
//!
//! ## Regole di filtro:
//! - Le estensioni vengono confrontate in lowercase
//! - I file sotto la soglia minima non entrano nella run
//! - I file non leggibili vengono saltati silenziosamente
//! - I symlink non vengono seguiti

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A single unit of compression work produced by the scan
#[derive(Debug, Clone)]
pub struct ImageTask {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Finds images eligible for compression
pub struct Scanner;

impl Scanner {
    /// Walk `directory` and collect every supported image of at least
    /// `min_file_size_bytes`. Entries that cannot be read are dropped from
    /// the run without being counted anywhere.
    pub fn scan(directory: &Path, min_file_size_bytes: u64) -> Vec<ImageTask> {
        let mut tasks = Vec::new();

        for entry in WalkDir::new(directory)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !Self::is_supported_image(path) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if size >= min_file_size_bytes {
                tasks.push(ImageTask {
                    path: path.to_path_buf(),
                    size_bytes: size,
                });
            }
        }

        tasks
    }

    /// Check if a file has a supported image extension
    pub fn is_supported_image(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(
                ext_lower.as_str(),
                "jpg" | "jpeg" | "png" | "bmp" | "gif" | "tiff" | "webp"
            )
        } else {
            false
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
