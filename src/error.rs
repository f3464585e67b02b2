//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/encoding immagini (formati corrotti, etc.)
//! - `WebpEncoding`: Errori dell'encoder WebP nativo
//! - `Validation`: Errori di validazione della configurazione
//! - `RunActive`: Una run è già in corso su questa pipeline
//!
//! ## Note:
//! Gli errori per-file non attraversano mai questo enum verso il chiamante:
//! vengono catturati dal compressore e riportati come risultati falliti,
//! senza interrompere la run.

/// Custom error types for the compression pipeline
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("WebP encoding error: {0}")]
    WebpEncoding(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("A compression run is already active")]
    RunActive,
}
