//! # Image Compression Module
//!
//! Questo modulo gestisce la ricompressione di tutti i formati immagine
//! supportati, interamente in-process tramite `image` e `webp`.
//!
//! ## Responsabilità:
//! - Ricompressione in-place di JPEG, PNG e WebP
//! - Conversione a JPEG dei formati legacy (BMP, GIF, TIFF)
//! - Bypass dei file troppo piccoli per valere la ricompressione
//! - Isolamento degli errori per singolo file
//!
//! ## Politica per formato:
//! | Estensione | Strategia |
//! |------------|-----------|
//! | jpg/jpeg   | Re-encode JPEG alla qualità configurata, alpha su sfondo bianco |
//! | png        | Re-encode lossless con massimo livello di compressione |
//! | webp       | Re-encode lossy alla qualità configurata, effort massimo |
//! | bmp/gif/tiff | Conversione a JPEG con nuovo path `.jpg`, originale rimosso |
//!
//! ## Gestione errori:
//! Ogni errore (stat, decode, encode, write) viene catturato e trasformato
//! in un `CompressionResult` fallito: un file corrotto non interrompe mai
//! la run né i task vicini.

use crate::error::CompressError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::io::Reader as ImageReader;
use image::{imageops, ColorType, DynamicImage, Rgba, RgbaImage};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files below this size are left untouched
pub const MIN_COMPRESS_BYTES: u64 = 10 * 1024;

/// Outcome of compressing a single file
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    /// Final path of the file (differs from the input only after a
    /// format conversion)
    pub path: PathBuf,
    pub success: bool,
    pub original_size: u64,
    pub new_size: u64,
    /// May be negative when the re-encoded file grew
    pub saved_bytes: i64,
    pub error: Option<String>,
}

impl CompressionResult {
    /// Successful outcome; `saved_bytes` is derived from the two sizes
    pub fn compressed(path: PathBuf, original_size: u64, new_size: u64) -> Self {
        Self {
            path,
            success: true,
            original_size,
            new_size,
            saved_bytes: original_size as i64 - new_size as i64,
            error: None,
        }
    }

    /// Failed outcome; sizes are zeroed and the message is kept
    pub fn failed(path: PathBuf, error: String) -> Self {
        Self {
            path,
            success: false,
            original_size: 0,
            new_size: 0,
            saved_bytes: 0,
            error: Some(error),
        }
    }

    /// Percentage saved relative to the original size
    pub fn compression_percent(&self) -> f64 {
        if self.original_size > 0 {
            (self.saved_bytes as f64 / self.original_size as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Encoding strategy keyed on the lowercased file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatPolicy {
    Jpeg,
    Png,
    WebP,
    ConvertToJpeg,
}

impl FormatPolicy {
    fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "webp" => Self::WebP,
            _ => Self::ConvertToJpeg,
        }
    }
}

/// Re-encodes single images at a fixed quality setting
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    quality: u8,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Compress one file in place, never panicking: every failure is folded
    /// into the returned result.
    ///
    /// The rewrite is not atomic; a crash mid-write can leave a truncated
    /// file behind.
    pub fn compress(&self, path: &Path) -> CompressionResult {
        match self.compress_inner(path) {
            Ok(result) => result,
            Err(e) => CompressionResult::failed(path.to_path_buf(), e.to_string()),
        }
    }

    fn compress_inner(&self, path: &Path) -> Result<CompressionResult, CompressError> {
        let original_size = fs::metadata(path)?.len();

        // Not worth touching; no decode is attempted either.
        if original_size < MIN_COMPRESS_BYTES {
            debug!(
                "Leaving {} untouched ({} is below the compression floor)",
                path.display(),
                original_size
            );
            return Ok(CompressionResult::compressed(
                path.to_path_buf(),
                original_size,
                original_size,
            ));
        }

        // Guess from content, not extension: mislabelled files decode by
        // what they actually contain.
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;

        match FormatPolicy::for_path(path) {
            FormatPolicy::Jpeg => {
                let data = self.encode_jpeg(&image)?;
                fs::write(path, &data)?;
                Ok(CompressionResult::compressed(
                    path.to_path_buf(),
                    original_size,
                    data.len() as u64,
                ))
            }
            FormatPolicy::Png => {
                let data = encode_png(&image)?;
                fs::write(path, &data)?;
                Ok(CompressionResult::compressed(
                    path.to_path_buf(),
                    original_size,
                    data.len() as u64,
                ))
            }
            FormatPolicy::WebP => {
                let data = self.encode_webp(&image)?;
                fs::write(path, &data)?;
                Ok(CompressionResult::compressed(
                    path.to_path_buf(),
                    original_size,
                    data.len() as u64,
                ))
            }
            FormatPolicy::ConvertToJpeg => self.convert_to_jpeg(path, &image, original_size),
        }
    }

    /// Encode as JPEG at the configured quality. Alpha is flattened first
    /// since JPEG cannot carry it.
    fn encode_jpeg(&self, image: &DynamicImage) -> Result<Vec<u8>, CompressError> {
        let rgb = flatten_onto_white(image);
        let (width, height) = (rgb.width(), rgb.height());

        let mut data = Vec::new();
        let mut cursor = Cursor::new(&mut data);
        let mut encoder = JpegEncoder::new_with_quality(&mut cursor, self.quality);
        encoder.encode(&rgb, width, height, ColorType::Rgb8)?;

        Ok(data)
    }

    /// Encode as lossy WebP at the configured quality with maximum
    /// compression effort.
    fn encode_webp(&self, image: &DynamicImage) -> Result<Vec<u8>, CompressError> {
        let rgba = image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height());

        let mut config = webp::WebPConfig::new().map_err(|_| {
            CompressError::WebpEncoding("failed to initialize encoder configuration".to_string())
        })?;
        config.quality = f32::from(self.quality);
        config.method = 6;

        let memory = encoder
            .encode_advanced(&config)
            .map_err(|e| CompressError::WebpEncoding(format!("{e:?}")))?;

        Ok(memory.to_vec())
    }

    /// Write a `.jpg` sibling and remove the original. A failed removal
    /// still counts as success: the converted file is complete.
    fn convert_to_jpeg(
        &self,
        path: &Path,
        image: &DynamicImage,
        original_size: u64,
    ) -> Result<CompressionResult, CompressError> {
        let target = path.with_extension("jpg");
        let data = self.encode_jpeg(image)?;
        fs::write(&target, &data)?;

        if let Err(e) = fs::remove_file(path) {
            warn!(
                "Converted {} but could not remove the original: {}",
                path.display(),
                e
            );
        }

        Ok(CompressionResult::compressed(
            target,
            original_size,
            data.len() as u64,
        ))
    }
}

/// Encode as PNG with the strongest lossless settings
fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CompressError> {
    let mut data = Vec::new();
    let mut cursor = Cursor::new(&mut data);
    let encoder =
        PngEncoder::new_with_quality(&mut cursor, CompressionType::Best, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;

    Ok(data)
}

/// Composite transparent pixels onto an opaque white background
fn flatten_onto_white(image: &DynamicImage) -> image::RgbImage {
    let rgba = image.to_rgba8();
    if rgba.pixels().any(|p| p[3] < 255) {
        let mut canvas =
            RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, &rgba, 0, 0);
        DynamicImage::ImageRgba8(canvas).to_rgb8()
    } else {
        image.to_rgb8()
    }
}
