//! # Run Statistics Module
//!
//! Aggregazione dei risultati di compressione in contatori cumulativi.
//!
//! ## Responsabilità:
//! - Fold puro dei `CompressionResult` in una singola struttura
//! - Calcolo di spazio risparmiato e velocità media
//! - Snapshot serializzabili per le notifiche periodiche
//!
//! L'aggregatore non conosce thread né canali: il coordinatore gli
//! consegna i risultati uno alla volta, nell'ordine di completamento.

use crate::compressor::CompressionResult;
use serde::Serialize;
use std::time::Instant;

/// Cumulative counters for one compression run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    /// Number of files selected by the scan
    pub total_images: usize,
    /// Results absorbed so far, successes and failures alike
    pub processed_images: usize,
    pub successful: usize,
    pub failed: usize,
    /// Net bytes saved; negative when re-encoding grew the files
    pub total_saved_bytes: i64,
    pub elapsed_seconds: f64,
}

impl RunStatistics {
    /// Average throughput over the run, counting only successful files
    pub fn images_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.successful as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    /// Saved space in megabytes, for human-readable summaries
    pub fn total_saved_megabytes(&self) -> f64 {
        self.total_saved_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Accumulates results as they complete and stamps snapshots with the
/// elapsed wall-clock time
#[derive(Debug)]
pub struct StatsAggregator {
    stats: RunStatistics,
    started: Instant,
}

impl StatsAggregator {
    pub fn new(total_images: usize) -> Self {
        Self {
            stats: RunStatistics {
                total_images,
                ..RunStatistics::default()
            },
            started: Instant::now(),
        }
    }

    /// Absorb one result. Saved bytes only accumulate for successes;
    /// failures carry zeroed sizes anyway.
    pub fn record(&mut self, result: &CompressionResult) {
        self.stats.processed_images += 1;
        if result.success {
            self.stats.successful += 1;
            self.stats.total_saved_bytes += result.saved_bytes;
        } else {
            self.stats.failed += 1;
        }
    }

    pub fn processed(&self) -> usize {
        self.stats.processed_images
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Current counters with the elapsed time stamped in
    pub fn snapshot(&self) -> RunStatistics {
        let mut stats = self.stats.clone();
        stats.elapsed_seconds = self.elapsed_seconds();
        stats
    }
}
