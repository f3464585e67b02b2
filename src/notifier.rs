//! # Progress Notification Module
//!
//! Questo modulo decide quali aggiornamenti raggiungono l'osservatore
//! esterno e con quale frequenza.
//!
//! ## Responsabilità:
//! - Throttling dei log di dettaglio per file
//! - Emissione periodica di coppie progress + statistics
//! - Traduzione dei path assoluti in path relativi alla directory di run
//!
//! ## Politica di throttling:
//! - Dettaglio per file: solo risparmi sopra 1 KiB, uno ogni 10 file
//!   qualificanti
//! - Snapshot: ogni 5 completamenti, e sempre all'ultimo
//! - Errori per file: mai filtrati
//!
//! Ogni messaggio viene anche riflesso sul logging `tracing`, così la
//! console resta utile quando nessuno consuma lo stream di eventi.

use crate::compressor::CompressionResult;
use crate::events::PipelineEvent;
use crate::stats::RunStatistics;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Emission thresholds, kept together so the cadence is tunable in one place
pub struct NotifyPolicy;

impl NotifyPolicy {
    /// Per-file detail lines require strictly more than this many bytes saved
    pub const DETAIL_MIN_SAVED_BYTES: i64 = 1024;
    /// Of the qualifying files, log one out of this many
    pub const DETAIL_LOG_INTERVAL: usize = 10;
    /// Emit a progress + stats pair every this many completions
    pub const SNAPSHOT_INTERVAL: usize = 5;

    /// Detail gate: meaningful saving, sampled by qualifying index
    /// (0-based, so the first qualifying file always logs)
    pub fn should_log_detail(saved_bytes: i64, qualifying_index: usize) -> bool {
        saved_bytes > Self::DETAIL_MIN_SAVED_BYTES
            && qualifying_index % Self::DETAIL_LOG_INTERVAL == 0
    }

    /// Snapshot gate: every Nth completion, plus the final one
    pub fn should_emit_snapshot(processed: usize, total: usize) -> bool {
        processed > 0 && (processed % Self::SNAPSHOT_INTERVAL == 0 || processed == total)
    }
}

/// Owns the outbound event channel for one run. Dropping the notifier
/// closes the stream, which is how consumers learn the run is over.
pub struct ProgressNotifier {
    events: mpsc::UnboundedSender<PipelineEvent>,
    base_directory: PathBuf,
    qualifying_seen: usize,
}

impl ProgressNotifier {
    pub fn new(events: mpsc::UnboundedSender<PipelineEvent>, base_directory: PathBuf) -> Self {
        Self {
            events,
            base_directory,
            qualifying_seen: 0,
        }
    }

    /// Free-text line, mirrored to tracing and to the event stream
    pub fn log_info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        let _ = self.events.send(PipelineEvent::info(message));
    }

    /// Per-file outcome: failures always surface, successes are sampled
    pub fn notify_result(&mut self, result: &CompressionResult) {
        if result.success {
            if NotifyPolicy::should_log_detail(result.saved_bytes, self.qualifying_seen) {
                let message = format!(
                    "Compressed {}: {:.1}% smaller",
                    self.relative_display(&result.path),
                    result.compression_percent()
                );
                info!("{}", message);
                let _ = self.events.send(PipelineEvent::info(message));
            }
            if result.saved_bytes > NotifyPolicy::DETAIL_MIN_SAVED_BYTES {
                self.qualifying_seen += 1;
            }
        } else {
            let message = format!(
                "Error processing {}: {}",
                self.relative_display(&result.path),
                result.error.as_deref().unwrap_or("unknown error")
            );
            error!("{}", message);
            let _ = self.events.send(PipelineEvent::error(message));
        }
    }

    /// Progress counter followed by the matching statistics snapshot.
    /// Always emitted as a pair, progress first.
    pub fn notify_progress(&self, stats: &RunStatistics) {
        let _ = self.events.send(PipelineEvent::progress(
            stats.processed_images,
            stats.total_images,
        ));
        let _ = self.events.send(PipelineEvent::stats(stats.clone()));
    }

    /// Terminal event. The caller must not emit anything after this.
    pub fn notify_finished(&self, stats: RunStatistics, stopped: bool) {
        let _ = self.events.send(PipelineEvent::finished(stats, stopped));
    }

    fn relative_display(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_directory)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LogLevel;

    fn channel() -> (
        mpsc::UnboundedSender<PipelineEvent>,
        mpsc::UnboundedReceiver<PipelineEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_detail_gate_requires_meaningful_saving() {
        // Strictly greater than 1 KiB
        assert!(!NotifyPolicy::should_log_detail(1024, 0));
        assert!(NotifyPolicy::should_log_detail(1025, 0));
        assert!(!NotifyPolicy::should_log_detail(500, 0));
    }

    #[test]
    fn test_detail_gate_samples_every_tenth_qualifying_file() {
        assert!(NotifyPolicy::should_log_detail(2048, 0));
        for index in 1..10 {
            assert!(!NotifyPolicy::should_log_detail(2048, index));
        }
        assert!(NotifyPolicy::should_log_detail(2048, 10));
    }

    #[test]
    fn test_snapshot_gate() {
        assert!(NotifyPolicy::should_emit_snapshot(5, 100));
        assert!(!NotifyPolicy::should_emit_snapshot(3, 100));
        assert!(NotifyPolicy::should_emit_snapshot(95, 100));
        // Final task always emits even off-interval
        assert!(NotifyPolicy::should_emit_snapshot(7, 7));
        assert!(!NotifyPolicy::should_emit_snapshot(0, 0));
    }

    #[test]
    fn test_failures_are_never_throttled() {
        let (tx, mut rx) = channel();
        let mut notifier = ProgressNotifier::new(tx, PathBuf::from("/photos"));

        // First qualifying success logs, second is sampled out
        notifier.notify_result(&CompressionResult::compressed(
            PathBuf::from("/photos/a.jpg"),
            4096,
            2048,
        ));
        notifier.notify_result(&CompressionResult::compressed(
            PathBuf::from("/photos/b.jpg"),
            4096,
            2048,
        ));
        // Failures go through regardless of sampling
        notifier.notify_result(&CompressionResult::failed(
            PathBuf::from("/photos/sub/c.jpg"),
            "decode error".to_string(),
        ));

        match rx.try_recv().unwrap() {
            PipelineEvent::Log { level, message } => {
                assert_eq!(level, LogLevel::Info);
                assert_eq!(message, "Compressed a.jpg: 50.0% smaller");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            PipelineEvent::Log { level, message } => {
                assert_eq!(level, LogLevel::Error);
                assert_eq!(message, "Error processing sub/c.jpg: decode error");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "no extra events expected");
    }

    #[test]
    fn test_progress_and_stats_arrive_as_a_pair() {
        let (tx, mut rx) = channel();
        let notifier = ProgressNotifier::new(tx, PathBuf::from("/photos"));

        let stats = RunStatistics {
            total_images: 10,
            processed_images: 5,
            successful: 4,
            failed: 1,
            total_saved_bytes: 8192,
            elapsed_seconds: 1.0,
        };
        notifier.notify_progress(&stats);

        match rx.try_recv().unwrap() {
            PipelineEvent::Progress {
                processed,
                total,
                percentage,
            } => {
                assert_eq!(processed, 5);
                assert_eq!(total, 10);
                assert!((percentage - 50.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            PipelineEvent::Stats { stats } => assert_eq!(stats.processed_images, 5),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_paths_outside_base_fall_back_to_absolute() {
        let (tx, mut rx) = channel();
        let mut notifier = ProgressNotifier::new(tx, PathBuf::from("/photos"));

        notifier.notify_result(&CompressionResult::failed(
            PathBuf::from("/elsewhere/x.jpg"),
            "boom".to_string(),
        ));

        match rx.try_recv().unwrap() {
            PipelineEvent::Log { message, .. } => {
                assert_eq!(message, "Error processing /elsewhere/x.jpg: boom");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
