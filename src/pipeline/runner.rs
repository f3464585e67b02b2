//! # Pipeline Runner Module
//!
//! Coordinamento di una run di compressione completa.
//!
//! ## Responsabilità:
//! - Validazione della configurazione e claim di run esclusiva
//! - Scansione, dispatch sul pool e raccolta dei risultati
//! - Aggiornamento delle statistiche da un singolo task coordinatore
//! - Emissione di eventi e riepilogo finale verso l'osservatore
//!
//! ## Flusso:
//! ```text
//! start(config) ──▶ Scanning ──▶ Processing ──▶ Finished
//!                                   │
//!                              stop()│ (cooperativo)
//!                                   ▼
//!                               Stopping ──▶ Finished
//! ```
//!
//! Le statistiche sono possedute esclusivamente dal coordinatore: i
//! worker non condividono contatori, quindi nessun lock è necessario.

use crate::compressor::Compressor;
use crate::config::RunConfig;
use crate::error::CompressError;
use crate::events::PipelineEvent;
use crate::notifier::{NotifyPolicy, ProgressNotifier};
use crate::pipeline::pool::{StopFlag, WorkerPool};
use crate::scanner::{ImageTask, Scanner};
use crate::stats::{RunStatistics, StatsAggregator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Lifecycle of a compression run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Processing,
    /// Stop requested, in-flight files still draining
    Stopping,
    Finished,
}

/// Entry point for launching compression runs.
///
/// A pipeline instance allows at most one active run; further `start`
/// calls are rejected until the current run finishes.
pub struct CompressionPipeline {
    run_active: Arc<AtomicBool>,
}

impl CompressionPipeline {
    pub fn new() -> Self {
        Self {
            run_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Validate `config` and launch a run in the background. The caller
    /// gets a [`RunHandle`] immediately; no compression work happens on
    /// this call path.
    pub fn start(&self, config: RunConfig) -> Result<RunHandle, CompressError> {
        config.validate()?;

        if self
            .run_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CompressError::RunActive);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        let stop = StopFlag::new();

        let coordinator = Coordinator {
            notifier: ProgressNotifier::new(events_tx, config.directory.clone()),
            config,
            stop: stop.clone(),
            state: state_tx,
            guard: RunGuard {
                active: Arc::clone(&self.run_active),
            },
        };
        let join = tokio::spawn(coordinator.run());

        Ok(RunHandle {
            events: events_rx,
            state: state_rx,
            stop,
            join,
        })
    }
}

impl Default for CompressionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the pipeline's single-run claim when the coordinator exits,
/// panics included
struct RunGuard {
    active: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Caller-side view of a running compression.
///
/// Dropping the handle detaches the run; it keeps going in the
/// background until finished.
pub struct RunHandle {
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    state: watch::Receiver<RunState>,
    stop: StopFlag,
    join: JoinHandle<()>,
}

impl RunHandle {
    /// Next event from the run. `None` means the stream is over: the
    /// terminal [`PipelineEvent::Finished`] has already been delivered.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Request a cooperative stop. Returns true only on the call that
    /// flipped the flag.
    pub fn stop(&self) -> bool {
        self.stop.trigger()
    }

    /// Clone of the stop flag, for wiring into signal handlers
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Subscription to state transitions, independent of the event stream
    pub fn state_changes(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Drain the remaining events and return the final statistics plus
    /// whether the run was stopped early
    pub async fn wait(mut self) -> (RunStatistics, bool) {
        let mut outcome = (RunStatistics::default(), false);
        while let Some(event) = self.events.recv().await {
            if let PipelineEvent::Finished { stats, stopped } = event {
                outcome = (stats, stopped);
            }
        }
        let _ = self.join.await;
        outcome
    }
}

/// Single task that owns the statistics and serializes every update
struct Coordinator {
    config: RunConfig,
    stop: StopFlag,
    notifier: ProgressNotifier,
    state: watch::Sender<RunState>,
    guard: RunGuard,
}

impl Coordinator {
    async fn run(self) {
        let Coordinator {
            config,
            stop,
            mut notifier,
            state,
            guard: _guard,
        } = self;

        let _ = state.send(RunState::Scanning);
        notifier.log_info("Scanning for images...");

        // The walk hits the filesystem; keep it off the async threads
        let directory = config.directory.clone();
        let min_size = config.min_file_size_bytes;
        let tasks = tokio::task::spawn_blocking(move || Scanner::scan(&directory, min_size))
            .await
            .unwrap_or_default();

        if tasks.is_empty() {
            notifier.log_info("No images found matching criteria");
            notifier.notify_finished(RunStatistics::default(), false);
            let _ = state.send(RunState::Finished);
            return;
        }

        let total = tasks.len();
        notifier.log_info(format!("Found {} images to process", total));
        notifier.log_info(format!("Using {} worker threads", config.workers));

        let _ = state.send(RunState::Processing);

        let compressor = Compressor::new(config.quality);
        let pool = WorkerPool::new(config.workers, stop.clone());
        let mut aggregator = StatsAggregator::new(total);
        let mut stopping_announced = false;

        pool.run(
            move |task: ImageTask| compressor.compress(&task.path),
            tasks,
            |result| {
                aggregator.record(&result);
                notifier.notify_result(&result);

                if NotifyPolicy::should_emit_snapshot(aggregator.processed(), total) {
                    notifier.notify_progress(&aggregator.snapshot());
                }

                // Announce the stop once, when the coordinator first
                // observes it between completions
                if stop.is_triggered() && !stopping_announced {
                    stopping_announced = true;
                    notifier.log_info("Stopping compression...");
                    let _ = state.send(RunState::Stopping);
                }
            },
        )
        .await;

        let stopped = stop.is_triggered();
        let stats = aggregator.snapshot();

        if stopped {
            notifier.log_info("Compression stopped by user");
        } else {
            notifier.log_info(format!(
                "Compression completed in {:.1} seconds!",
                stats.elapsed_seconds
            ));
            notifier.log_info(format!(
                "Successfully processed: {} images",
                stats.successful
            ));
            notifier.log_info(format!("Failed: {} images", stats.failed));

            if stats.total_saved_bytes > 0 {
                notifier.log_info(format!(
                    "Total space saved: {:.2} MB",
                    stats.total_saved_megabytes()
                ));
                notifier.log_info(format!(
                    "Average speed: {:.1} images/second",
                    stats.images_per_second()
                ));
            }
        }

        notifier.notify_finished(stats, stopped);
        let _ = state.send(RunState::Finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_for(dir: &Path) -> RunConfig {
        RunConfig {
            directory: dir.to_path_buf(),
            quality: 85,
            min_file_size_bytes: 0,
            workers: 2,
        }
    }

    /// Files small enough to take the bypass path: the run exercises the
    /// full pipeline without spending time in codecs.
    fn write_tiny_images(dir: &Path, count: usize) {
        for i in 0..count {
            fs::write(dir.join(format!("img_{i}.jpg")), b"tiny").unwrap();
        }
    }

    #[tokio::test]
    async fn test_full_run_reports_every_file() {
        let temp_dir = TempDir::new().unwrap();
        write_tiny_images(temp_dir.path(), 3);
        // Large enough to attempt a decode, which fails on garbage
        fs::write(temp_dir.path().join("broken.jpg"), vec![0xAB; 20_000]).unwrap();

        let pipeline = CompressionPipeline::new();
        let mut handle = pipeline.start(config_for(temp_dir.path())).unwrap();
        assert_eq!(handle.state(), RunState::Idle);
        let state_changes = handle.state_changes();

        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }

        assert_eq!(handle.state(), RunState::Finished);
        assert_eq!(*state_changes.borrow(), RunState::Finished);

        let finished: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::Finished { .. }))
            .collect();
        assert_eq!(finished.len(), 1, "exactly one terminal event");
        assert!(
            matches!(events.last(), Some(PipelineEvent::Finished { .. })),
            "the stream ends with the terminal event"
        );

        match events.last().unwrap() {
            PipelineEvent::Finished { stats, stopped } => {
                assert!(!stopped);
                assert_eq!(stats.total_images, 4);
                assert_eq!(stats.processed_images, 4);
                assert_eq!(stats.successful, 3);
                assert_eq!(stats.failed, 1);
            }
            _ => unreachable!(),
        }

        let logs: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Log { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert!(logs.contains(&"Found 4 images to process"));
        assert!(logs.iter().any(|m| m.contains("broken.jpg")));
        assert!(logs.contains(&"Failed: 1 images"));

        // Final completion always emits a progress snapshot
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::Progress {
                processed: 4,
                total: 4,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_empty_directory_finishes_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = CompressionPipeline::new();
        let handle = pipeline.start(config_for(temp_dir.path())).unwrap();

        let (stats, stopped) = handle.wait().await;

        assert!(!stopped);
        assert_eq!(stats.total_images, 0);
        assert_eq!(stats.processed_images, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_never_starts_a_run() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = CompressionPipeline::new();

        let mut bad_quality = config_for(temp_dir.path());
        bad_quality.quality = 0;
        assert!(matches!(
            pipeline.start(bad_quality),
            Err(CompressError::Validation(_))
        ));

        let mut bad_workers = config_for(temp_dir.path());
        bad_workers.workers = 0;
        assert!(matches!(
            pipeline.start(bad_workers),
            Err(CompressError::Validation(_))
        ));

        let bad_directory = config_for(Path::new("/no/such/directory"));
        assert!(matches!(
            pipeline.start(bad_directory),
            Err(CompressError::Validation(_))
        ));

        // A rejected start leaves the pipeline free for a valid one
        let handle = pipeline.start(config_for(temp_dir.path())).unwrap();
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_only_one_run_at_a_time() {
        let temp_dir = TempDir::new().unwrap();
        write_tiny_images(temp_dir.path(), 2);
        let pipeline = CompressionPipeline::new();

        let handle = pipeline.start(config_for(temp_dir.path())).unwrap();
        assert!(matches!(
            pipeline.start(config_for(temp_dir.path())),
            Err(CompressError::RunActive)
        ));

        handle.wait().await;

        // The claim is released once the run completes
        let handle = pipeline.start(config_for(temp_dir.path())).unwrap();
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_stop_before_processing_compresses_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write_tiny_images(temp_dir.path(), 12);
        let pipeline = CompressionPipeline::new();

        // On a current-thread runtime the coordinator cannot run before
        // the first await, so the flag is set ahead of any dispatch.
        let handle = pipeline.start(config_for(temp_dir.path())).unwrap();
        assert!(handle.stop());
        assert!(!handle.stop(), "second trigger reports no transition");

        let (stats, stopped) = handle.wait().await;

        assert!(stopped);
        assert_eq!(stats.total_images, 12);
        assert_eq!(stats.processed_images, 0);
        assert_eq!(stats.successful, 0);
        assert_eq!(stats.failed, 0);
    }
}
