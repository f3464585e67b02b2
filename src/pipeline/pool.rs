//! # Worker Pool Module
//!
//! Esecuzione dei task di compressione con parallelismo limitato.
//!
//! ## Responsabilità:
//! - Mantenere al massimo `workers` compressioni in volo
//! - Consegnare i risultati in ordine di completamento
//! - Onorare lo stop cooperativo senza troncare i task in volo
//!
//! ## Modello:
//! Le compressioni sono CPU e IO intensive, quindi girano su
//! `spawn_blocking`; il loop async si limita a rabboccare i worker e ad
//! attendere il prossimo completamento. Lo stop viene controllato prima
//! di ogni nuovo dispatch: i task già partiti finiscono e vengono
//! conteggiati, quelli mai partiti non vengono toccati.

use crate::compressor::CompressionResult;
use crate::scanner::ImageTask;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared cooperative cancellation flag.
///
/// Cloning is cheap and every clone observes the same state. Triggering
/// is idempotent; in-flight work is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns true only for the call that actually
    /// flipped the flag, so callers can log the transition once.
    pub fn trigger(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs jobs over a task list with bounded parallelism
pub struct WorkerPool {
    workers: usize,
    stop: StopFlag,
}

impl WorkerPool {
    /// `workers` must be at least 1; the caller validates the bound.
    pub fn new(workers: usize, stop: StopFlag) -> Self {
        Self { workers, stop }
    }

    /// Execute `job` for every task, at most `workers` at a time, feeding
    /// each result to `on_result` in completion order. Returns how many
    /// results were delivered.
    ///
    /// A panicking job is folded into a failed result instead of tearing
    /// down the pool.
    pub async fn run<J, F>(&self, job: J, tasks: Vec<ImageTask>, mut on_result: F) -> usize
    where
        J: Fn(ImageTask) -> CompressionResult + Clone + Send + 'static,
        F: FnMut(CompressionResult),
    {
        let mut queue = tasks.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut delivered = 0;

        loop {
            while in_flight.len() < self.workers && !self.stop.is_triggered() {
                let Some(task) = queue.next() else { break };
                let job = job.clone();
                let path = task.path.clone();
                let handle = tokio::task::spawn_blocking(move || job(task));
                in_flight.push(async move { (path, handle.await) });
            }

            let Some((path, joined)) = in_flight.next().await else {
                break;
            };

            let result = joined.unwrap_or_else(|e| {
                CompressionResult::failed(path, format!("worker panicked: {e}"))
            });
            on_result(result);
            delivered += 1;
        }

        let undispatched = queue.count();
        if undispatched > 0 {
            debug!("Stop requested, {} tasks never dispatched", undispatched);
        }

        delivered
    }
}
