//! Modulo pipeline: esecuzione concorrente di una run di compressione.
//!
//! `pool` limita il parallelismo e raccoglie i risultati in ordine di
//! completamento, `runner` coordina la run completa: scansione,
//! dispatch, statistiche ed eventi verso l'esterno.

pub mod pool;
pub mod runner;

pub use pool::{StopFlag, WorkerPool};
pub use runner::{CompressionPipeline, RunHandle, RunState};
