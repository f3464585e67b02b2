//! # Pipeline Events Module
//!
//! Messaggi strutturati emessi dal coordinatore verso il consumatore
//! (CLI interattiva, stream NDJSON o test).
//!
//! ## Responsabilità:
//! - Definizione del vocabolario di eventi della pipeline
//! - Serializzazione JSON con tag `type` per il parsing a valle
//!
//! Ogni evento è autocontenuto: il consumatore non deve ricostruire
//! stato leggendo eventi precedenti.

use crate::stats::RunStatistics;
use serde::Serialize;

/// Severity attached to `PipelineEvent::Log`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One message on the pipeline's outbound stream
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Human-readable line, mirrored to the tracing output
    #[serde(rename = "log")]
    Log { level: LogLevel, message: String },

    /// Completion counter, throttled by the notifier
    #[serde(rename = "progress")]
    Progress {
        processed: usize,
        total: usize,
        percentage: f64,
    },

    /// Periodic counters snapshot, paired with each progress event
    #[serde(rename = "stats")]
    Stats { stats: RunStatistics },

    /// Terminal event; nothing follows it on the stream
    #[serde(rename = "finished")]
    Finished { stats: RunStatistics, stopped: bool },
}

impl PipelineEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }

    /// Progress out of `total`; an empty run reports 0%
    pub fn progress(processed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (processed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self::Progress {
            processed,
            total,
            percentage,
        }
    }

    pub fn stats(stats: RunStatistics) -> Self {
        Self::Stats { stats }
    }

    pub fn finished(stats: RunStatistics, stopped: bool) -> Self {
        Self::Finished { stats, stopped }
    }

    /// Single-line JSON for NDJSON output
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        match PipelineEvent::progress(25, 100) {
            PipelineEvent::Progress { percentage, .. } => {
                assert!((percentage - 25.0).abs() < f64::EPSILON)
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Guard against division by zero on empty runs
        match PipelineEvent::progress(0, 0) {
            PipelineEvent::Progress { percentage, .. } => assert_eq!(percentage, 0.0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_json_carries_type_tag() {
        let json = PipelineEvent::info("Found 3 images to compress").to_json();
        assert!(json.contains("\"type\":\"log\""));
        assert!(json.contains("\"level\":\"info\""));

        let json = PipelineEvent::finished(RunStatistics::default(), true).to_json();
        assert!(json.contains("\"type\":\"finished\""));
        assert!(json.contains("\"stopped\":true"));
    }
}
