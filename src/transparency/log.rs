//! Privacy-preserving transparency log.
//!
//! This module tracks and exposes statistics about data collection
//! without storing any personal or identifying information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Transparency statistics for the current run.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of keyboard events processed
    key_events: AtomicU64,
    /// Number of pointer events processed
    pointer_events: AtomicU64,
    /// Number of feature records persisted
    feature_records: AtomicU64,
    /// Number of completed reaction-test sessions
    pvt_sessions: AtomicU64,
    /// Run start time
    run_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            key_events: AtomicU64::new(0),
            pointer_events: AtomicU64::new(0),
            feature_records: AtomicU64::new(0),
            pvt_sessions: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        // Try to load existing stats
        if let Err(e) = log.load() {
            eprintln!("Note: Could not load previous transparency stats: {e}");
        }

        log
    }

    /// Record a keyboard event.
    pub fn record_key_event(&self) {
        self.key_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a pointer event.
    pub fn record_pointer_event(&self) {
        self.pointer_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a persisted feature record.
    pub fn record_feature_record(&self) {
        self.feature_records.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed reaction-test session.
    pub fn record_pvt_session(&self) {
        self.pvt_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            key_events: self.key_events.load(Ordering::Relaxed),
            pointer_events: self.pointer_events.load(Ordering::Relaxed),
            feature_records: self.feature_records.load(Ordering::Relaxed),
            pvt_sessions: self.pvt_sessions.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds() as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Collection Statistics:\n\
             - Keyboard events processed: {}\n\
             - Pointer events processed: {}\n\
             - Feature records persisted: {}\n\
             - Reaction-test sessions completed: {}\n\
             - Run duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No key symbols captured\n\
             - Window titles stored as truncated hashes only\n\
             - Only timing and magnitude data retained",
            stats.key_events,
            stats.pointer_events,
            stats.feature_records,
            stats.pvt_sessions,
            stats.run_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                key_events: stats.key_events,
                pointer_events: stats.pointer_events,
                feature_records: stats.feature_records,
                pvt_sessions: stats.pvt_sessions,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.key_events.store(persisted.key_events, Ordering::Relaxed);
                self.pointer_events
                    .store(persisted.pointer_events, Ordering::Relaxed);
                self.feature_records
                    .store(persisted.feature_records, Ordering::Relaxed);
                self.pvt_sessions
                    .store(persisted.pvt_sessions, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.key_events.store(0, Ordering::Relaxed);
        self.pointer_events.store(0, Ordering::Relaxed);
        self.feature_records.store(0, Ordering::Relaxed);
        self.pvt_sessions.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub key_events: u64,
    pub pointer_events: u64,
    pub feature_records: u64,
    pub pvt_sessions: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    key_events: u64,
    pointer_events: u64,
    feature_records: u64,
    pvt_sessions: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparency_log_counting() {
        let log = TransparencyLog::new();

        log.record_key_event();
        log.record_key_event();
        log.record_pointer_event();
        log.record_pvt_session();

        let stats = log.stats();
        assert_eq!(stats.key_events, 2);
        assert_eq!(stats.pointer_events, 1);
        assert_eq!(stats.pvt_sessions, 1);
    }

    #[test]
    fn test_transparency_log_reset() {
        let log = TransparencyLog::new();

        log.record_key_event();
        log.record_feature_record();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.key_events, 0);
        assert_eq!(stats.feature_records, 0);
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Keyboard events"));
        assert!(summary.contains("Pointer events"));
        assert!(summary.contains("Privacy Guarantee"));
        assert!(summary.contains("No key symbols captured"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transparency.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_key_event();
        log.record_pvt_session();
        log.save().unwrap();

        let reloaded = TransparencyLog::with_persistence(path);
        let stats = reloaded.stats();
        assert_eq!(stats.key_events, 1);
        assert_eq!(stats.pvt_sessions, 1);
    }
}
