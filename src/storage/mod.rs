//! SQLite persistence for feature records and reaction-test results.
//!
//! One synchronous connection owned by the control loop; every write is a
//! short blocking call. Timestamps are stored as REAL unix seconds so the
//! export join can bucket them arithmetically.

pub mod export;

use crate::core::FeatureRecord;
use crate::pvt::PvtResult;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Row counts and headline numbers for the status display.
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub feature_records: u64,
    pub pvt_results: u64,
    pub labeled_records: u64,
    pub mean_reaction_ms: Option<f64>,
}

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let storage = Self { conn };
        storage.migrate()?;
        info!("database ready at {}", path.display());
        Ok(storage)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS training_data (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp           REAL NOT NULL,
                typing_speed        INTEGER NOT NULL,
                avg_key_interval    REAL NOT NULL,
                std_key_interval    REAL NOT NULL,
                max_key_interval    REAL NOT NULL,
                min_key_interval    REAL NOT NULL,
                mistype_count       INTEGER NOT NULL,
                avg_key_hold        REAL NOT NULL,
                pointer_distance    REAL NOT NULL,
                pointer_avg_speed   REAL NOT NULL,
                click_count         INTEGER NOT NULL,
                left_click_count    INTEGER NOT NULL,
                right_click_count   INTEGER NOT NULL,
                still_ratio         REAL NOT NULL,
                window_hash         TEXT NOT NULL,
                work_category       TEXT NOT NULL,
                window_switch_count INTEGER NOT NULL,
                temperature         REAL NOT NULL,
                humidity            REAL NOT NULL,
                pressure            REAL NOT NULL,
                env_synthetic       INTEGER NOT NULL,
                focus_label         REAL
            );

            CREATE TABLE IF NOT EXISTS pvt_results (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp        REAL NOT NULL,
                stimulus_time    REAL NOT NULL,
                reaction_time_ms REAL NOT NULL,
                focus_score      REAL NOT NULL,
                alertness_level  TEXT NOT NULL,
                is_lapse         INTEGER NOT NULL,
                false_start      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_training_data_timestamp
                ON training_data(timestamp);
            CREATE INDEX IF NOT EXISTS idx_pvt_results_timestamp
                ON pvt_results(timestamp);",
        )
    }

    pub fn insert_feature_record(&self, record: &FeatureRecord) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO training_data (
                timestamp, typing_speed, avg_key_interval, std_key_interval,
                max_key_interval, min_key_interval, mistype_count, avg_key_hold,
                pointer_distance, pointer_avg_speed, click_count,
                left_click_count, right_click_count, still_ratio,
                window_hash, work_category, window_switch_count,
                temperature, humidity, pressure, env_synthetic
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                       ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                unix_seconds(record.system_time),
                record.keystroke.typing_speed_kpm,
                record.keystroke.avg_key_interval_ms,
                record.keystroke.std_key_interval_ms,
                record.keystroke.max_key_interval_ms,
                record.keystroke.min_key_interval_ms,
                record.keystroke.mistype_count,
                record.keystroke.avg_key_hold_ms,
                record.pointer.distance_px,
                record.pointer.avg_speed_px_s,
                record.pointer.click_count,
                record.pointer.left_click_count,
                record.pointer.right_click_count,
                record.pointer.still_ratio,
                record.window_hash,
                record.work_category,
                record.window_switch_count,
                record.temperature,
                record.humidity,
                record.pressure,
                record.env_synthetic,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_pvt_result(&self, result: &PvtResult) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO pvt_results (
                timestamp, stimulus_time, reaction_time_ms, focus_score,
                alertness_level, is_lapse, false_start
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                unix_seconds(result.timestamp),
                unix_seconds(result.stimulus_time),
                result.reaction_time_ms,
                result.focus_score,
                result.alertness_level.as_str(),
                result.is_lapse,
                result.false_start,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Attach `focus_score` to the most recent feature record. Best effort:
    /// returns false when the table is empty.
    pub fn backfill_latest_feature_label(&self, focus_score: f64) -> Result<bool, StorageError> {
        let updated = self.conn.execute(
            "UPDATE training_data
             SET focus_label = ?1
             WHERE id = (SELECT MAX(id) FROM training_data)",
            params![focus_score],
        )?;
        Ok(updated > 0)
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let feature_records: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM training_data", [], |row| row.get(0))?;
        let labeled_records: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM training_data WHERE focus_label IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let pvt_results: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM pvt_results", [], |row| row.get(0))?;
        let mean_reaction_ms: Option<f64> = self
            .conn
            .query_row("SELECT AVG(reaction_time_ms) FROM pvt_results", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        Ok(StorageStats {
            feature_records,
            pvt_results,
            labeled_records,
            mean_reaction_ms,
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn unix_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FeatureRecord, KeystrokeStats, PointerStats};
    use crate::pvt::AlertnessLevel;

    fn sample_record(ts: DateTime<Utc>) -> FeatureRecord {
        FeatureRecord {
            system_time: ts,
            keystroke: KeystrokeStats {
                typing_speed_kpm: 42,
                avg_key_interval_ms: 140.0,
                ..KeystrokeStats::default()
            },
            pointer: PointerStats {
                distance_px: 512.0,
                click_count: 3,
                ..PointerStats::default()
            },
            window_hash: "abcdef0123456789".into(),
            work_category: "development".into(),
            window_switch_count: 2,
            temperature: 24.0,
            humidity: 45.0,
            pressure: 1010.0,
            env_synthetic: false,
        }
    }

    fn sample_result(ts: DateTime<Utc>, focus_score: f64) -> PvtResult {
        PvtResult {
            timestamp: ts,
            stimulus_time: ts,
            reaction_time_ms: 420.0,
            focus_score,
            alertness_level: AlertnessLevel::VeryHigh,
            is_lapse: false,
            false_start: false,
        }
    }

    #[test]
    fn test_insert_and_count() {
        let storage = Storage::open_in_memory().unwrap();
        let now = Utc::now();

        storage.insert_feature_record(&sample_record(now)).unwrap();
        storage.insert_pvt_result(&sample_result(now, 0.95)).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.feature_records, 1);
        assert_eq!(stats.pvt_results, 1);
        assert_eq!(stats.labeled_records, 0);
        assert!((stats.mean_reaction_ms.unwrap() - 420.0).abs() < 1e-9);
    }

    #[test]
    fn test_backfill_labels_most_recent_row() {
        let storage = Storage::open_in_memory().unwrap();
        let now = Utc::now();

        storage.insert_feature_record(&sample_record(now)).unwrap();
        storage
            .insert_feature_record(&sample_record(now + chrono::Duration::seconds(60)))
            .unwrap();

        assert!(storage.backfill_latest_feature_label(0.8).unwrap());

        let labeled: Vec<(i64, Option<f64>)> = {
            let mut stmt = storage
                .conn
                .prepare("SELECT id, focus_label FROM training_data ORDER BY id")
                .unwrap();
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap()
        };

        assert_eq!(labeled[0].1, None);
        assert_eq!(labeled[1].1, Some(0.8));
    }

    #[test]
    fn test_backfill_on_empty_table_is_noop() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(!storage.backfill_latest_feature_label(0.5).unwrap());
    }

    #[test]
    fn test_empty_stats() {
        let storage = Storage::open_in_memory().unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.feature_records, 0);
        assert!(stats.mean_reaction_ms.is_none());
    }
}
