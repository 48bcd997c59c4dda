//! Training-set export.
//!
//! Feature rows and reaction-test results are captured on different clocks
//! (60 s vs 300 s), so the export joins them by hour bucket rather than by
//! key: each feature row takes the focus score of the latest reaction test
//! in the same `floor(ts / 3600)` bucket, and rows with no test in their
//! hour are left out of the labeled set.

use crate::storage::{Storage, StorageError};
use chrono::{DateTime, Local, Timelike};
use log::info;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fmt::Write as _;
use std::path::Path;

const BUCKET_SECS: f64 = 3600.0;

/// Labels derived from the joined focus score.
fn target_state(focus_score: f64) -> &'static str {
    if focus_score > 0.7 {
        "Deep Focus"
    } else if focus_score >= 0.3 {
        "Open"
    } else {
        "Overheat"
    }
}

/// Cyclical encoding of an hour of day.
fn cyclical_hour(hour: u32) -> (f64, f64) {
    let angle = TAU * hour as f64 / 24.0;
    (angle.sin(), angle.cos())
}

fn hour_features(unix_secs: f64) -> (f64, f64) {
    let hour = DateTime::from_timestamp_millis((unix_secs * 1000.0) as i64)
        .map(|ts| ts.with_timezone(&Local).hour())
        .unwrap_or(0);
    cyclical_hour(hour)
}

/// Minimal CSV quoting: only fields containing a delimiter, quote, or
/// newline are wrapped.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

struct FeatureRow {
    timestamp: f64,
    typing_speed: u32,
    avg_key_interval: f64,
    std_key_interval: f64,
    max_key_interval: f64,
    min_key_interval: f64,
    mistype_count: u32,
    avg_key_hold: f64,
    pointer_distance: f64,
    pointer_avg_speed: f64,
    click_count: u32,
    left_click_count: u32,
    right_click_count: u32,
    still_ratio: f64,
    work_category: String,
    window_switch_count: u32,
    temperature: f64,
    humidity: f64,
    pressure: f64,
}

impl Storage {
    /// Write the labeled training set as CSV. `categories` fixes the one-hot
    /// column order so exports are schema-stable across runs. Returns the
    /// number of labeled rows written.
    pub fn export_dataset(
        &self,
        path: &Path,
        categories: &[String],
    ) -> Result<usize, StorageError> {
        let scores = self.latest_score_per_bucket()?;
        let rows = self.feature_rows()?;

        let mut out = String::new();
        out.push_str(
            "timestamp,typing_speed,avg_key_interval,std_key_interval,\
             max_key_interval,min_key_interval,mistype_count,avg_key_hold,\
             pointer_distance,pointer_avg_speed,click_count,left_click_count,\
             right_click_count,still_ratio,window_switch_count,\
             temperature,humidity,pressure",
        );
        for category in categories {
            let _ = write!(out, ",work_category_{category}");
        }
        out.push_str(",hour_sin,hour_cos,target_focus_score,target_state\n");

        let mut written = 0usize;
        for row in rows {
            let bucket = (row.timestamp / BUCKET_SECS).floor() as i64;
            let score = match scores.get(&bucket) {
                Some((_, score)) => *score,
                None => continue,
            };

            let (hour_sin, hour_cos) = hour_features(row.timestamp);
            let _ = write!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                row.timestamp,
                row.typing_speed,
                row.avg_key_interval,
                row.std_key_interval,
                row.max_key_interval,
                row.min_key_interval,
                row.mistype_count,
                row.avg_key_hold,
                row.pointer_distance,
                row.pointer_avg_speed,
                row.click_count,
                row.left_click_count,
                row.right_click_count,
                row.still_ratio,
                row.window_switch_count,
                row.temperature,
                row.humidity,
                row.pressure,
            );
            for category in categories {
                let hot = if row.work_category == *category { 1 } else { 0 };
                let _ = write!(out, ",{hot}");
            }
            let _ = writeln!(
                out,
                ",{hour_sin},{hour_cos},{score},{}",
                csv_field(target_state(score))
            );
            written += 1;
        }

        std::fs::write(path, out)?;
        info!("exported {written} labeled rows to {}", path.display());
        Ok(written)
    }

    /// Write every feature row unjoined and unlabeled.
    pub fn export_raw(&self, path: &Path) -> Result<usize, StorageError> {
        let rows = self.feature_rows()?;

        let mut out = String::new();
        out.push_str(
            "timestamp,typing_speed,avg_key_interval,std_key_interval,\
             max_key_interval,min_key_interval,mistype_count,avg_key_hold,\
             pointer_distance,pointer_avg_speed,click_count,left_click_count,\
             right_click_count,still_ratio,work_category,window_switch_count,\
             temperature,humidity,pressure\n",
        );

        for row in &rows {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                row.timestamp,
                row.typing_speed,
                row.avg_key_interval,
                row.std_key_interval,
                row.max_key_interval,
                row.min_key_interval,
                row.mistype_count,
                row.avg_key_hold,
                row.pointer_distance,
                row.pointer_avg_speed,
                row.click_count,
                row.left_click_count,
                row.right_click_count,
                row.still_ratio,
                csv_field(&row.work_category),
                row.window_switch_count,
                row.temperature,
                row.humidity,
                row.pressure,
            );
        }

        std::fs::write(path, out)?;
        info!("exported {} raw rows to {}", rows.len(), path.display());
        Ok(rows.len())
    }

    /// Latest (by timestamp) focus score per hour bucket.
    fn latest_score_per_bucket(&self) -> Result<HashMap<i64, (f64, f64)>, StorageError> {
        let mut stmt = self
            .conn()
            .prepare("SELECT timestamp, focus_score FROM pvt_results")?;
        let mut scores: HashMap<i64, (f64, f64)> = HashMap::new();

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let ts: f64 = row.get(0)?;
            let score: f64 = row.get(1)?;
            let bucket = (ts / BUCKET_SECS).floor() as i64;
            match scores.get(&bucket) {
                Some((existing_ts, _)) if *existing_ts >= ts => {}
                _ => {
                    scores.insert(bucket, (ts, score));
                }
            }
        }

        Ok(scores)
    }

    fn feature_rows(&self) -> Result<Vec<FeatureRow>, StorageError> {
        let mut stmt = self.conn().prepare(
            "SELECT timestamp, typing_speed, avg_key_interval, std_key_interval,
                    max_key_interval, min_key_interval, mistype_count,
                    avg_key_hold, pointer_distance, pointer_avg_speed,
                    click_count, left_click_count, right_click_count,
                    still_ratio, work_category, window_switch_count,
                    temperature, humidity, pressure
             FROM training_data
             ORDER BY timestamp",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FeatureRow {
                    timestamp: row.get(0)?,
                    typing_speed: row.get(1)?,
                    avg_key_interval: row.get(2)?,
                    std_key_interval: row.get(3)?,
                    max_key_interval: row.get(4)?,
                    min_key_interval: row.get(5)?,
                    mistype_count: row.get(6)?,
                    avg_key_hold: row.get(7)?,
                    pointer_distance: row.get(8)?,
                    pointer_avg_speed: row.get(9)?,
                    click_count: row.get(10)?,
                    left_click_count: row.get(11)?,
                    right_click_count: row.get(12)?,
                    still_ratio: row.get(13)?,
                    work_category: row.get(14)?,
                    window_switch_count: row.get(15)?,
                    temperature: row.get(16)?,
                    humidity: row.get(17)?,
                    pressure: row.get(18)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_state_thresholds() {
        assert_eq!(target_state(0.9), "Deep Focus");
        assert_eq!(target_state(0.71), "Deep Focus");
        assert_eq!(target_state(0.7), "Open");
        assert_eq!(target_state(0.3), "Open");
        assert_eq!(target_state(0.29), "Overheat");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_hour_features_are_on_unit_circle() {
        let (sin, cos) = hour_features(1_700_000_000.0);
        assert!((sin * sin + cos * cos - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cyclical_hour_at_fourteen() {
        let (sin, cos) = cyclical_hour(14);
        let angle = TAU * 14.0 / 24.0;
        assert!((sin - angle.sin()).abs() < 1e-12);
        assert!((cos - angle.cos()).abs() < 1e-12);
        // Afternoon sits in the third quadrant of the day circle.
        assert!(sin < 0.0 && cos < 0.0);
    }
}
