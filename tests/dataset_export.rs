//! End-to-end persistence and export: feature records and reaction-test
//! results go in through the public API, a labeled CSV comes out.

use chrono::{DateTime, Duration, Utc};
use zonekey::core::{FeatureRecord, KeystrokeStats, PointerStats};
use zonekey::pvt::{AlertnessLevel, PvtResult};
use zonekey::storage::Storage;

fn record_at(ts: DateTime<Utc>, category: &str) -> FeatureRecord {
    FeatureRecord {
        system_time: ts,
        keystroke: KeystrokeStats {
            typing_speed_kpm: 60,
            avg_key_interval_ms: 150.0,
            ..KeystrokeStats::default()
        },
        pointer: PointerStats {
            distance_px: 800.0,
            click_count: 5,
            left_click_count: 4,
            right_click_count: 1,
            still_ratio: 0.25,
            ..PointerStats::default()
        },
        window_hash: "0011223344556677".into(),
        work_category: category.into(),
        window_switch_count: 3,
        temperature: 23.5,
        humidity: 44.0,
        pressure: 1011.0,
        env_synthetic: true,
    }
}

fn result_at(ts: DateTime<Utc>, focus_score: f64) -> PvtResult {
    PvtResult {
        timestamp: ts,
        stimulus_time: ts,
        reaction_time_ms: 380.0,
        focus_score,
        alertness_level: AlertnessLevel::VeryHigh,
        is_lapse: false,
        false_start: false,
    }
}

fn column(header: &str, name: &str) -> usize {
    header
        .split(',')
        .position(|col| col == name)
        .unwrap_or_else(|| panic!("column {name} missing from header: {header}"))
}

#[test]
fn export_joins_features_to_same_hour_results() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::open(&dir.path().join("test.db")).unwrap();

    // Two feature rows and one reaction test inside one hour bucket,
    // plus a feature row two hours later with no test to join against.
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    storage
        .insert_feature_record(&record_at(base, "development"))
        .unwrap();
    storage
        .insert_feature_record(&record_at(base + Duration::seconds(60), "development"))
        .unwrap();
    storage
        .insert_feature_record(&record_at(base + Duration::seconds(7200), "browsing"))
        .unwrap();
    storage
        .insert_pvt_result(&result_at(base + Duration::seconds(120), 0.9))
        .unwrap();

    let categories: Vec<String> = ["development", "communication", "browsing", "document"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let out = dir.path().join("dataset.csv");
    let written = storage.export_dataset(&out, &categories).unwrap();
    assert_eq!(written, 2);

    let content = std::fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);

    let dev_col = column(header, "work_category_development");
    let comm_col = column(header, "work_category_communication");
    let sin_col = column(header, "hour_sin");
    let cos_col = column(header, "hour_cos");
    let score_col = column(header, "target_focus_score");
    let state_col = column(header, "target_state");

    for row in &rows {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields[dev_col], "1");
        assert_eq!(fields[comm_col], "0");
        assert_eq!(fields[score_col], "0.9");
        assert_eq!(fields[state_col], "Deep Focus");

        // Cyclical hour encoding stays on the unit circle.
        let sin: f64 = fields[sin_col].parse().unwrap();
        let cos: f64 = fields[cos_col].parse().unwrap();
        assert!((sin * sin + cos * cos - 1.0).abs() < 1e-9);
    }
}

#[test]
fn later_result_in_bucket_wins() {
    let storage = Storage::open_in_memory().unwrap();
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    storage
        .insert_feature_record(&record_at(base, "development"))
        .unwrap();
    storage
        .insert_pvt_result(&result_at(base + Duration::seconds(60), 0.2))
        .unwrap();
    storage
        .insert_pvt_result(&result_at(base + Duration::seconds(600), 0.5))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("dataset.csv");
    let categories = vec!["development".to_string()];
    storage.export_dataset(&out, &categories).unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    let row = lines.next().unwrap();

    let score_col = column(header, "target_focus_score");
    let state_col = column(header, "target_state");
    let fields: Vec<&str> = row.split(',').collect();
    assert_eq!(fields[score_col], "0.5");
    assert_eq!(fields[state_col], "Open");
}

#[test]
fn raw_export_includes_unjoined_rows() {
    let storage = Storage::open_in_memory().unwrap();
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    storage
        .insert_feature_record(&record_at(base, "development"))
        .unwrap();
    storage
        .insert_feature_record(&record_at(base + Duration::seconds(7200), "browsing"))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("raw.csv");
    let written = storage.export_raw(&out).unwrap();
    assert_eq!(written, 2);

    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.lines().next().unwrap().contains("work_category"));
    assert!(content.contains("browsing"));
}
