//! Feature computation over event windows.
//!
//! Everything here is a pure function of the snapshotted/drained events.
//! Every numeric field defaults to zero when the window held no events, so
//! downstream consumers never see a missing value or NaN.

use crate::collector::buffer::PointerDrain;
use crate::collector::types::KeyEvent;
use crate::context::WindowStats;
use crate::environment::EnvReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Hold durations outside this range are treated as pairing artifacts.
const HOLD_PLAUSIBLE_MS: std::ops::RangeInclusive<f64> = 20.0..=2000.0;

/// Keystroke statistics over the trailing window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeystrokeStats {
    /// Key presses in the window (keys/min for a 60 s window)
    pub typing_speed_kpm: u32,
    /// Mean inter-press interval in milliseconds
    pub avg_key_interval_ms: f64,
    /// Population standard deviation of inter-press intervals
    pub std_key_interval_ms: f64,
    pub max_key_interval_ms: f64,
    pub min_key_interval_ms: f64,
    /// Backspace/delete presses in the window
    pub mistype_count: u32,
    /// Mean key hold duration in milliseconds
    pub avg_key_hold_ms: f64,
}

/// Pointer statistics since the previous drain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointerStats {
    pub distance_px: f64,
    pub avg_speed_px_s: f64,
    pub click_count: u32,
    pub left_click_count: u32,
    pub right_click_count: u32,
    /// Fraction of elapsed time spent still, clamped to [0, 1]
    pub still_ratio: f64,
}

/// One labeled-ready snapshot of behavioral and environmental signals.
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub system_time: DateTime<Utc>,
    pub keystroke: KeystrokeStats,
    pub pointer: PointerStats,
    pub window_hash: String,
    pub work_category: String,
    pub window_switch_count: u32,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub env_synthetic: bool,
}

impl FeatureRecord {
    pub fn assemble(
        system_time: DateTime<Utc>,
        keystroke: KeystrokeStats,
        pointer: PointerStats,
        window: WindowStats,
        environment: EnvReading,
    ) -> Self {
        Self {
            system_time,
            keystroke,
            pointer,
            window_hash: window.window_hash,
            work_category: window.work_category,
            window_switch_count: window.switch_count,
            temperature: environment.temperature,
            humidity: environment.humidity,
            pressure: environment.pressure,
            env_synthetic: environment.synthetic,
        }
    }
}

/// Compute keystroke statistics from a window snapshot.
pub fn compute_keystroke_stats(events: &[KeyEvent]) -> KeystrokeStats {
    if events.is_empty() {
        return KeystrokeStats::default();
    }

    let presses: Vec<&KeyEvent> = events.iter().filter(|e| e.is_press()).collect();

    let intervals: Vec<f64> = presses
        .windows(2)
        .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64)
        .collect();

    let mistype_count = presses.iter().filter(|e| e.is_backspace).count() as u32;

    let holds = hold_durations(events);

    let (avg, std, max, min) = if intervals.is_empty() {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        (
            intervals.iter().mean(),
            intervals.iter().population_std_dev(),
            Statistics::max(intervals.iter()),
            Statistics::min(intervals.iter()),
        )
    };

    KeystrokeStats {
        typing_speed_kpm: presses.len() as u32,
        avg_key_interval_ms: avg,
        std_key_interval_ms: std,
        max_key_interval_ms: max,
        min_key_interval_ms: min,
        mistype_count,
        avg_key_hold_ms: if holds.is_empty() {
            0.0
        } else {
            holds.iter().mean()
        },
    }
}

/// Estimate hold durations by pairing each press with the next release.
///
/// Key identity is never available (privacy boundary), so overlapping holds
/// from rollover typing are approximated by consecutive pairing and filtered
/// to a plausible range.
fn hold_durations(events: &[KeyEvent]) -> Vec<f64> {
    let mut holds = Vec::new();
    let mut pending_press: Option<&KeyEvent> = None;

    for event in events {
        if event.is_press() {
            pending_press = Some(event);
        } else if let Some(press) = pending_press.take() {
            let hold_ms = (event.timestamp - press.timestamp).num_milliseconds() as f64;
            if HOLD_PLAUSIBLE_MS.contains(&hold_ms) {
                holds.push(hold_ms);
            }
        }
    }

    holds
}

/// Turn drained pointer counters into rate statistics.
pub fn compute_pointer_stats(drain: PointerDrain) -> PointerStats {
    let (avg_speed, still_ratio) = if drain.elapsed_secs > 0.0 {
        (
            drain.distance_px / drain.elapsed_secs,
            (drain.still_secs / drain.elapsed_secs).clamp(0.0, 1.0),
        )
    } else {
        (0.0, 0.0)
    };

    PointerStats {
        distance_px: drain.distance_px,
        avg_speed_px_s: avg_speed,
        click_count: drain.left_clicks + drain.right_clicks + drain.other_clicks,
        left_click_count: drain.left_clicks,
        right_click_count: drain.right_clicks,
        still_ratio,
    }
}
