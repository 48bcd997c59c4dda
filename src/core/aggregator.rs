//! Windowed aggregation of behavior, context, and environment signals.

use crate::collector::buffer::{KeyEventBuffer, PointerAccumulator};
use crate::collector::types::InputEvent;
use crate::context::{ActiveWindowSource, CategoryRule, WindowTracker};
use crate::core::features::{
    compute_keystroke_stats, compute_pointer_stats, FeatureRecord,
};
use crate::environment::{EnvironmentMonitor, EnvironmentSource};
use chrono::{DateTime, Duration, Utc};

/// Length of the trailing keystroke window in seconds.
pub const KEYSTROKE_WINDOW_SECS: i64 = 60;

/// Reduces buffered events plus context and environment into one
/// [`FeatureRecord`] per cycle.
///
/// `aggregate` is infallible by contract: whatever happens underneath, the
/// caller gets a fixed-shape record (empty inputs produce all-zero stats).
/// Keystroke stats cover the trailing window non-destructively; pointer
/// counters are drained on every call.
pub struct Aggregator<W, E> {
    keys: KeyEventBuffer,
    pointer: PointerAccumulator,
    window_tracker: WindowTracker<W>,
    environment: EnvironmentMonitor<E>,
    keystroke_window: Duration,
}

impl<W: ActiveWindowSource, E: EnvironmentSource> Aggregator<W, E> {
    pub fn new(
        key_capacity: usize,
        rules: Vec<CategoryRule>,
        window_source: W,
        env_source: E,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            keys: KeyEventBuffer::new(key_capacity),
            pointer: PointerAccumulator::new(now),
            window_tracker: WindowTracker::new(window_source, rules),
            environment: EnvironmentMonitor::new(env_source),
            keystroke_window: Duration::seconds(KEYSTROKE_WINDOW_SECS),
        }
    }

    /// Route one queued input event into its buffer.
    pub fn record_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(e) => self.keys.record(e),
            InputEvent::Pointer(e) => self.pointer.record(e),
        }
    }

    /// Poll the active-window source. Called on a short cadence so window
    /// switches between aggregation cycles are observed.
    pub fn observe_context(&mut self) {
        self.window_tracker.observe();
    }

    /// Produce the feature record for the cycle ending at `now`.
    pub fn aggregate(&mut self, now: DateTime<Utc>) -> FeatureRecord {
        let key_events = self.keys.snapshot(now, self.keystroke_window);
        let keystroke = compute_keystroke_stats(&key_events);
        let pointer = compute_pointer_stats(self.pointer.drain(now));
        let window = self.window_tracker.drain_stats(now);
        let environment = self.environment.reading(now);

        FeatureRecord::assemble(now, keystroke, pointer, window, environment)
    }

    pub fn buffered_key_events(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{KeyEvent, PointerButton, PointerEvent};
    use crate::context::{default_rules, NoWindowSource};
    use crate::environment::NoSensor;
    use chrono::Duration;

    fn aggregator(now: DateTime<Utc>) -> Aggregator<NoWindowSource, NoSensor> {
        Aggregator::new(1000, default_rules(), NoWindowSource, NoSensor, now)
    }

    #[test]
    fn test_empty_aggregate_is_all_zero() {
        let now = Utc::now();
        let mut agg = aggregator(now);
        let record = agg.aggregate(now + Duration::seconds(60));

        assert_eq!(record.keystroke.typing_speed_kpm, 0);
        assert_eq!(record.pointer.distance_px, 0.0);
        assert_eq!(record.window_switch_count, 0);
        assert!(record.env_synthetic);
        assert!(!record.keystroke.avg_key_interval_ms.is_nan());
        assert!(!record.pointer.still_ratio.is_nan());
    }

    #[test]
    fn test_empty_aggregate_is_idempotent_in_shape() {
        let now = Utc::now();
        let mut agg = aggregator(now);
        let first = agg.aggregate(now + Duration::seconds(60));
        let second = agg.aggregate(now + Duration::seconds(120));

        assert_eq!(
            serde_json::to_value(&first.keystroke).unwrap(),
            serde_json::to_value(&second.keystroke).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&first.pointer).unwrap(),
            serde_json::to_value(&second.pointer).unwrap()
        );
    }

    #[test]
    fn test_keystrokes_trail_while_pointer_drains() {
        let now = Utc::now();
        let mut agg = aggregator(now);

        agg.record_event(InputEvent::Key(KeyEvent::press_at(
            now + Duration::seconds(1),
            false,
            false,
        )));
        agg.record_event(InputEvent::Pointer(PointerEvent::moved_at(
            now + Duration::seconds(1),
            0.0,
            0.0,
        )));
        agg.record_event(InputEvent::Pointer(PointerEvent::moved_at(
            now + Duration::seconds(2),
            100.0,
            0.0,
        )));
        agg.record_event(InputEvent::Pointer(PointerEvent::button_at(
            now + Duration::seconds(3),
            PointerButton::Left,
            true,
        )));

        let first = agg.aggregate(now + Duration::seconds(30));
        assert_eq!(first.keystroke.typing_speed_kpm, 1);
        assert!((first.pointer.distance_px - 100.0).abs() < 1e-9);
        assert_eq!(first.pointer.left_click_count, 1);

        // Same trailing window: the key press is still visible, the pointer
        // counters were drained.
        let second = agg.aggregate(now + Duration::seconds(31));
        assert_eq!(second.keystroke.typing_speed_kpm, 1);
        assert_eq!(second.pointer.distance_px, 0.0);
        assert_eq!(second.pointer.left_click_count, 0);
    }

    #[test]
    fn test_keystrokes_age_out_of_trailing_window() {
        let now = Utc::now();
        let mut agg = aggregator(now);
        agg.record_event(InputEvent::Key(KeyEvent::press_at(now, false, false)));

        let record = agg.aggregate(now + Duration::seconds(90));
        assert_eq!(record.keystroke.typing_speed_kpm, 0);
    }
}
