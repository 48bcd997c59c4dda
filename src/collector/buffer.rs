//! Event buffers owned by the control loop.
//!
//! Keystroke events are kept in a bounded ring and read non-destructively as
//! a trailing window. Pointer motion and clicks are folded into an owned
//! accumulator that is drained (reset to zero) on every read. The asymmetry
//! between the two is intentional and load-bearing: keystroke statistics are
//! re-computable over any trailing window, pointer statistics are
//! since-last-read counters.

use crate::collector::types::{KeyEvent, PointerButton, PointerEvent, PointerEventKind};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Default ring capacity for keystroke events.
pub const DEFAULT_KEY_CAPACITY: usize = 1000;

/// Movement below this magnitude (pixels) does not count as activity.
const MOVE_THRESHOLD_PX: f64 = 5.0;

/// A motion gap longer than this counts toward still time.
const STILL_GAP_SECS: f64 = 1.0;

/// Bounded ring buffer of keystroke events, oldest evicted first.
#[derive(Debug)]
pub struct KeyEventBuffer {
    events: VecDeque<KeyEvent>,
    capacity: usize,
}

impl KeyEventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, event: KeyEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Snapshot of events within the trailing window ending at `now`.
    ///
    /// Non-destructive: the buffer is unchanged by reads.
    pub fn snapshot(&self, now: DateTime<Utc>, window: Duration) -> Vec<KeyEvent> {
        let cutoff = now - window;
        self.events
            .iter()
            .filter(|e| e.timestamp >= cutoff && e.timestamp <= now)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for KeyEventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_CAPACITY)
    }
}

/// Raw counters produced by draining a [`PointerAccumulator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerDrain {
    pub distance_px: f64,
    pub left_clicks: u32,
    pub right_clicks: u32,
    pub other_clicks: u32,
    pub still_secs: f64,
    pub elapsed_secs: f64,
}

/// Accumulates pointer motion and clicks between reads.
///
/// Reads are destructive: `drain` returns the counters accumulated since the
/// previous drain and resets them. The previous cursor position and motion
/// timestamp survive a drain so distance and stillness stay continuous
/// across cycles.
#[derive(Debug)]
pub struct PointerAccumulator {
    last_position: Option<(f64, f64)>,
    total_distance: f64,
    left_clicks: u32,
    right_clicks: u32,
    other_clicks: u32,
    still_secs: f64,
    last_move_time: DateTime<Utc>,
    last_drain: DateTime<Utc>,
}

impl PointerAccumulator {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_position: None,
            total_distance: 0.0,
            left_clicks: 0,
            right_clicks: 0,
            other_clicks: 0,
            still_secs: 0.0,
            last_move_time: now,
            last_drain: now,
        }
    }

    pub fn record(&mut self, event: PointerEvent) {
        match event.kind {
            PointerEventKind::Moved { x, y } => self.on_move(x, y, event.timestamp),
            PointerEventKind::Button { button, pressed } => {
                if pressed {
                    self.on_click(button);
                }
            }
        }
    }

    fn on_move(&mut self, x: f64, y: f64, timestamp: DateTime<Utc>) {
        if let Some((px, py)) = self.last_position {
            let distance = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
            self.total_distance += distance;

            if distance > MOVE_THRESHOLD_PX {
                let gap = seconds_between(self.last_move_time, timestamp);
                if gap > STILL_GAP_SECS {
                    self.still_secs += gap;
                }
                self.last_move_time = timestamp;
            }
        } else {
            self.last_move_time = timestamp;
        }
        self.last_position = Some((x, y));
    }

    fn on_click(&mut self, button: PointerButton) {
        match button {
            PointerButton::Left => self.left_clicks += 1,
            PointerButton::Right => self.right_clicks += 1,
            PointerButton::Other => self.other_clicks += 1,
        }
    }

    /// Take the accumulated counters and reset them.
    pub fn drain(&mut self, now: DateTime<Utc>) -> PointerDrain {
        let mut still = self.still_secs;

        // Close out a still period that is ongoing at drain time.
        let trailing = seconds_between(self.last_move_time, now);
        if trailing > STILL_GAP_SECS {
            still += trailing;
            self.last_move_time = now;
        }

        let drained = PointerDrain {
            distance_px: self.total_distance,
            left_clicks: self.left_clicks,
            right_clicks: self.right_clicks,
            other_clicks: self.other_clicks,
            still_secs: still,
            elapsed_secs: seconds_between(self.last_drain, now).max(0.0),
        };

        self.total_distance = 0.0;
        self.left_clicks = 0;
        self.right_clicks = 0;
        self.other_clicks = 0;
        self.still_secs = 0.0;
        self.last_drain = now;

        drained
    }
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ring_evicts_oldest() {
        let now = Utc::now();
        let mut buffer = KeyEventBuffer::new(3);
        for i in 0..5 {
            buffer.record(KeyEvent::press_at(
                now + Duration::milliseconds(i * 10),
                false,
                false,
            ));
        }
        assert_eq!(buffer.len(), 3);
        let events = buffer.snapshot(now + Duration::seconds(1), Duration::seconds(60));
        assert_eq!(events[0].timestamp, now + Duration::milliseconds(20));
    }

    #[test]
    fn test_snapshot_filters_trailing_window() {
        let now = Utc::now();
        let mut buffer = KeyEventBuffer::default();
        buffer.record(KeyEvent::press_at(now - Duration::seconds(120), false, false));
        buffer.record(KeyEvent::press_at(now - Duration::seconds(30), false, false));

        let events = buffer.snapshot(now, Duration::seconds(60));
        assert_eq!(events.len(), 1);

        // Reads are non-destructive.
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_accumulator_distance_and_clicks() {
        let now = Utc::now();
        let mut acc = PointerAccumulator::new(now);
        acc.record(PointerEvent::moved_at(now, 0.0, 0.0));
        acc.record(PointerEvent::moved_at(
            now + Duration::milliseconds(100),
            30.0,
            40.0,
        ));
        acc.record(PointerEvent::button_at(
            now + Duration::milliseconds(200),
            PointerButton::Left,
            true,
        ));
        // Release must not count as a click.
        acc.record(PointerEvent::button_at(
            now + Duration::milliseconds(250),
            PointerButton::Left,
            false,
        ));

        let drained = acc.drain(now + Duration::seconds(1));
        assert!((drained.distance_px - 50.0).abs() < 1e-9);
        assert_eq!(drained.left_clicks, 1);
        assert_eq!(drained.right_clicks, 0);
    }

    #[test]
    fn test_drain_resets_counters() {
        let now = Utc::now();
        let mut acc = PointerAccumulator::new(now);
        acc.record(PointerEvent::moved_at(now, 0.0, 0.0));
        acc.record(PointerEvent::moved_at(now + Duration::milliseconds(50), 100.0, 0.0));

        let first = acc.drain(now + Duration::milliseconds(100));
        assert!(first.distance_px > 0.0);

        let second = acc.drain(now + Duration::milliseconds(200));
        assert_eq!(second.distance_px, 0.0);
        assert_eq!(second.left_clicks, 0);
    }

    #[test]
    fn test_still_time_counted_for_long_gaps() {
        let now = Utc::now();
        let mut acc = PointerAccumulator::new(now);
        acc.record(PointerEvent::moved_at(now, 0.0, 0.0));
        // 5 seconds of no motion, then a real move.
        acc.record(PointerEvent::moved_at(now + Duration::seconds(5), 50.0, 0.0));

        let drained = acc.drain(now + Duration::milliseconds(5100));
        assert!(drained.still_secs >= 5.0);
    }
}
