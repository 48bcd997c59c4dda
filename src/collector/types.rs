//! Privacy-preserving event types for the Zone Key agent.
//!
//! These types capture ONLY timing and classification flags - never key
//! content. Pointer coordinates are consumed by the accumulator and are not
//! retained beyond the previous sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Press or release of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventKind {
    Press,
    Release,
}

/// A keyboard event capturing timing and coarse classification.
///
/// Privacy guarantee: no key codes, characters, or any content is captured.
/// The only per-key information retained is whether the key was a
/// backspace/delete (mistype counting) or a modifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Press or release
    pub kind: KeyEventKind,
    /// Whether the key was backspace or delete
    pub is_backspace: bool,
    /// Whether the key was a modifier (shift, ctrl, alt, cmd)
    pub is_modifier: bool,
}

impl KeyEvent {
    pub fn press(is_backspace: bool, is_modifier: bool) -> Self {
        Self::press_at(Utc::now(), is_backspace, is_modifier)
    }

    pub fn press_at(timestamp: DateTime<Utc>, is_backspace: bool, is_modifier: bool) -> Self {
        Self {
            timestamp,
            kind: KeyEventKind::Press,
            is_backspace,
            is_modifier,
        }
    }

    pub fn release() -> Self {
        Self::release_at(Utc::now())
    }

    pub fn release_at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind: KeyEventKind::Release,
            is_backspace: false,
            is_modifier: false,
        }
    }

    pub fn is_press(&self) -> bool {
        self.kind == KeyEventKind::Press
    }
}

/// Pointer button classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Left,
    Right,
    Other,
}

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEventKind {
    /// Cursor moved to an absolute position (screen pixels).
    Moved { x: f64, y: f64 },
    /// A button changed state.
    Button { button: PointerButton, pressed: bool },
}

/// A pointer event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    pub kind: PointerEventKind,
}

impl PointerEvent {
    pub fn moved(x: f64, y: f64) -> Self {
        Self::moved_at(Utc::now(), x, y)
    }

    pub fn moved_at(timestamp: DateTime<Utc>, x: f64, y: f64) -> Self {
        Self {
            timestamp,
            kind: PointerEventKind::Moved { x, y },
        }
    }

    pub fn button(button: PointerButton, pressed: bool) -> Self {
        Self::button_at(Utc::now(), button, pressed)
    }

    pub fn button_at(timestamp: DateTime<Utc>, button: PointerButton, pressed: bool) -> Self {
        Self {
            timestamp,
            kind: PointerEventKind::Button { button, pressed },
        }
    }
}

/// Unified event type delivered by input listeners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum InputEvent {
    Key(KeyEvent),
    Pointer(PointerEvent),
}

impl InputEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            InputEvent::Key(e) => e.timestamp,
            InputEvent::Pointer(e) => e.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_event_flags() {
        let event = KeyEvent::press(true, false);
        assert!(event.is_press());
        assert!(event.is_backspace);
        assert!(!event.is_modifier);
    }

    #[test]
    fn test_release_carries_no_flags() {
        let event = KeyEvent::release();
        assert!(!event.is_press());
        assert!(!event.is_backspace);
    }
}
