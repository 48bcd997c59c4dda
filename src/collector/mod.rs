//! Event ingestion for the Zone Key agent.
//!
//! OS-level keyboard/mouse hooks live outside this crate. A listener is any
//! producer thread holding the control-queue sender; events arrive at the
//! control loop as queued messages, so the loop owns the buffers without
//! locking.

pub mod buffer;
pub mod types;

use serde::{Deserialize, Serialize};

pub use buffer::{KeyEventBuffer, PointerAccumulator, PointerDrain, DEFAULT_KEY_CAPACITY};
pub use types::{
    InputEvent, KeyEvent, KeyEventKind, PointerButton, PointerEvent, PointerEventKind,
};

/// Configuration for which input sources a listener should capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub capture_keyboard: bool,
    pub capture_pointer: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_pointer: true,
        }
    }
}
