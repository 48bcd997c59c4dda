//! Zone Key - Privacy-first focus-state data collection.
//!
//! This library captures behavioral timing signals (keystroke cadence,
//! pointer activity, work context, ambient environment) and labels them with
//! ground-truth alertness from periodic reaction tests, producing a training
//! set for personal focus-state models.
//!
//! # Privacy Guarantees
//!
//! - **No key symbols**: We never capture which keys are pressed, only timing
//!   (plus backspace/modifier flags)
//! - **No window titles**: Active windows are stored as truncated hashes and
//!   coarse categories only
//! - **No raw storage**: Raw events are reduced to statistics every cycle
//! - **Transparency**: All collection is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Zone Key Agent                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ Listeners │──▶│  Aggregator  │──▶│FeatureRecord │──▶ DB   │
//! │  │ (queue)   │   │ (60s window) │   │              │         │
//! │  └───────────┘   └──────────────┘   └──────────────┘         │
//! │                                            ▲ label           │
//! │  ┌───────────┐   ┌──────────────┐   ┌──────┴───────┐         │
//! │  │ Scheduler │──▶│ PVT Session  │──▶│  PvtResult   │──▶ DB   │
//! │  │ (300s)    │   │ (3 trials)   │   │              │         │
//! │  └───────────┘   └──────────────┘   └──────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use zonekey::agent::{control_queue, Agent, ControlMsg};
//! use zonekey::config::Config;
//! use zonekey::context::NoWindowSource;
//! use zonekey::core::Aggregator;
//! use zonekey::environment::NoSensor;
//! use zonekey::pvt::NoopSurface;
//! use zonekey::storage::Storage;
//! use zonekey::transparency::create_shared_log;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let config = Config::default();
//! let aggregator = Aggregator::new(
//!     config.key_buffer_capacity,
//!     config.categories.clone(),
//!     NoWindowSource,
//!     NoSensor,
//!     chrono::Utc::now(),
//! );
//! let storage = Storage::open_in_memory().unwrap();
//! let mut agent = Agent::new(
//!     config,
//!     aggregator,
//!     storage,
//!     NoopSurface,
//!     create_shared_log(),
//!     Instant::now(),
//! );
//!
//! let (tx, rx) = control_queue();
//! let running = Arc::new(AtomicBool::new(true));
//! // Listener threads clone `tx` and send ControlMsg::Input events.
//! tx.send(ControlMsg::Shutdown).unwrap();
//! agent.run(rx, running);
//! ```

pub mod agent;
pub mod collector;
pub mod config;
pub mod context;
pub mod core;
pub mod environment;
pub mod pvt;
pub mod storage;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use agent::{control_queue, Agent, ControlMsg};
pub use collector::{InputEvent, KeyEvent, ListenerConfig, PointerEvent};
pub use config::{Config, ScreenConfig};
pub use core::{Aggregator, FeatureRecord, KeystrokeStats, PointerStats};
pub use pvt::{AlertnessLevel, PvtConfig, PvtResult, PvtSession, ScoringPolicy};
pub use storage::{Storage, StorageError};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║               ZONE KEY AGENT - PRIVACY DECLARATION               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent captures behavioral timing data to train a           ║
║  personal focus-state model.                                     ║
║                                                                  ║
║  ✓ WHAT WE CAPTURE:                                              ║
║    • When keys are pressed (timing only)                         ║
║    • How far and fast the pointer moves (magnitude only)         ║
║    • A hash and coarse category of the active window             ║
║    • Room temperature, humidity, and pressure (if sensed)        ║
║    • Your reaction time in short scheduled tests                 ║
║                                                                  ║
║  ✗ WHAT WE NEVER CAPTURE:                                        ║
║    • Which keys you press (no passwords, messages, etc.)         ║
║    • Window titles or any screen content                         ║
║    • Absolute cursor positions                                   ║
║                                                                  ║
║  All data is processed and stored locally. Raw events are        ║
║  discarded after feature extraction (every 60 seconds).          ║
║                                                                  ║
║  You can view collection statistics anytime with:                ║
║    zonekey status                                                ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_declaration_contents() {
        assert!(PRIVACY_DECLARATION.contains("PRIVACY"));
        assert!(PRIVACY_DECLARATION.contains("NEVER CAPTURE"));
        assert!(PRIVACY_DECLARATION.contains("keys you press"));
    }
}
