//! Psychomotor vigilance testing: session state machine, latency scoring,
//! and stimulus presentation.

pub mod scoring;
pub mod session;
pub mod stimulus;

pub use scoring::{AlertnessLevel, ScoringBand, ScoringPolicy};
pub use session::{PvtConfig, PvtResult, PvtSession, SessionEffect};
pub use stimulus::{random_position, ConsoleSurface, NoopSurface, StimulusPlacement, StimulusSurface};
