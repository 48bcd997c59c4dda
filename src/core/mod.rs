//! Core aggregation pipeline.
//!
//! This module contains:
//! - Feature computation from event snapshots
//! - The windowed aggregator that produces one record per cycle

pub mod aggregator;
pub mod features;

// Re-export commonly used types
pub use aggregator::{Aggregator, KEYSTROKE_WINDOW_SECS};
pub use features::{
    compute_keystroke_stats, compute_pointer_stats, FeatureRecord, KeystrokeStats, PointerStats,
};
