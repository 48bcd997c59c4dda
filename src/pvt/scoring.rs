//! Reaction-time scoring policy.
//!
//! All thresholds and band boundaries are configuration, not constants: the
//! score curve and the alertness ladder were retuned several times during
//! data collection and are expected to keep moving. Score and alertness
//! share one set of band boundaries so the two labels never disagree about
//! where a band starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordinal alertness label derived from mean reaction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertnessLevel {
    VeryHigh,
    High,
    Normal,
    Low,
    VeryLow,
}

impl AlertnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertnessLevel::VeryHigh => "very_high",
            AlertnessLevel::High => "high",
            AlertnessLevel::Normal => "normal",
            AlertnessLevel::Low => "low",
            AlertnessLevel::VeryLow => "very_low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "very_high" => Some(AlertnessLevel::VeryHigh),
            "high" => Some(AlertnessLevel::High),
            "normal" => Some(AlertnessLevel::Normal),
            "low" => Some(AlertnessLevel::Low),
            "very_low" => Some(AlertnessLevel::VeryLow),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertnessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scoring band: reaction times up to `upper_ms` map to `level`, and the
/// score interpolates linearly down to `floor` at the band's upper edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringBand {
    pub upper_ms: f64,
    pub floor: f64,
    pub level: AlertnessLevel,
}

/// Piecewise-linear focus-score curve plus the parallel alertness ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Reactions faster than this are anticipatory, not fast.
    pub anticipatory_floor_ms: f64,
    /// Fixed mid-range score assigned to anticipatory reactions.
    pub anticipatory_score: f64,
    /// Reactions at or below this score 1.0 and take the top band's level.
    pub full_score_below_ms: f64,
    /// Bands ordered by increasing `upper_ms`, floors non-increasing.
    pub bands: Vec<ScoringBand>,
    /// Mean reaction time at or above this marks the session a lapse.
    pub lapse_threshold_ms: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            anticipatory_floor_ms: 100.0,
            anticipatory_score: 0.5,
            full_score_below_ms: 400.0,
            bands: vec![
                ScoringBand {
                    upper_ms: 1000.0,
                    floor: 0.9,
                    level: AlertnessLevel::VeryHigh,
                },
                ScoringBand {
                    upper_ms: 2500.0,
                    floor: 0.65,
                    level: AlertnessLevel::High,
                },
                ScoringBand {
                    upper_ms: 4500.0,
                    floor: 0.35,
                    level: AlertnessLevel::Normal,
                },
                ScoringBand {
                    upper_ms: 7000.0,
                    floor: 0.0,
                    level: AlertnessLevel::Low,
                },
            ],
            lapse_threshold_ms: 4500.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringConfigError {
    #[error("scoring policy needs at least one band")]
    NoBands,
    #[error("band boundaries must increase: {0} ms is not above {1} ms")]
    UnsortedBands(f64, f64),
    #[error("band floors must be non-increasing (got {0} after {1})")]
    NonMonotonicFloors(f64, f64),
    #[error("score {0} is outside [0, 1]")]
    ScoreOutOfRange(f64),
}

impl ScoringPolicy {
    /// Reject configurations that would break score monotonicity.
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        if self.bands.is_empty() {
            return Err(ScoringConfigError::NoBands);
        }
        if !(0.0..=1.0).contains(&self.anticipatory_score) {
            return Err(ScoringConfigError::ScoreOutOfRange(self.anticipatory_score));
        }

        let mut prev_upper = self.full_score_below_ms;
        let mut prev_floor = 1.0;
        for band in &self.bands {
            if band.upper_ms <= prev_upper {
                return Err(ScoringConfigError::UnsortedBands(band.upper_ms, prev_upper));
            }
            if !(0.0..=1.0).contains(&band.floor) {
                return Err(ScoringConfigError::ScoreOutOfRange(band.floor));
            }
            if band.floor > prev_floor {
                return Err(ScoringConfigError::NonMonotonicFloors(
                    band.floor, prev_floor,
                ));
            }
            prev_upper = band.upper_ms;
            prev_floor = band.floor;
        }
        Ok(())
    }

    /// Focus score in [0, 1]. Non-increasing in `rt_ms` past the
    /// anticipatory floor.
    pub fn focus_score(&self, rt_ms: f64) -> f64 {
        if rt_ms < self.anticipatory_floor_ms {
            return self.anticipatory_score;
        }
        if rt_ms <= self.full_score_below_ms {
            return 1.0;
        }

        let mut lower_ms = self.full_score_below_ms;
        let mut lower_score = 1.0;
        for band in &self.bands {
            if rt_ms <= band.upper_ms {
                let span = band.upper_ms - lower_ms;
                let t = if span > 0.0 { (rt_ms - lower_ms) / span } else { 1.0 };
                let score = lower_score + t * (band.floor - lower_score);
                return score.clamp(0.0, 1.0);
            }
            lower_ms = band.upper_ms;
            lower_score = band.floor;
        }

        0.0
    }

    /// Alertness label over the same band boundaries as the score.
    pub fn alertness_level(&self, rt_ms: f64) -> AlertnessLevel {
        for band in &self.bands {
            if rt_ms < band.upper_ms {
                return band.level;
            }
        }
        AlertnessLevel::VeryLow
    }

    pub fn is_lapse(&self, rt_ms: f64, timed_out: bool) -> bool {
        timed_out || rt_ms >= self.lapse_threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        ScoringPolicy::default().validate().unwrap();
    }

    #[test]
    fn test_excellent_band_saturates() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.focus_score(300.0), 1.0);
        assert_eq!(policy.alertness_level(300.0), AlertnessLevel::VeryHigh);
    }

    #[test]
    fn test_ceiling_floors_at_zero_and_lapses() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.focus_score(8000.0), 0.0);
        assert_eq!(policy.alertness_level(8000.0), AlertnessLevel::VeryLow);
        assert!(policy.is_lapse(8000.0, false));
    }

    #[test]
    fn test_anticipatory_penalty_not_reward() {
        let policy = ScoringPolicy::default();
        let score = policy.focus_score(50.0);
        assert_eq!(score, 0.5);
        // Anticipation must not beat a genuine fast reaction.
        assert!(score < policy.focus_score(350.0));
    }

    #[test]
    fn test_score_in_range_and_non_increasing() {
        let policy = ScoringPolicy::default();
        let mut prev = f64::INFINITY;
        let mut rt = policy.anticipatory_floor_ms;
        while rt < 10_000.0 {
            let score = policy.focus_score(rt);
            assert!((0.0..=1.0).contains(&score), "score out of range at {rt}");
            assert!(score <= prev + 1e-12, "score increased at {rt}");
            prev = score;
            rt += 7.0;
        }
    }

    #[test]
    fn test_band_interpolation_midpoint() {
        let policy = ScoringPolicy::default();
        // Midway between 400 ms (1.0) and 1000 ms (0.9).
        let score = policy.focus_score(700.0);
        assert!((score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_lapse_threshold_is_configuration() {
        let mut policy = ScoringPolicy::default();
        policy.lapse_threshold_ms = 1000.0;
        assert!(policy.is_lapse(1200.0, false));
        assert!(!policy.is_lapse(800.0, false));
        assert!(policy.is_lapse(100.0, true));
    }

    #[test]
    fn test_validate_rejects_rising_floor() {
        let mut policy = ScoringPolicy::default();
        policy.bands[1].floor = 0.95;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsorted_uppers() {
        let mut policy = ScoringPolicy::default();
        policy.bands[1].upper_ms = 500.0;
        assert!(policy.validate().is_err());
    }
}
