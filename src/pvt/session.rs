//! Reaction-test session state machine.
//!
//! One session runs `trials_per_session` trials. Each trial waits a random
//! interval, presents a stimulus, and captures the reaction latency (or a
//! timeout sentinel). The machine is driven by the control loop through two
//! entry points: `on_deadline` when the session's current timer expires and
//! `on_react` when the operator's react input arrives. It never blocks and
//! never sleeps; it only reports the next deadline to wait for.

use crate::pvt::scoring::{AlertnessLevel, ScoringPolicy};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Session and trial timing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PvtConfig {
    /// Seconds between session starts.
    pub session_interval_secs: u64,
    pub trials_per_session: u32,
    /// Random pre-stimulus wait is drawn uniformly from this range.
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    /// Per-trial capture bound. `None` waits indefinitely for a reaction.
    pub trial_timeout_ms: Option<u64>,
    /// Reactions faster than this are false starts, not captures.
    pub min_reaction_ms: f64,
    pub scoring: ScoringPolicy,
}

impl Default for PvtConfig {
    fn default() -> Self {
        Self {
            session_interval_secs: 300,
            trials_per_session: 3,
            min_wait_ms: 2000,
            max_wait_ms: 5000,
            trial_timeout_ms: Some(10_000),
            min_reaction_ms: 100.0,
            scoring: ScoringPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PvtConfigError {
    #[error("trials_per_session must be at least 1")]
    NoTrials,
    #[error("wait range is inverted: min {0} ms > max {1} ms")]
    InvertedWaitRange(u64, u64),
    #[error("trial timeout {0} ms does not exceed min_reaction {1} ms")]
    TimeoutTooShort(u64, f64),
    #[error(transparent)]
    Scoring(#[from] crate::pvt::scoring::ScoringConfigError),
}

impl PvtConfig {
    pub fn validate(&self) -> Result<(), PvtConfigError> {
        if self.trials_per_session == 0 {
            return Err(PvtConfigError::NoTrials);
        }
        if self.min_wait_ms > self.max_wait_ms {
            return Err(PvtConfigError::InvertedWaitRange(
                self.min_wait_ms,
                self.max_wait_ms,
            ));
        }
        if let Some(timeout) = self.trial_timeout_ms {
            if (timeout as f64) <= self.min_reaction_ms {
                return Err(PvtConfigError::TimeoutTooShort(
                    timeout,
                    self.min_reaction_ms,
                ));
            }
        }
        self.scoring.validate()?;
        Ok(())
    }
}

/// One persisted session outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvtResult {
    pub timestamp: DateTime<Utc>,
    /// Wall time of the session's last stimulus.
    pub stimulus_time: DateTime<Utc>,
    /// Mean latency over the session's trials, timeouts included.
    pub reaction_time_ms: f64,
    pub focus_score: f64,
    pub alertness_level: AlertnessLevel,
    pub is_lapse: bool,
    pub false_start: bool,
}

/// What the control loop should do after feeding the machine an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Nothing visible changed; keep waiting on `next_deadline`.
    Pending,
    /// Present the stimulus now.
    Present,
    /// Hide the stimulus; the next trial's wait has started.
    Clear,
    /// Session over. `None` means no valid trial was captured and the
    /// session is discarded.
    Finished(Option<PvtResult>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrialPhase {
    /// Pre-stimulus random wait.
    Waiting,
    /// Stimulus visible, capture window open.
    Armed,
}

/// An in-progress session. Dropped on abort; no terminal cleanup needed.
pub struct PvtSession {
    config: PvtConfig,
    phase: TrialPhase,
    trial_index: u32,
    latencies: Vec<f64>,
    valid_trials: u32,
    timed_out_trials: u32,
    false_starts: u32,
    deadline: Option<Instant>,
    armed_at: Option<Instant>,
    last_stimulus_wall: Option<DateTime<Utc>>,
}

impl PvtSession {
    /// Start a session: draws the first trial's wait and arms its deadline.
    pub fn start<R: Rng>(config: PvtConfig, rng: &mut R, now: Instant) -> Self {
        let mut session = Self {
            config,
            phase: TrialPhase::Waiting,
            trial_index: 0,
            latencies: Vec::new(),
            valid_trials: 0,
            timed_out_trials: 0,
            false_starts: 0,
            deadline: None,
            armed_at: None,
            last_stimulus_wall: None,
        };
        session.schedule_wait(rng, now);
        session
    }

    /// Deadline the control loop should wake at, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn schedule_wait<R: Rng>(&mut self, rng: &mut R, now: Instant) {
        let wait_ms = rng.gen_range(self.config.min_wait_ms..=self.config.max_wait_ms);
        debug!(
            "trial {}/{}: waiting {wait_ms} ms before stimulus",
            self.trial_index + 1,
            self.config.trials_per_session
        );
        self.phase = TrialPhase::Waiting;
        self.armed_at = None;
        self.deadline = Some(now + Duration::from_millis(wait_ms));
    }

    /// The session's current timer expired.
    pub fn on_deadline<R: Rng>(
        &mut self,
        rng: &mut R,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> SessionEffect {
        match self.phase {
            TrialPhase::Waiting => {
                self.phase = TrialPhase::Armed;
                self.armed_at = Some(now);
                self.last_stimulus_wall = Some(wall);
                self.deadline = self
                    .config
                    .trial_timeout_ms
                    .map(|ms| now + Duration::from_millis(ms));
                SessionEffect::Present
            }
            TrialPhase::Armed => {
                // Timeout: the bound itself stands in for the latency.
                let timeout_ms = match self.config.trial_timeout_ms {
                    Some(ms) => ms as f64,
                    None => return SessionEffect::Pending,
                };
                warn!(
                    "trial {} timed out after {timeout_ms} ms",
                    self.trial_index + 1
                );
                self.latencies.push(timeout_ms);
                self.timed_out_trials += 1;
                self.advance(rng, now, wall)
            }
        }
    }

    /// The operator's react input arrived. Ignored unless a stimulus is up.
    pub fn on_react<R: Rng>(
        &mut self,
        rng: &mut R,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> SessionEffect {
        let armed_at = match (self.phase, self.armed_at) {
            (TrialPhase::Armed, Some(at)) => at,
            _ => {
                debug!("react input outside capture window, ignored");
                return SessionEffect::Pending;
            }
        };

        let rt_ms = now.duration_since(armed_at).as_secs_f64() * 1000.0;
        if rt_ms < self.config.min_reaction_ms {
            // Too fast to be a reaction. The trial stays armed and keeps
            // waiting for a legitimate response.
            self.false_starts += 1;
            debug!("false start at {rt_ms:.1} ms, trial re-armed");
            return SessionEffect::Pending;
        }

        info!(
            "trial {}/{}: reaction {rt_ms:.1} ms",
            self.trial_index + 1,
            self.config.trials_per_session
        );
        self.latencies.push(rt_ms);
        self.valid_trials += 1;
        self.advance(rng, now, wall)
    }

    fn advance<R: Rng>(
        &mut self,
        rng: &mut R,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> SessionEffect {
        self.trial_index += 1;
        if self.trial_index >= self.config.trials_per_session {
            self.deadline = None;
            return SessionEffect::Finished(self.score(wall));
        }
        self.schedule_wait(rng, now);
        SessionEffect::Clear
    }

    /// Fold the session's latencies into one result. A session with no
    /// captured reaction at all is discarded.
    fn score(&self, wall: DateTime<Utc>) -> Option<PvtResult> {
        if self.valid_trials == 0 {
            warn!("session captured no reactions, discarding");
            return None;
        }

        let mean_rt =
            self.latencies.iter().sum::<f64>() / self.latencies.len() as f64;
        let policy = &self.config.scoring;

        Some(PvtResult {
            timestamp: wall,
            stimulus_time: self.last_stimulus_wall.unwrap_or(wall),
            reaction_time_ms: mean_rt,
            focus_score: policy.focus_score(mean_rt),
            alertness_level: policy.alertness_level(mean_rt),
            is_lapse: policy.is_lapse(mean_rt, self.timed_out_trials > 0),
            false_start: self.false_starts > 0,
        })
    }
}
