//! The control loop.
//!
//! Everything stateful runs on one thread: buffers, the aggregator, the
//! reaction-test session, and the SQLite connection. Listener threads and
//! the CLI only send messages. The loop sleeps in `recv_timeout` against
//! the earliest pending deadline, so timer work and message handling never
//! race each other.

use crate::collector::InputEvent;
use crate::config::Config;
use crate::context::ActiveWindowSource;
use crate::core::Aggregator;
use crate::environment::EnvironmentSource;
use crate::pvt::{random_position, PvtSession, SessionEffect, StimulusSurface};
use crate::storage::Storage;
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Messages accepted by the control loop.
#[derive(Debug)]
pub enum ControlMsg {
    /// Raw input event from a listener thread.
    Input(InputEvent),
    /// The operator's reaction to a stimulus.
    React,
    /// Tear down the active reaction-test session, if any.
    AbortSession,
    Shutdown,
}

/// Capacity of the queue feeding the control loop. With a full queue the
/// sending side drops events rather than blocking.
pub const CONTROL_QUEUE_CAPACITY: usize = 10_000;

/// Create the bounded queue connecting listeners and the CLI to the loop.
pub fn control_queue() -> (Sender<ControlMsg>, Receiver<ControlMsg>) {
    bounded(CONTROL_QUEUE_CAPACITY)
}

/// Upper bound on one sleep so the shutdown flag is always observed.
const MAX_POLL: Duration = Duration::from_millis(500);

pub struct Agent<W, E, S> {
    config: Config,
    aggregator: Aggregator<W, E>,
    storage: Storage,
    surface: S,
    transparency: SharedTransparencyLog,
    session: Option<PvtSession>,
    next_aggregate: Instant,
    next_context: Instant,
    /// Armed only while no session is running.
    next_session: Option<Instant>,
    rng: StdRng,
    run_id: Uuid,
}

impl<W, E, S> Agent<W, E, S>
where
    W: ActiveWindowSource,
    E: EnvironmentSource,
    S: StimulusSurface,
{
    pub fn new(
        config: Config,
        aggregator: Aggregator<W, E>,
        storage: Storage,
        surface: S,
        transparency: SharedTransparencyLog,
        now: Instant,
    ) -> Self {
        let run_id = Uuid::new_v4();
        info!("agent run {run_id} starting");

        Self {
            next_aggregate: now + Duration::from_secs(config.aggregate_period_secs),
            next_context: now + Duration::from_secs(config.context_poll_secs),
            next_session: Some(now + Duration::from_secs(config.pvt.session_interval_secs)),
            config,
            aggregator,
            storage,
            surface,
            transparency,
            session: None,
            rng: StdRng::from_entropy(),
            run_id,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Earliest pending deadline across all timers.
    fn next_deadline(&self) -> Instant {
        let mut deadline = self.next_aggregate.min(self.next_context);
        if let Some(at) = self.next_session {
            deadline = deadline.min(at);
        }
        if let Some(at) = self.session.as_ref().and_then(|s| s.next_deadline()) {
            deadline = deadline.min(at);
        }
        deadline
    }

    /// Start a reaction-test session now. No-op while one is running.
    pub fn start_session(&mut self, now: Instant) -> bool {
        if self.session.is_some() {
            warn!("session start requested while one is running, ignored");
            return false;
        }
        info!("starting reaction-test session");
        self.next_session = None;
        self.session = Some(PvtSession::start(
            self.config.pvt.clone(),
            &mut self.rng,
            now,
        ));
        true
    }

    fn abort_session(&mut self, now: Instant) {
        if self.session.take().is_some() {
            info!("session aborted");
            self.surface.clear();
            self.next_session =
                Some(now + Duration::from_secs(self.config.pvt.session_interval_secs));
        }
    }

    fn apply_effect(&mut self, effect: SessionEffect, now: Instant) {
        match effect {
            SessionEffect::Pending => {}
            SessionEffect::Present => {
                let screen = self.config.screen;
                let placement = random_position(
                    &mut self.rng,
                    screen.width,
                    screen.height,
                    screen.stimulus_size,
                    screen.margin,
                );
                self.surface.present(placement);
            }
            SessionEffect::Clear => self.surface.clear(),
            SessionEffect::Finished(result) => {
                self.surface.clear();
                self.session = None;
                self.next_session =
                    Some(now + Duration::from_secs(self.config.pvt.session_interval_secs));

                if let Some(result) = result {
                    info!(
                        "session complete: mean rt {:.1} ms, score {:.2}, {}",
                        result.reaction_time_ms, result.focus_score, result.alertness_level
                    );
                    match self.storage.insert_pvt_result(&result) {
                        Ok(_) => {
                            self.transparency.record_pvt_session();
                            match self.storage.backfill_latest_feature_label(result.focus_score) {
                                Ok(true) => {}
                                Ok(false) => warn!("no feature record to label yet"),
                                Err(e) => error!("label backfill failed: {e}"),
                            }
                        }
                        Err(e) => error!("failed to persist session result: {e}"),
                    }
                }
            }
        }
    }

    /// Handle one message. Returns false when the loop should exit.
    pub fn on_message(&mut self, msg: ControlMsg, now: Instant, wall: DateTime<Utc>) -> bool {
        match msg {
            ControlMsg::Input(event) => {
                match &event {
                    InputEvent::Key(_) => {
                        if !self.config.sources.capture_keyboard {
                            return true;
                        }
                        self.transparency.record_key_event();
                    }
                    InputEvent::Pointer(_) => {
                        if !self.config.sources.capture_pointer {
                            return true;
                        }
                        self.transparency.record_pointer_event();
                    }
                }
                self.aggregator.record_event(event);
            }
            ControlMsg::React => {
                if let Some(session) = self.session.as_mut() {
                    let effect = session.on_react(&mut self.rng, now, wall);
                    self.apply_effect(effect, now);
                }
            }
            ControlMsg::AbortSession => self.abort_session(now),
            ControlMsg::Shutdown => return false,
        }
        true
    }

    /// Fire every timer whose deadline has passed.
    pub fn on_tick(&mut self, now: Instant, wall: DateTime<Utc>) {
        if now >= self.next_context {
            self.aggregator.observe_context();
            self.next_context = now + Duration::from_secs(self.config.context_poll_secs);
        }

        if now >= self.next_aggregate {
            let record = self.aggregator.aggregate(wall);
            match self.storage.insert_feature_record(&record) {
                Ok(_) => self.transparency.record_feature_record(),
                Err(e) => error!("failed to persist feature record: {e}"),
            }
            self.next_aggregate = now + Duration::from_secs(self.config.aggregate_period_secs);
        }

        if let Some(at) = self.next_session {
            if now >= at {
                self.start_session(now);
            }
        }

        if let Some(session) = self.session.as_mut() {
            if let Some(at) = session.next_deadline() {
                if now >= at {
                    let effect = session.on_deadline(&mut self.rng, now, wall);
                    self.apply_effect(effect, now);
                }
            }
        }
    }

    /// Run until shutdown. `running` is cleared by the signal handler.
    pub fn run(&mut self, rx: Receiver<ControlMsg>, running: Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            let now = Instant::now();
            let timeout = self
                .next_deadline()
                .saturating_duration_since(now)
                .min(MAX_POLL);

            match rx.recv_timeout(timeout) {
                Ok(msg) => {
                    if !self.on_message(msg, Instant::now(), Utc::now()) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("all message senders dropped, shutting down");
                    break;
                }
            }

            self.on_tick(Instant::now(), Utc::now());
        }

        if let Err(e) = self.transparency.save() {
            error!("failed to save transparency stats: {e}");
        }
        info!("agent run {} stopped", self.run_id);
    }
}
