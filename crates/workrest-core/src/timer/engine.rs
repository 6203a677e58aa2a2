//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - something must call `tick()` periodically while
//! `is_polling()` is true (see [`PollLoop`](super::PollLoop)).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Work -> Rest -> Work -> ... -> Done
//!          |  ^
//!          v  |  (expiry sets awaiting_action; continue / advance / snooze resolve it)
//! ```
//!
//! Getters never read the clock. Only `tick()` and state-changing commands
//! sample it into `now_ts`, so every derived value agrees within one tick.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Cfg::default());
//! engine.start();
//! // In a loop:
//! engine.tick(); // Returns Some(Event::PhaseExpired) when the phase runs out
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::{Cfg, CfgPatch, Phase};
use crate::error::ValidationError;
use crate::events::Event;
use crate::notify::{Notifications, Notifier, Permission};
use crate::storage::{CfgStore, MemoryCfgStore};

/// Everything the engine knows about the session, minus its collaborators.
///
/// Serializable so a short-lived process can persist it between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub phase: Phase,
    /// Completed work/rest cycles. Informational only.
    #[serde(default)]
    pub cycle_index: u32,
    /// Deadline of the current phase (epoch ms). Meaningless while paused.
    #[serde(default)]
    pub target_ts: u64,
    /// Nominal length of the current phase; snooze only grows it.
    #[serde(default)]
    pub phase_duration_ms: u64,
    /// Committed work time, excluding the phase in progress.
    #[serde(default)]
    pub worked_ms: u64,
    #[serde(default)]
    pub awaiting_action: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub paused_remaining_ms: u64,
    /// Last clock sample.
    #[serde(default)]
    pub now_ts: u64,
    #[serde(default)]
    pub poll_active: bool,
}

impl EngineState {
    /// Repair flag combinations that can't occur through the engine's own
    /// transitions (hand-edited or stale persisted state).
    fn sanitized(mut self, total_work_ms: u64) -> Self {
        if !self.phase.is_running() {
            self.awaiting_action = false;
            self.is_paused = false;
            self.paused_remaining_ms = 0;
            self.poll_active = false;
        }
        if self.is_paused && self.awaiting_action {
            self.awaiting_action = false;
        }
        if self.is_paused || self.awaiting_action {
            self.poll_active = false;
        }
        self.worked_ms = self.worked_ms.min(total_work_ms);
        self
    }
}

/// Commands accepted by [`TimerEngine::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    /// Re-run the expired phase for a fresh full duration.
    Continue,
    /// Commit the expired phase and move to the next one.
    Advance,
    Snooze,
    Tick,
}

/// Core timer engine.
///
/// Invalid commands are silently ignored: every command returns `None`
/// when it had no effect.
pub struct TimerEngine {
    cfg: Cfg,
    state: EngineState,
    clock: Box<dyn Clock>,
    notifications: Notifications,
    store: Box<dyn CfgStore>,
}

impl TimerEngine {
    /// Create an idle engine on the system clock, with notifications
    /// disabled and an in-memory config store.
    pub fn new(cfg: Cfg) -> Self {
        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let state = EngineState {
            now_ts: clock.now_ms(),
            ..EngineState::default()
        };
        Self {
            cfg,
            state,
            clock,
            notifications: Notifications::disabled(),
            store: Box::new(MemoryCfgStore::new()),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self.state.now_ts = self.clock.now_ms();
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifications = Notifications::new(Box::new(notifier));
        self
    }

    pub fn with_store(mut self, store: impl CfgStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    /// Replace the session state, e.g. with one persisted by an earlier process.
    pub fn with_state(mut self, state: EngineState) -> Self {
        self.state = state.sanitized(self.cfg.total_work_ms());
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn cycle_index(&self) -> u32 {
        self.state.cycle_index
    }

    pub fn worked_ms(&self) -> u64 {
        self.state.worked_ms
    }

    pub fn is_running(&self) -> bool {
        self.state.phase.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    pub fn awaiting_action(&self) -> bool {
        self.state.awaiting_action
    }

    /// Whether the poll loop should currently be ticking this engine.
    pub fn is_polling(&self) -> bool {
        self.state.poll_active
    }

    pub fn permission(&self) -> Permission {
        self.notifications.permission()
    }

    pub fn total_work_ms(&self) -> u64 {
        self.cfg.total_work_ms()
    }

    pub fn phase_duration_ms(&self) -> u64 {
        self.state.phase_duration_ms
    }

    /// Time left in the current phase as of the last clock sample.
    pub fn remaining_ms(&self) -> u64 {
        if !self.state.phase.is_running() {
            return 0;
        }
        if self.state.is_paused {
            self.state.paused_remaining_ms
        } else {
            self.state.target_ts.saturating_sub(self.state.now_ts)
        }
    }

    pub fn elapsed_in_phase_ms(&self) -> u64 {
        let duration = self.state.phase_duration_ms;
        duration.saturating_sub(self.remaining_ms()).min(duration)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        let duration = self.state.phase_duration_ms;
        if duration == 0 {
            return 0.0;
        }
        (self.elapsed_in_phase_ms() as f64 / duration as f64).clamp(0.0, 1.0)
    }

    /// Committed work plus the running work phase, capped at the goal.
    pub fn overall_worked_ms(&self) -> u64 {
        let current = if self.state.phase == Phase::Work {
            self.elapsed_in_phase_ms()
        } else {
            0
        };
        self.state
            .worked_ms
            .saturating_add(current)
            .min(self.total_work_ms())
    }

    /// 0.0 .. 1.0 progress toward the goal. 0 while idle, 1 once done.
    pub fn overall_progress(&self) -> f64 {
        match self.state.phase {
            Phase::Idle => 0.0,
            Phase::Done => 1.0,
            Phase::Work | Phase::Rest => {
                let total = self.total_work_ms().max(1);
                (self.overall_worked_ms() as f64 / total as f64).clamp(0.0, 1.0)
            }
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            cycle_index: self.state.cycle_index,
            is_paused: self.state.is_paused,
            awaiting_action: self.state.awaiting_action,
            remaining_ms: self.remaining_ms(),
            phase_duration_ms: self.state.phase_duration_ms,
            phase_progress: self.phase_progress(),
            worked_ms: self.state.worked_ms,
            overall_worked_ms: self.overall_worked_ms(),
            total_work_ms: self.total_work_ms(),
            overall_progress: self.overall_progress(),
            at: Utc::now(),
        }
    }

    // ── Configuration & collaborators ────────────────────────────────

    /// Merge `patch` into the configuration and persist it.
    ///
    /// Durations of a phase already in progress are unchanged; new values
    /// apply from the next phase entry. A failed save is logged, not returned.
    ///
    /// # Errors
    /// Returns a validation error, leaving the configuration untouched, if
    /// the merged values are negative or not finite.
    pub fn configure(&mut self, patch: &CfgPatch) -> Result<Event, ValidationError> {
        let merged = self.cfg.merged(patch);
        merged.validate()?;
        self.cfg = merged;
        self.state.worked_ms = self.state.worked_ms.min(self.total_work_ms());
        if let Err(err) = self.store.save(&self.cfg) {
            tracing::warn!(error = %err, "failed to persist timer config");
        }
        tracing::debug!(cfg = ?self.cfg, "configured");
        Ok(Event::Configured {
            cfg: self.cfg,
            at: Utc::now(),
        })
    }

    /// Load the stored configuration, if there is a usable one.
    ///
    /// Returns whether an override was applied.
    pub fn restore(&mut self) -> bool {
        match self.store.load() {
            Some(cfg) => {
                self.cfg = cfg;
                self.state.worked_ms = self.state.worked_ms.min(self.total_work_ms());
                true
            }
            None => false,
        }
    }

    pub fn ensure_permission(&mut self) -> Permission {
        self.notifications.ensure_permission()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn dispatch(&mut self, command: Command) -> Option<Event> {
        match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Reset => self.reset(),
            Command::Skip => self.skip(),
            Command::Continue => self.complete_phase(),
            Command::Advance => self.advance(),
            Command::Snooze => self.snooze(),
            Command::Tick => self.tick(),
        }
    }

    /// Start from idle, restart after done, or resume from pause.
    pub fn start(&mut self) -> Option<Event> {
        if self.state.phase == Phase::Done {
            self.reset();
        }
        if self.state.awaiting_action {
            tracing::debug!("start ignored while awaiting a decision");
            return None;
        }

        if self.state.phase == Phase::Idle {
            let started = self.enter(Phase::Work);
            self.start_polling();
            return Some(started);
        }

        if self.state.is_paused {
            let now = self.sample_clock();
            self.state.target_ts = now.saturating_add(self.state.paused_remaining_ms);
            self.state.is_paused = false;
            self.state.paused_remaining_ms = 0;
            self.start_polling();
            return Some(Event::TimerResumed {
                phase: self.state.phase,
                remaining_ms: self.remaining_ms(),
                at: Utc::now(),
            });
        }

        None // Already running.
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state.awaiting_action || !self.state.phase.is_running() || self.state.is_paused {
            return None;
        }
        let now = self.sample_clock();
        let left = self.state.target_ts.saturating_sub(now);
        self.state.is_paused = true;
        self.state.paused_remaining_ms = left;
        self.state.target_ts = now.saturating_add(left);
        self.stop_polling();
        tracing::debug!(remaining_ms = left, "paused");
        Some(Event::TimerPaused {
            phase: self.state.phase,
            remaining_ms: left,
            at: Utc::now(),
        })
    }

    /// Back to idle, dropping all progress.
    pub fn reset(&mut self) -> Option<Event> {
        self.stop_polling();
        self.state = EngineState {
            now_ts: self.clock.now_ms(),
            ..EngineState::default()
        };
        tracing::debug!("reset");
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// End the running phase early.
    ///
    /// Work elapsed so far is committed, so overall progress never goes
    /// backwards.
    pub fn skip(&mut self) -> Option<Event> {
        let from = self.state.phase;
        if !from.is_running() {
            return None;
        }
        self.sample_clock();
        let committed_ms = if from == Phase::Work {
            self.commit_work(self.elapsed_in_phase_ms())
        } else {
            0
        };
        self.clear_flags();

        match self.move_on(from) {
            done @ Event::SessionDone { .. } => Some(done),
            _ => Some(Event::PhaseSkipped {
                from,
                to: self.state.phase,
                committed_ms,
                at: Utc::now(),
            }),
        }
    }

    /// "Continue": repeat the expired phase for a fresh full duration.
    pub fn complete_phase(&mut self) -> Option<Event> {
        if !self.state.awaiting_action {
            return None;
        }
        let phase = self.state.phase;
        self.clear_flags();
        let started = self.enter(phase);
        self.start_polling();
        Some(started)
    }

    /// Accept the expired phase: commit it and go to the next one (or done).
    pub fn advance(&mut self) -> Option<Event> {
        if !self.state.awaiting_action {
            return None;
        }
        let from = self.state.phase;
        if from == Phase::Work {
            self.commit_work(self.elapsed_in_phase_ms());
        }
        self.clear_flags();
        Some(self.move_on(from))
    }

    /// Extend the current phase by the snooze increment.
    pub fn snooze(&mut self) -> Option<Event> {
        let add = self.cfg.snooze_ms();

        if self.state.is_paused {
            self.state.paused_remaining_ms = self.state.paused_remaining_ms.saturating_add(add);
        } else if self.state.awaiting_action {
            let now = self.sample_clock();
            self.state.awaiting_action = false;
            self.state.target_ts = now.saturating_add(add);
            self.start_polling();
        } else if self.state.phase.is_running() {
            self.state.target_ts = self.state.target_ts.saturating_add(add);
        } else {
            return None;
        }

        self.state.phase_duration_ms = self.state.phase_duration_ms.saturating_add(add);
        self.notifications
            .notify(&format!("Snoozed for {} min.", self.cfg.snooze_min));
        tracing::debug!(added_ms = add, "snoozed");
        Some(Event::PhaseSnoozed {
            phase: self.state.phase,
            added_ms: add,
            remaining_ms: self.remaining_ms(),
            at: Utc::now(),
        })
    }

    /// One poll. Returns `Some(Event::PhaseExpired)` when the phase runs out,
    /// after which polling stops until a decision is made.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.poll_active {
            return None;
        }
        if !self.state.phase.is_running() || self.state.is_paused {
            self.stop_polling();
            return None;
        }
        self.sample_clock();
        if self.remaining_ms() > 0 {
            return None;
        }

        let phase = self.state.phase;
        self.state.awaiting_action = true;
        self.stop_polling();
        self.notifications.notify(match phase {
            Phase::Work => "Work finished: continue or snooze?",
            _ => "Rest finished: continue or snooze?",
        });
        tracing::info!(phase = %phase, "phase expired, awaiting decision");
        Some(Event::PhaseExpired {
            phase,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn sample_clock(&mut self) -> u64 {
        self.state.now_ts = self.clock.now_ms();
        self.state.now_ts
    }

    fn start_polling(&mut self) {
        self.sample_clock();
        self.state.poll_active = true;
    }

    fn stop_polling(&mut self) {
        self.state.poll_active = false;
    }

    fn clear_flags(&mut self) {
        self.state.awaiting_action = false;
        self.state.is_paused = false;
        self.state.paused_remaining_ms = 0;
    }

    /// Add to committed work, clamped to the goal. Returns what was added.
    fn commit_work(&mut self, ms: u64) -> u64 {
        let before = self.state.worked_ms;
        self.state.worked_ms = before.saturating_add(ms).min(self.total_work_ms());
        self.state.worked_ms - before
    }

    /// Begin a work or rest phase with its full configured duration.
    fn enter(&mut self, to: Phase) -> Event {
        self.clear_flags();
        let now = self.sample_clock();
        let duration_ms = match to {
            Phase::Work => self.cfg.work_ms(),
            _ => self.cfg.rest_ms(),
        };
        self.state.phase = to;
        self.state.phase_duration_ms = duration_ms;
        self.state.target_ts = now.saturating_add(duration_ms);

        self.notifications.notify(match to {
            Phase::Work => "Work started",
            _ => "Rest started",
        });
        tracing::info!(phase = %to, duration_ms, cycle = self.state.cycle_index, "phase started");
        Event::PhaseStarted {
            phase: to,
            duration_ms,
            cycle_index: self.state.cycle_index,
            at: Utc::now(),
        }
    }

    /// Leave `from` for the next phase, or for done when leaving work with
    /// the goal met.
    fn move_on(&mut self, from: Phase) -> Event {
        if from == Phase::Work && self.state.worked_ms >= self.total_work_ms() {
            return self.finish();
        }
        if from == Phase::Rest {
            self.state.cycle_index += 1;
        }
        let next = from.opposite().unwrap_or(Phase::Work);
        let started = self.enter(next);
        self.start_polling();
        started
    }

    fn finish(&mut self) -> Event {
        self.stop_polling();
        self.clear_flags();
        self.state.phase = Phase::Done;
        self.state.phase_duration_ms = 0;
        self.state.target_ts = 0;
        self.notifications.notify("Session complete");
        tracing::info!(worked_ms = self.state.worked_ms, "session done");
        Event::SessionDone {
            worked_ms: self.state.worked_ms,
            at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("cfg", &self.cfg)
            .field("state", &self.state)
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}
