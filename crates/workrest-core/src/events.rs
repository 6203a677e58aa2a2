use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Cfg, Phase};

/// Every effective state change produces an Event.
/// No-op commands produce none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A work or rest phase began with a fresh full duration.
    PhaseStarted {
        phase: Phase,
        duration_ms: u64,
        cycle_index: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The running phase ran out; the engine waits for continue, advance, or snooze.
    PhaseExpired {
        phase: Phase,
        at: DateTime<Utc>,
    },
    /// The current phase was extended.
    PhaseSnoozed {
        phase: Phase,
        added_ms: u64,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        from: Phase,
        to: Phase,
        committed_ms: u64,
        at: DateTime<Utc>,
    },
    /// A work phase was left with the goal met.
    SessionDone {
        worked_ms: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    Configured {
        cfg: Cfg,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        cycle_index: u32,
        is_paused: bool,
        awaiting_action: bool,
        remaining_ms: u64,
        phase_duration_ms: u64,
        phase_progress: f64,
        worked_ms: u64,
        overall_worked_ms: u64,
        total_work_ms: u64,
        overall_progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Snake-case name of the variant, for logs and status lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PhaseStarted { .. } => "phase_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::PhaseExpired { .. } => "phase_expired",
            Event::PhaseSnoozed { .. } => "phase_snoozed",
            Event::PhaseSkipped { .. } => "phase_skipped",
            Event::SessionDone { .. } => "session_done",
            Event::TimerReset { .. } => "timer_reset",
            Event::Configured { .. } => "configured",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
