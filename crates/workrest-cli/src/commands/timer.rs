use clap::Subcommand;
use serde::Serialize;
use workrest_core::{Command, Event};

use super::session::Session;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a session, or resume a paused phase
    Start,
    /// Pause the running phase
    Pause,
    /// End the current phase early and move to the next one
    Skip,
    /// Repeat an expired phase for its full duration
    Continue,
    /// Accept an expired phase and move to the next one
    Advance,
    /// Extend the current phase by the snooze increment
    Snooze,
    /// Reset to idle, dropping all progress
    Reset,
    /// Print current timer state as JSON
    Status,
}

impl TimerAction {
    fn command(&self) -> Option<Command> {
        match self {
            TimerAction::Start => Some(Command::Start),
            TimerAction::Pause => Some(Command::Pause),
            TimerAction::Skip => Some(Command::Skip),
            TimerAction::Continue => Some(Command::Continue),
            TimerAction::Advance => Some(Command::Advance),
            TimerAction::Snooze => Some(Command::Snooze),
            TimerAction::Reset => Some(Command::Reset),
            TimerAction::Status => None,
        }
    }
}

#[derive(Serialize)]
struct Report {
    events: Vec<Event>,
    state: Event,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;
    let mut events = Vec::new();

    // Account for time that passed since the last invocation.
    if let Some(event) = session.engine.tick() {
        events.push(event);
    }
    if let Some(command) = action.command() {
        events.extend(session.engine.dispatch(command));
    }

    let report = Report {
        events,
        state: session.engine.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    session.save()?;
    Ok(())
}
