//! Foreground interactive timer.
//!
//! Reads single-letter commands from stdin while the poll loop detects
//! phase expiry in the background.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use workrest_core::{Command, Event, PollLoop, SharedEngine, TimerEngine};

use super::session::{save_state, Session};

const HELP: &str = "\
commands:
  s  start / resume      p  pause
  k  skip phase          z  snooze
  c  continue (repeat expired phase)
  a  advance (accept expired phase)
  r  reset               <enter>  status
  h  help                q  quit";

enum Input {
    Command(Command),
    Status,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" => Input::Status,
        "s" | "start" => Input::Command(Command::Start),
        "p" | "pause" => Input::Command(Command::Pause),
        "k" | "skip" => Input::Command(Command::Skip),
        "c" | "continue" => Input::Command(Command::Continue),
        "a" | "advance" => Input::Command(Command::Advance),
        "z" | "snooze" => Input::Command(Command::Snooze),
        "r" | "reset" => Input::Command(Command::Reset),
        "h" | "?" | "help" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    runtime.block_on(run_loop())
}

async fn run_loop() -> Result<(), Box<dyn std::error::Error>> {
    let Session {
        db,
        settings,
        engine,
    } = Session::open()?;

    let shared: SharedEngine = Arc::new(Mutex::new(engine));
    let (mut poll, mut events) = PollLoop::new(Arc::clone(&shared), settings.poll_interval());
    // Pick up polling if the saved state was mid-phase.
    poll.sync();

    println!("{HELP}");
    print_status(&shared);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = tokio::time::interval(Duration::from_secs(1));
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Input::Command(command) => {
                        match poll.apply(command) {
                            Some(event) => print_event(&event),
                            None => println!("(ignored)"),
                        }
                        persist(&db, &shared);
                        print_status(&shared);
                    }
                    Input::Status => print_status(&shared),
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                    Input::Unknown(other) => println!("unknown command '{other}', h for help"),
                }
            }
            Some(event) = events.recv() => {
                print_event(&event);
                persist(&db, &shared);
                print_status(&shared);
            }
            _ = redraw.tick() => redraw_status(&shared),
        }
    }

    poll.stop();
    persist(&db, &shared);
    println!();
    Ok(())
}

fn persist(db: &Mutex<workrest_core::Database>, shared: &SharedEngine) {
    let result = match shared.lock() {
        Ok(engine) => save_state(db, &engine),
        Err(_) => Err("engine lock poisoned".into()),
    };
    if let Err(err) = result {
        tracing::warn!(error = %err, "failed to save engine state");
    }
}

fn print_event(event: &Event) {
    let line = match event {
        Event::PhaseStarted { phase, duration_ms, .. } => {
            format!("{phase} started ({})", fmt_ms(*duration_ms))
        }
        Event::TimerPaused { remaining_ms, .. } => format!("paused, {} left", fmt_ms(*remaining_ms)),
        Event::TimerResumed { remaining_ms, .. } => {
            format!("resumed, {} left", fmt_ms(*remaining_ms))
        }
        Event::PhaseExpired { phase, .. } => {
            format!("{phase} finished: (c)ontinue, (a)dvance or (z) snooze?")
        }
        Event::PhaseSnoozed { added_ms, .. } => format!("snoozed +{}", fmt_ms(*added_ms)),
        Event::PhaseSkipped { from, to, .. } => format!("skipped {from} -> {to}"),
        Event::SessionDone { worked_ms, .. } => {
            format!("session complete, {} worked", fmt_ms(*worked_ms))
        }
        Event::TimerReset { .. } => "reset".to_string(),
        other => other.kind().to_string(),
    };
    println!("\r\x1b[2K* {line}");
}

fn status_line(engine: &TimerEngine) -> String {
    let mut flags = String::new();
    if engine.is_paused() {
        flags.push_str(" [paused]");
    }
    if engine.awaiting_action() {
        flags.push_str(" [waiting]");
    }
    format!(
        "{:<5} {} left | phase {:>3.0}% | goal {:>3.0}% ({} / {}){}",
        engine.phase(),
        fmt_ms(engine.remaining_ms()),
        engine.phase_progress() * 100.0,
        engine.overall_progress() * 100.0,
        fmt_ms(engine.overall_worked_ms()),
        fmt_ms(engine.total_work_ms()),
        flags,
    )
}

fn print_status(shared: &SharedEngine) {
    if let Ok(engine) = shared.lock() {
        println!("{}", status_line(&engine));
    }
}

fn redraw_status(shared: &SharedEngine) {
    if let Ok(engine) = shared.lock() {
        print!("\r\x1b[2K{}", status_line(&engine));
        let _ = std::io::stdout().flush();
    }
}

fn fmt_ms(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_letters_and_words() {
        assert!(matches!(parse_input("s"), Input::Command(Command::Start)));
        assert!(matches!(parse_input(" snooze "), Input::Command(Command::Snooze)));
        assert!(matches!(parse_input("c"), Input::Command(Command::Continue)));
        assert!(matches!(parse_input(""), Input::Status));
        assert!(matches!(parse_input("q"), Input::Quit));
        assert!(matches!(parse_input("xyz"), Input::Unknown(_)));
    }

    #[test]
    fn formats_durations() {
        assert_eq!(fmt_ms(0), "00:00");
        assert_eq!(fmt_ms(61_000), "01:01");
        assert_eq!(fmt_ms(1_500), "00:02");
        assert_eq!(fmt_ms(5 * 3_600_000), "5:00:00");
    }

    #[test]
    fn status_line_shows_phase_and_flags() {
        let mut engine = TimerEngine::new(workrest_core::Cfg::default());
        engine.start();
        engine.pause();
        let line = status_line(&engine);
        assert!(line.starts_with("Work"));
        assert!(line.contains("[paused]"));
    }
}
