//! Integration tests for the async poll loop.
//!
//! Tokio time is paused, so sleeps resolve instantly while the engine's
//! wall clock is driven by hand.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use workrest_core::notify::RecordingNotifier;
use workrest_core::{Cfg, Command, Event, ManualClock, Phase, PollLoop, TimerEngine};

const MIN: u64 = 60_000;
const INTERVAL: Duration = Duration::from_millis(200);

fn poll_loop(cfg: Cfg) -> (PollLoop, tokio::sync::mpsc::UnboundedReceiver<Event>, ManualClock) {
    let clock = ManualClock::new(0);
    let engine = TimerEngine::new(cfg)
        .with_clock(clock.clone())
        .with_notifier(RecordingNotifier::granted());
    let (poll, rx) = PollLoop::new(Arc::new(Mutex::new(engine)), INTERVAL);
    (poll, rx, clock)
}

#[tokio::test(start_paused = true)]
async fn detects_expiry_and_stops() {
    let (mut poll, mut rx, clock) = poll_loop(Cfg::default());
    assert!(!poll.is_active());

    poll.apply(Command::Start);
    assert!(poll.is_active());

    clock.advance(40 * MIN);
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("tick should fire")
        .expect("channel open");
    assert!(matches!(event, Event::PhaseExpired { phase: Phase::Work, .. }));

    tokio::time::sleep(INTERVAL * 3).await;
    assert!(!poll.is_active());
    let engine = poll.engine().lock().unwrap();
    assert!(engine.awaiting_action());
    assert!(!engine.is_polling());
}

#[tokio::test(start_paused = true)]
async fn no_ticks_before_deadline() {
    let (mut poll, mut rx, clock) = poll_loop(Cfg::default());
    poll.apply(Command::Start);

    clock.advance(10 * MIN);
    tokio::time::sleep(INTERVAL * 5).await;
    assert!(rx.try_recv().is_err());
    assert!(poll.is_active());
    assert_eq!(poll.engine().lock().unwrap().remaining_ms(), 30 * MIN);
}

#[tokio::test(start_paused = true)]
async fn pause_and_reset_stop_the_task() {
    let (mut poll, _rx, _clock) = poll_loop(Cfg::default());
    poll.apply(Command::Start);
    assert!(poll.is_active());

    poll.apply(Command::Pause);
    assert!(!poll.is_active());

    poll.apply(Command::Start);
    assert!(poll.is_active());

    poll.apply(Command::Reset);
    assert!(!poll.is_active());

    // Stopping twice is harmless.
    poll.stop();
    poll.stop();
    assert!(!poll.is_active());
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() {
    let (mut poll, mut rx, clock) = poll_loop(Cfg::default());
    poll.apply(Command::Start);
    poll.sync();
    poll.sync();
    assert!(poll.apply(Command::Start).is_none());
    assert!(poll.is_active());

    clock.advance(40 * MIN);
    tokio::time::sleep(INTERVAL * 10).await;
    let mut expired = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, Event::PhaseExpired { .. }) {
            expired += 1;
        }
    }
    assert_eq!(expired, 1);

    poll.apply(Command::Reset);
    while rx.try_recv().is_ok() {}
    clock.advance(40 * MIN);
    tokio::time::sleep(INTERVAL * 10).await;
    assert!(rx.try_recv().is_err());
    assert!(!poll.is_active());
}

#[tokio::test(start_paused = true)]
async fn continue_after_expiry_polls_again() {
    let (mut poll, mut rx, clock) = poll_loop(Cfg::default());
    poll.apply(Command::Start);
    clock.advance(40 * MIN);
    assert!(matches!(rx.recv().await, Some(Event::PhaseExpired { .. })));

    assert!(matches!(
        poll.apply(Command::Continue),
        Some(Event::PhaseStarted { phase: Phase::Work, .. })
    ));
    assert!(poll.is_active());

    clock.advance(40 * MIN);
    assert!(matches!(rx.recv().await, Some(Event::PhaseExpired { .. })));
}

#[tokio::test(start_paused = true)]
async fn zero_length_phase_does_not_spin() {
    let cfg = Cfg {
        work_min: 0.0,
        ..Cfg::default()
    };
    let (mut poll, mut rx, _clock) = poll_loop(cfg);
    poll.apply(Command::Start);
    assert!(matches!(rx.recv().await, Some(Event::PhaseExpired { .. })));

    tokio::time::sleep(INTERVAL * 10).await;
    assert!(rx.try_recv().is_err());
    assert!(!poll.is_active());
}
