//! Async poll loop for a shared [`TimerEngine`].
//!
//! The engine decides *whether* it wants polling (`is_polling()`); this
//! controller owns the one task that does it. Must be used from inside a
//! tokio runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::{Command, TimerEngine};
use crate::events::Event;

pub type SharedEngine = Arc<Mutex<TimerEngine>>;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

struct TickTask {
    handle: JoinHandle<()>,
    /// Cleared by the task itself, under the engine lock, right before it exits.
    alive: Arc<AtomicBool>,
}

pub struct PollLoop {
    engine: SharedEngine,
    interval: Duration,
    events: mpsc::UnboundedSender<Event>,
    task: Option<TickTask>,
}

impl PollLoop {
    /// Returns the loop and the receiving end for events produced by ticks.
    pub fn new(engine: SharedEngine, interval: Duration) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        let poll = Self {
            engine,
            interval,
            events,
            task: None,
        };
        (poll, rx)
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Whether a tick task is live.
    pub fn is_active(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| task.alive.load(Ordering::SeqCst))
    }

    /// Run a command against the engine, then start or stop the task to match.
    pub fn apply(&mut self, command: Command) -> Option<Event> {
        let event = match self.engine.lock() {
            Ok(mut engine) => engine.dispatch(command),
            Err(_) => {
                tracing::error!("engine lock poisoned");
                return None;
            }
        };
        self.sync();
        event
    }

    /// Bring the task in line with the engine: spawn one if the engine wants
    /// polling and none is live, abort it if the engine no longer does.
    pub fn sync(&mut self) {
        let engine = Arc::clone(&self.engine);
        let Ok(guard) = engine.lock() else {
            tracing::error!("engine lock poisoned");
            self.stop();
            return;
        };
        if guard.is_polling() {
            if !self.is_active() {
                self.spawn();
            }
        } else {
            self.stop();
        }
    }

    /// Cancel the pending tick, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.alive.store(false, Ordering::SeqCst);
            task.handle.abort();
            tracing::debug!("poll loop stopped");
        }
    }

    fn spawn(&mut self) {
        self.stop();
        let alive = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(run_ticks(
            Arc::clone(&self.engine),
            self.interval,
            self.events.clone(),
            Arc::clone(&alive),
        ));
        self.task = Some(TickTask { handle, alive });
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "poll loop started");
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticks(
    engine: SharedEngine,
    interval: Duration,
    events: mpsc::UnboundedSender<Event>,
    alive: Arc<AtomicBool>,
) {
    loop {
        tokio::time::sleep(interval).await;

        let event = {
            let Ok(mut engine) = engine.lock() else {
                alive.store(false, Ordering::SeqCst);
                return;
            };
            if !alive.load(Ordering::SeqCst) {
                return;
            }
            let event = engine.tick();
            if !engine.is_polling() {
                alive.store(false, Ordering::SeqCst);
            }
            event
        };

        if let Some(event) = event {
            // Nobody listening is fine; the engine state is what matters.
            let _ = events.send(event);
        }
        if !alive.load(Ordering::SeqCst) {
            return;
        }
    }
}
