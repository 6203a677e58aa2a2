//! # WorkRest Core Library
//!
//! Core logic for a work/rest interval timer that tracks progress toward a
//! total work-time goal. The `workrest` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock-based phase state machine. The caller
//!   (or [`PollLoop`]) invokes `tick()` periodically to detect expiry
//! - **Storage**: SQLite key-value store for the timer configuration and
//!   TOML-based application settings
//! - **Notifications**: best-effort desktop notifications that can never
//!   affect a transition
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: phase controller, clock accounting, progress accumulator
//! - [`PollLoop`]: tokio task that ticks a shared engine
//! - [`Database`]: key-value persistence
//! - [`Config`]: application settings

pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, ValidationError};
pub use events::Event;
pub use notify::{DesktopNotifier, Notifications, Notifier, Permission};
pub use storage::{CfgStore, Config, Database, DbCfgStore, MemoryCfgStore};
pub use timer::{
    Cfg, CfgPatch, Clock, Command, EngineState, ManualClock, Phase, PollLoop, SharedEngine,
    SystemClock, TimerEngine,
};
