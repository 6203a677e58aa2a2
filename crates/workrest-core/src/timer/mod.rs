mod cfg;
mod clock;
mod engine;
mod phase;
mod poll;

pub use cfg::{Cfg, CfgPatch};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Command, EngineState, TimerEngine};
pub use phase::Phase;
pub use poll::{PollLoop, SharedEngine, DEFAULT_POLL_INTERVAL};
