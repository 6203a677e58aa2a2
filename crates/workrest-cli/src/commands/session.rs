//! Engine setup shared by every command that touches the timer.

use std::sync::{Arc, Mutex};

use workrest_core::{Config, Database, DbCfgStore, DesktopNotifier, EngineState, TimerEngine};

/// kv key the engine state is persisted under between invocations.
pub const ENGINE_KEY: &str = "timer_engine";

pub struct Session {
    pub db: Arc<Mutex<Database>>,
    pub settings: Config,
    pub engine: TimerEngine,
}

impl Session {
    /// Open the database, build the engine from settings, apply the stored
    /// timer config, and reload the previous engine state.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let settings = Config::load_or_default();
        let db = Arc::new(Mutex::new(Database::open()?));

        let mut engine = TimerEngine::new(settings.defaults)
            .with_notifier(DesktopNotifier::new(settings.notifications.enabled))
            .with_store(DbCfgStore::new(Arc::clone(&db)));
        engine.restore();
        if let Some(state) = load_state(&db) {
            engine = engine.with_state(state);
        }
        engine.ensure_permission();

        Ok(Self {
            db,
            settings,
            engine,
        })
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        save_state(&self.db, &self.engine)
    }
}

fn load_state(db: &Mutex<Database>) -> Option<EngineState> {
    let db = db.lock().ok()?;
    match db.kv_get(ENGINE_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<EngineState>(&json) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable engine state");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read engine state");
            None
        }
    }
}

pub fn save_state(
    db: &Mutex<Database>,
    engine: &TimerEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(engine.state())?;
    let db = db.lock().map_err(|_| "database lock poisoned")?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}
