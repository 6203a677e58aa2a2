use std::sync::{Arc, Mutex};

use super::Database;
use crate::error::ConfigError;
use crate::timer::Cfg;

/// Fixed kv key the timer configuration lives under.
pub const CFG_KEY: &str = "workrest_cfg";

/// Persistence for the timer configuration.
///
/// `load` folds "nothing stored" and "stored garbage" into `None`; callers
/// keep their in-memory defaults in both cases.
pub trait CfgStore: Send {
    fn load(&self) -> Option<Cfg>;
    fn save(&self, cfg: &Cfg) -> Result<(), ConfigError>;
}

/// Stores the JSON form of [`Cfg`] under [`CFG_KEY`].
#[derive(Clone)]
pub struct DbCfgStore {
    db: Arc<Mutex<Database>>,
}

impl DbCfgStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

impl CfgStore for DbCfgStore {
    fn load(&self) -> Option<Cfg> {
        let raw = {
            let db = self.db.lock().ok()?;
            match db.kv_get(CFG_KEY) {
                Ok(raw) => raw?,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read stored timer config");
                    return None;
                }
            }
        };
        match serde_json::from_str::<Cfg>(&raw) {
            Ok(cfg) if cfg.validate().is_ok() => Some(cfg),
            Ok(_) => {
                tracing::warn!("stored timer config has invalid values, ignoring");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "stored timer config is malformed, ignoring");
                None
            }
        }
    }

    fn save(&self, cfg: &Cfg) -> Result<(), ConfigError> {
        let json =
            serde_json::to_string(cfg).map_err(|e| ConfigError::StoreFailed(e.to_string()))?;
        let db = self
            .db
            .lock()
            .map_err(|_| ConfigError::StoreFailed("database lock poisoned".into()))?;
        db.kv_set(CFG_KEY, &json)
            .map_err(|e| ConfigError::StoreFailed(e.to_string()))
    }
}

/// In-process store. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCfgStore {
    slot: Arc<Mutex<Option<Cfg>>>,
}

impl MemoryCfgStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(cfg: Cfg) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(cfg))),
        }
    }

    pub fn stored(&self) -> Option<Cfg> {
        self.slot.lock().ok().and_then(|slot| *slot)
    }
}

impl CfgStore for MemoryCfgStore {
    fn load(&self) -> Option<Cfg> {
        self.stored()
    }

    fn save(&self, cfg: &Cfg) -> Result<(), ConfigError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ConfigError::StoreFailed("store lock poisoned".into()))?;
        *slot = Some(*cfg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_store() -> (DbCfgStore, Arc<Mutex<Database>>) {
        let db = Arc::new(Mutex::new(Database::open_memory().unwrap()));
        (DbCfgStore::new(db.clone()), db)
    }

    #[test]
    fn empty_store_loads_nothing() {
        let (store, _db) = db_store();
        assert!(store.load().is_none());
    }

    #[test]
    fn saved_cfg_loads_back() {
        let (store, _db) = db_store();
        let cfg = Cfg {
            work_min: 25.0,
            ..Cfg::default()
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), Some(cfg));
    }

    #[test]
    fn malformed_json_is_no_override() {
        let (store, db) = db_store();
        db.lock().unwrap().kv_set(CFG_KEY, "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn invalid_values_are_no_override() {
        let (store, db) = db_store();
        db.lock()
            .unwrap()
            .kv_set(CFG_KEY, r#"{"totalHours":-3,"workMin":40,"restMin":20,"snoozeMin":5}"#)
            .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn memory_store_shares_slot() {
        let store = MemoryCfgStore::new();
        let other = store.clone();
        other.save(&Cfg::default()).unwrap();
        assert_eq!(store.load(), Some(Cfg::default()));
    }
}
