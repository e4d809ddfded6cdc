mod utils;

pub mod aggregation;
pub mod cache;
pub mod db;
pub mod resources;
pub mod settings;

use std::{path::Path, sync::RwLock};

use anyhow::{Context, Result};
use cache::CalendarCache;
use db::Database;
use settings::{CalendarSettings, SettingsStore};

pub use utils::logging::init_logging;

/// Everything a command needs: the store, the settings and the calendar
/// cache built from them.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    cache: RwLock<CalendarCache>,
}

impl AppState {
    /// Opens (or creates) the database and settings file under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let database = Database::new(data_dir.join("resource_calendar.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        log::info!("Resource calendar ready in {}", data_dir.display());
        Ok(Self::from_parts(database, settings))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_parts(
            Database::open_in_memory()?,
            SettingsStore::in_memory(),
        ))
    }

    fn from_parts(db: Database, settings: SettingsStore) -> Self {
        let cache = CalendarCache::new(&settings.calendar());
        Self {
            db,
            settings,
            cache: RwLock::new(cache),
        }
    }

    pub fn cache(&self) -> CalendarCache {
        match self.cache.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn rebuild_cache(&self, settings: &CalendarSettings) {
        let fresh = CalendarCache::new(settings);
        match self.cache.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }
}
