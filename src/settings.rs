use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::log_warn;

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarSettings {
    /// Longest range, in days, a single calendar query may cover.
    pub max_range_days: u32,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            max_range_days: 366,
            cache_ttl_secs: 60,
            cache_capacity: 1024,
        }
    }
}

impl CalendarSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_range_days == 0 {
            bail!("max_range_days must be at least 1");
        }
        if self.cache_capacity == 0 {
            bail!("cache_capacity must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    calendar: CalendarSettings,
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Settings that live only as long as the store.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(UserSettings::default()),
        }
    }

    pub fn calendar(&self) -> CalendarSettings {
        self.read().calendar.clone()
    }

    pub fn update_calendar(&self, settings: CalendarSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        let previous = std::mem::replace(&mut guard.calendar, settings);
        if let Err(err) = self.persist(&guard) {
            guard.calendar = previous;
            return Err(err);
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
