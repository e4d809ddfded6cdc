//! Calendar result cache.
//!
//! Owned by whoever serves calendars (see `AppState`). Entries expire after
//! the configured TTL; writers must call [`CalendarCache::invalidate_user`]
//! after changing a user's allocations or time off.
//!
//! Every user has a generation that `invalidate_user` bumps. Readers take
//! [`CalendarCache::generation`] before loading from the database and pass it
//! to [`CalendarCache::insert`]; an entry stamped with an older generation is
//! never served, so a write that lands mid-load cannot be masked.

use chrono::NaiveDate;
use moka::sync::Cache;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::aggregation::UserCalendar;
use crate::settings::CalendarSettings;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalendarKey {
    pub user_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarKey {
    pub fn new(user_id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            start,
            end,
        }
    }
}

#[derive(Clone)]
struct CachedCalendar {
    generation: u64,
    calendar: Arc<UserCalendar>,
}

#[derive(Clone)]
pub struct CalendarCache {
    inner: Cache<CalendarKey, CachedCalendar>,
    generations: Arc<RwLock<HashMap<String, u64>>>,
}

impl CalendarCache {
    pub fn new(settings: &CalendarSettings) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(settings.cache_capacity)
                .time_to_live(settings.cache_ttl())
                .support_invalidation_closures()
                .build(),
            generations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn generation(&self, user_id: &str) -> u64 {
        let generations = match self.generations.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        generations.get(user_id).copied().unwrap_or(0)
    }

    pub fn get(&self, key: &CalendarKey) -> Option<Arc<UserCalendar>> {
        let entry = self.inner.get(key)?;
        (entry.generation == self.generation(&key.user_id)).then_some(entry.calendar)
    }

    /// Stores a calendar loaded while the user was at `generation`. Stale
    /// loads are handed back without being cached.
    pub fn insert(
        &self,
        key: CalendarKey,
        calendar: UserCalendar,
        generation: u64,
    ) -> Arc<UserCalendar> {
        let calendar = Arc::new(calendar);
        if generation == self.generation(&key.user_id) {
            self.inner.insert(
                key,
                CachedCalendar {
                    generation,
                    calendar: Arc::clone(&calendar),
                },
            );
        }
        calendar
    }

    /// Drops every cached range of `user_id`.
    pub fn invalidate_user(&self, user_id: &str) {
        {
            let mut generations = match self.generations.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *generations.entry(user_id.to_string()).or_insert(0) += 1;
        }

        let user_id = user_id.to_string();
        if let Err(err) = self
            .inner
            .invalidate_entries_if(move |key, _| key.user_id == user_id)
        {
            // Only fails when invalidation closures are disabled.
            log::error!("Failed to invalidate calendar cache: {err}");
            self.inner.invalidate_all();
        }
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
