use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::{
    aggregation::{
        aggregate_day, aggregate_users_range, merge_time_off, DayAggregate, TimeOffSpan,
        UserCalendar,
    },
    cache::CalendarKey,
    db::models::{
        Allocation, AllocationFilter, AllocationInput, AllocationUpdate, AvailabilityInput,
        TimeOffFilter, TimeOffInput, TimeOffStatus, TimeOffWindow, UserAvailability,
    },
    log_info,
    settings::CalendarSettings,
    AppState,
};

const ENABLE_LOGS: bool = true;

fn check_range(settings: &CalendarSettings, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Ok(());
    }
    let days = (end - start).num_days() + 1;
    if days > i64::from(settings.max_range_days) {
        bail!(
            "Requested range of {days} days exceeds the limit of {} days",
            settings.max_range_days
        );
    }
    Ok(())
}

/// Serves calendars from the cache, loading and aggregating only the users
/// that missed.
async fn load_calendars(
    state: &AppState,
    user_ids: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<UserCalendar>> {
    check_range(&state.settings.calendar(), start, end)?;
    let cache = state.cache();

    let mut calendars: Vec<Option<UserCalendar>> = user_ids
        .iter()
        .map(|user_id| {
            cache
                .get(&CalendarKey::new(user_id.as_str(), start, end))
                .map(|calendar| calendar.as_ref().clone())
        })
        .collect();

    let missing: Vec<String> = user_ids
        .iter()
        .zip(&calendars)
        .filter(|(_, cached)| cached.is_none())
        .map(|(user_id, _)| user_id.clone())
        .collect();
    // Taken before reading so a write landing mid-load keeps the result out
    // of the cache.
    let generations: Vec<u64> = missing.iter().map(|id| cache.generation(id)).collect();

    if !missing.is_empty() {
        let allocations = state
            .db
            .list_allocations_in_range(missing.clone(), start, end)
            .await?;
        let time_off = state
            .db
            .list_approved_time_off_in_range(missing.clone(), start, end)
            .await?;

        let mut fresh = aggregate_users_range(&allocations, &time_off, &missing, start, end)
            .into_iter()
            .zip(generations);
        for slot in calendars.iter_mut().filter(|slot| slot.is_none()) {
            if let Some((calendar, generation)) = fresh.next() {
                let key = CalendarKey::new(calendar.user_id.as_str(), start, end);
                cache.insert(key, calendar.clone(), generation);
                *slot = Some(calendar);
            }
        }
    }

    Ok(calendars.into_iter().flatten().collect())
}

async fn single_calendar(
    state: &AppState,
    user_id: String,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DayAggregate>> {
    let calendar = load_calendars(state, vec![user_id], start, end)
        .await?
        .pop()
        .map(|calendar| calendar.days)
        .unwrap_or_default();
    Ok(calendar)
}

pub async fn get_day_aggregate(
    state: &AppState,
    user_id: String,
    day: NaiveDate,
) -> Result<DayAggregate, String> {
    let users = vec![user_id];
    let allocations = state
        .db
        .list_allocations_in_range(users.clone(), day, day)
        .await
        .map_err(|e| e.to_string())?;
    let time_off = state
        .db
        .list_approved_time_off_in_range(users, day, day)
        .await
        .map_err(|e| e.to_string())?;

    Ok(aggregate_day(&allocations, &time_off, day))
}

pub async fn get_range_aggregate(
    state: &AppState,
    user_id: String,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DayAggregate>, String> {
    single_calendar(state, user_id, start, end)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_calendar(
    state: &AppState,
    user_ids: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<UserCalendar>, String> {
    load_calendars(state, user_ids, start, end)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_overallocated_days(
    state: &AppState,
    user_id: String,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DayAggregate>, String> {
    let days = single_calendar(state, user_id, start, end)
        .await
        .map_err(|e| e.to_string())?;
    Ok(days.into_iter().filter(|day| day.overallocated).collect())
}

pub async fn get_time_off_spans(
    state: &AppState,
    user_id: String,
) -> Result<Vec<TimeOffSpan>, String> {
    let windows = state
        .db
        .list_time_off(TimeOffFilter {
            user_id: Some(user_id),
            status: Some(TimeOffStatus::Approved),
        })
        .await
        .map_err(|e| e.to_string())?;
    Ok(merge_time_off(&windows))
}

pub async fn create_allocation(
    state: &AppState,
    input: AllocationInput,
) -> Result<Allocation, String> {
    let allocation = Allocation::try_from(input).map_err(|e| e.to_string())?;
    state
        .db
        .insert_allocation(&allocation)
        .await
        .map_err(|e| e.to_string())?;
    state.cache().invalidate_user(&allocation.user_id);

    log_info!(
        "Allocated user {} to project {} at {}%",
        allocation.user_id,
        allocation.project_id,
        allocation.allocation_percentage
    );
    Ok(allocation)
}

pub async fn update_allocation(
    state: &AppState,
    allocation_id: String,
    update: AllocationUpdate,
) -> Result<Allocation, String> {
    let existing = state
        .db
        .get_allocation(&allocation_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Resource allocation {allocation_id} not found"))?;
    let allocation = existing.updated(update).map_err(|e| e.to_string())?;

    let stored = state
        .db
        .update_allocation(&allocation)
        .await
        .map_err(|e| e.to_string())?;
    state.cache().invalidate_user(&stored.user_id);
    Ok(stored)
}

pub async fn delete_allocation(state: &AppState, allocation_id: String) -> Result<(), String> {
    let existing = state
        .db
        .get_allocation(&allocation_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Resource allocation {allocation_id} not found"))?;

    state
        .db
        .delete_allocation(&allocation_id)
        .await
        .map_err(|e| e.to_string())?;
    state.cache().invalidate_user(&existing.user_id);

    log_info!("Deleted allocation {}", allocation_id);
    Ok(())
}

pub async fn list_allocations(
    state: &AppState,
    filter: AllocationFilter,
) -> Result<Vec<Allocation>, String> {
    state
        .db
        .list_allocations(filter)
        .await
        .map_err(|e| e.to_string())
}

pub async fn create_time_off_request(
    state: &AppState,
    input: TimeOffInput,
) -> Result<TimeOffWindow, String> {
    let window = TimeOffWindow::try_from(input).map_err(|e| e.to_string())?;
    state
        .db
        .insert_time_off(&window)
        .await
        .map_err(|e| e.to_string())
}

pub async fn update_time_off_status(
    state: &AppState,
    request_id: String,
    status: TimeOffStatus,
    approver: Option<String>,
) -> Result<TimeOffWindow, String> {
    let window = state
        .db
        .update_time_off_status(&request_id, status, approver)
        .await
        .map_err(|e| e.to_string())?;
    state.cache().invalidate_user(&window.user_id);
    Ok(window)
}

pub async fn list_time_off_requests(
    state: &AppState,
    filter: TimeOffFilter,
) -> Result<Vec<TimeOffWindow>, String> {
    state
        .db
        .list_time_off(filter)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_time_off_request(
    state: &AppState,
    request_id: String,
) -> Result<(), String> {
    let existing = state
        .db
        .get_time_off(&request_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Time off request {request_id} not found"))?;

    state
        .db
        .delete_time_off(&request_id)
        .await
        .map_err(|e| e.to_string())?;
    state.cache().invalidate_user(&existing.user_id);
    Ok(())
}

pub async fn get_user_availability(
    state: &AppState,
    user_id: String,
) -> Result<Vec<UserAvailability>, String> {
    state
        .db
        .list_availability(&user_id)
        .await
        .map_err(|e| e.to_string())
}

/// Replaces the user's weekly pattern and returns it as stored.
pub async fn set_user_availability(
    state: &AppState,
    user_id: String,
    slots: Vec<AvailabilityInput>,
) -> Result<Vec<UserAvailability>, String> {
    let slots = slots
        .into_iter()
        .map(|slot| {
            UserAvailability::new(
                user_id.as_str(),
                slot.day_of_week,
                slot.start_time,
                slot.end_time,
            )
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    state
        .db
        .replace_availability(&user_id, slots)
        .await
        .map_err(|e| e.to_string())?;

    get_user_availability(state, user_id).await
}

pub async fn get_calendar_settings(state: &AppState) -> Result<CalendarSettings, String> {
    Ok(state.settings.calendar())
}

/// Persists the settings and starts a fresh cache sized by them.
pub async fn set_calendar_settings(
    state: &AppState,
    settings: CalendarSettings,
) -> Result<(), String> {
    state
        .settings
        .update_calendar(settings.clone())
        .map_err(|e| e.to_string())?;
    state.rebuild_cache(&settings);
    Ok(())
}
