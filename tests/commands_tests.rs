use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;
use resource_calendar::{
    aggregation::{available_minutes, UserCalendar},
    cache::CalendarKey,
    db::models::{
        AllocationFilter, AllocationInput, AllocationUpdate, AvailabilityInput, RequestType,
        TimeOffFilter, TimeOffInput, TimeOffStatus,
    },
    resources::commands::*,
    settings::CalendarSettings,
    AppState,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn allocation_input(
    user: &str,
    project: &str,
    pct: u32,
    start: &str,
    end: Option<&str>,
) -> AllocationInput {
    AllocationInput {
        user_id: user.into(),
        project_id: project.into(),
        task_id: None,
        allocation_percentage: pct,
        start_date: date(start),
        end_date: end.map(date),
    }
}

fn time(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn slot(day_of_week: u8, start: u32, end: u32) -> AvailabilityInput {
    AvailabilityInput {
        day_of_week,
        start_time: time(start),
        end_time: time(end),
    }
}

fn time_off_input(user: &str, start: &str, end: &str) -> TimeOffInput {
    TimeOffInput {
        user_id: user.into(),
        start_date: date(start),
        end_date: date(end),
        request_type: RequestType::Vacation,
        notes: String::new(),
    }
}

#[tokio::test]
async fn day_aggregate_reflects_stored_allocations() {
    let state = AppState::in_memory().unwrap();
    create_allocation(&state, allocation_input("u1", "P1", 60, "2025-01-01", Some("2025-01-10")))
        .await
        .unwrap();
    create_allocation(&state, allocation_input("u1", "P2", 50, "2025-01-05", None))
        .await
        .unwrap();

    let day = get_day_aggregate(&state, "u1".into(), date("2025-01-05")).await.unwrap();
    assert_eq!(day.total_percentage, 110);
    assert!(day.overallocated);
    let projects: Vec<&str> = day.allocations.iter().map(|s| s.project_id.as_str()).collect();
    assert_eq!(projects, vec!["P1", "P2"]);

    let day = get_day_aggregate(&state, "u1".into(), date("2025-01-11")).await.unwrap();
    assert_eq!(day.total_percentage, 50);
    assert!(!day.overallocated);
}

#[tokio::test]
async fn invalid_input_is_rejected_with_a_message() {
    let state = AppState::in_memory().unwrap();
    let err = create_allocation(&state, allocation_input("u1", "P1", 0, "2025-01-01", None))
        .await
        .unwrap_err();
    assert_eq!(err, "allocation percentage 0 is outside 1..=100");

    let err = create_time_off_request(&state, time_off_input("u1", "2025-02-03", "2025-02-01"))
        .await
        .unwrap_err();
    assert!(err.contains("after end date"));
}

#[tokio::test]
async fn time_off_counts_once_approved() {
    let state = AppState::in_memory().unwrap();
    let request = create_time_off_request(&state, time_off_input("u1", "2025-02-01", "2025-02-03"))
        .await
        .unwrap();

    let days = get_range_aggregate(&state, "u1".into(), date("2025-02-01"), date("2025-02-04"))
        .await
        .unwrap();
    assert!(days.iter().all(|day| !day.on_time_off));

    update_time_off_status(&state, request.id.clone(), TimeOffStatus::Approved, Some("boss".into()))
        .await
        .unwrap();

    // The cached range must have been dropped by the status change.
    let days = get_range_aggregate(&state, "u1".into(), date("2025-02-01"), date("2025-02-04"))
        .await
        .unwrap();
    let flags: Vec<bool> = days.iter().map(|day| day.on_time_off).collect();
    assert_eq!(flags, vec![true, true, true, false]);

    let spans = get_time_off_spans(&state, "u1".into()).await.unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].days(), 3);
}

#[tokio::test]
async fn allocation_writes_invalidate_cached_ranges() {
    let state = AppState::in_memory().unwrap();
    let allocation = create_allocation(&state, allocation_input("u1", "P1", 40, "2025-01-01", None))
        .await
        .unwrap();

    let before = get_range_aggregate(&state, "u1".into(), date("2025-01-01"), date("2025-01-03"))
        .await
        .unwrap();
    assert!(before.iter().all(|day| day.total_percentage == 40));

    update_allocation(
        &state,
        allocation.id.clone(),
        AllocationUpdate {
            task_id: None,
            allocation_percentage: 70,
            start_date: date("2025-01-01"),
            end_date: None,
        },
    )
    .await
    .unwrap();
    create_allocation(&state, allocation_input("u1", "P2", 40, "2025-01-02", None))
        .await
        .unwrap();

    let after = get_range_aggregate(&state, "u1".into(), date("2025-01-01"), date("2025-01-03"))
        .await
        .unwrap();
    let totals: Vec<u32> = after.iter().map(|day| day.total_percentage).collect();
    assert_eq!(totals, vec![70, 110, 110]);

    let overloaded =
        get_overallocated_days(&state, "u1".into(), date("2025-01-01"), date("2025-01-03"))
            .await
            .unwrap();
    assert_eq!(overloaded.len(), 2);

    delete_allocation(&state, allocation.id).await.unwrap();
    let after_delete =
        get_range_aggregate(&state, "u1".into(), date("2025-01-01"), date("2025-01-03"))
            .await
            .unwrap();
    let totals: Vec<u32> = after_delete.iter().map(|day| day.total_percentage).collect();
    assert_eq!(totals, vec![0, 40, 40]);
}

#[tokio::test]
async fn multi_user_calendar_keeps_order() {
    let state = AppState::in_memory().unwrap();
    create_allocation(&state, allocation_input("alice", "P1", 100, "2025-01-01", None))
        .await
        .unwrap();
    create_allocation(&state, allocation_input("bob", "P1", 20, "2025-01-01", None))
        .await
        .unwrap();

    // Warm the cache for one user only.
    get_range_aggregate(&state, "bob".into(), date("2025-01-01"), date("2025-01-07"))
        .await
        .unwrap();

    let calendars = get_calendar(
        &state,
        vec!["alice".into(), "bob".into(), "carol".into()],
        date("2025-01-01"),
        date("2025-01-07"),
    )
    .await
    .unwrap();
    let users: Vec<&str> = calendars.iter().map(|c| c.user_id.as_str()).collect();
    assert_eq!(users, vec!["alice", "bob", "carol"]);
    assert!(calendars.iter().all(|c| c.days.len() == 7));
    assert!(calendars[0].days.iter().all(|d| d.total_percentage == 100 && !d.overallocated));
    assert!(calendars[1].days.iter().all(|d| d.total_percentage == 20));
    assert!(calendars[2].days.iter().all(|d| d.allocations.is_empty()));
}

#[tokio::test]
async fn inverted_range_is_empty_not_an_error() {
    let state = AppState::in_memory().unwrap();
    let days = get_range_aggregate(&state, "u1".into(), date("2025-01-10"), date("2025-01-01"))
        .await
        .unwrap();
    assert!(days.is_empty());
}

#[tokio::test]
async fn range_limit_comes_from_settings() {
    let state = AppState::in_memory().unwrap();
    set_calendar_settings(
        &state,
        CalendarSettings {
            max_range_days: 7,
            ..CalendarSettings::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(get_calendar_settings(&state).await.unwrap().max_range_days, 7);

    assert!(get_range_aggregate(&state, "u1".into(), date("2025-01-01"), date("2025-01-07"))
        .await
        .is_ok());
    let err = get_range_aggregate(&state, "u1".into(), date("2025-01-01"), date("2025-01-08"))
        .await
        .unwrap_err();
    assert!(err.contains("exceeds the limit of 7 days"));
}

#[tokio::test]
async fn listing_commands_pass_filters_through() {
    let state = AppState::in_memory().unwrap();
    create_allocation(&state, allocation_input("u1", "P1", 10, "2025-01-01", None))
        .await
        .unwrap();
    create_allocation(&state, allocation_input("u2", "P1", 10, "2025-01-01", None))
        .await
        .unwrap();
    let request = create_time_off_request(&state, time_off_input("u1", "2025-03-01", "2025-03-02"))
        .await
        .unwrap();

    let u2 = list_allocations(
        &state,
        AllocationFilter {
            user_id: Some("u2".into()),
            project_id: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(u2.len(), 1);

    let pending = list_time_off_requests(
        &state,
        TimeOffFilter {
            user_id: None,
            status: Some(TimeOffStatus::Pending),
        },
    )
    .await
    .unwrap();
    assert_eq!(pending.len(), 1);

    delete_time_off_request(&state, request.id.clone()).await.unwrap();
    assert!(delete_time_off_request(&state, request.id).await.is_err());
}

#[tokio::test]
async fn availability_round_trip_through_commands() {
    let state = AppState::in_memory().unwrap();
    let slots = set_user_availability(&state, "u1".into(), vec![slot(5, 9, 17), slot(1, 9, 17)])
        .await
        .unwrap();
    let days: Vec<u8> = slots.iter().map(|slot| slot.day_of_week).collect();
    assert_eq!(days, vec![1, 5]);

    let err = set_user_availability(&state, "u1".into(), vec![slot(2, 17, 9)])
        .await
        .unwrap_err();
    assert!(err.contains("must be before"));
    assert_eq!(get_user_availability(&state, "u1".into()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn app_state_opens_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let state = AppState::open(dir.path().join("data")).unwrap();
        create_allocation(&state, allocation_input("u1", "P1", 10, "2025-01-01", None))
            .await
            .unwrap();
        set_calendar_settings(
            &state,
            CalendarSettings {
                max_range_days: 30,
                ..CalendarSettings::default()
            },
        )
        .await
        .unwrap();
    }

    let state = AppState::open(dir.path().join("data")).unwrap();
    assert_eq!(state.settings.calendar().max_range_days, 30);
    let day = get_day_aggregate(&state, "u1".into(), date("2025-01-02")).await.unwrap();
    assert_eq!(day.total_percentage, 10);
}

#[tokio::test]
async fn overlapping_weekly_slots_are_refused() {
    let state = AppState::in_memory().unwrap();
    let err = set_user_availability(&state, "u1".into(), vec![slot(1, 9, 17), slot(1, 10, 12)])
        .await
        .unwrap_err();
    assert!(err.contains("overlap on day 1"));
    assert!(get_user_availability(&state, "u1".into()).await.unwrap().is_empty());

    let slots = set_user_availability(&state, "u1".into(), vec![slot(1, 13, 17), slot(1, 9, 13)])
        .await
        .unwrap();
    let monday = date("2025-01-06");
    assert_eq!(available_minutes(&slots, monday), 480);
}

#[tokio::test]
async fn open_ended_allocations_reach_past_year_9999() {
    let state = AppState::in_memory().unwrap();
    create_allocation(&state, allocation_input("u1", "P2", 50, "2025-01-05", None))
        .await
        .unwrap();

    let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
    let day = get_day_aggregate(&state, "u1".into(), far).await.unwrap();
    assert_eq!(day.total_percentage, 50);

    let days = get_range_aggregate(&state, "u1".into(), date("9999-12-30"), far)
        .await
        .unwrap();
    let totals: Vec<u32> = days.iter().map(|day| day.total_percentage).collect();
    assert_eq!(totals, vec![50, 50, 50]);

    let mut input = allocation_input("u1", "P3", 10, "2025-01-01", None);
    input.start_date = far;
    let err = create_allocation(&state, input).await.unwrap_err();
    assert!(err.contains("outside years 0000..=9999"));
}

#[tokio::test]
async fn calendar_loaded_before_a_write_is_not_served_after_it() {
    let state = AppState::in_memory().unwrap();
    let (start, end) = (date("2025-01-01"), date("2025-01-03"));
    create_allocation(&state, allocation_input("u1", "P1", 40, "2025-01-01", None))
        .await
        .unwrap();

    // A reader snapshots the generation and loads, then a write lands before
    // it stores its result.
    let cache = state.cache();
    let generation = cache.generation("u1");
    let stale: UserCalendar = get_calendar(&state, vec!["u1".into()], start, end)
        .await
        .unwrap()
        .remove(0);
    create_allocation(&state, allocation_input("u1", "P2", 40, "2025-01-02", None))
        .await
        .unwrap();
    cache.insert(CalendarKey::new("u1", start, end), stale, generation);

    let days = get_range_aggregate(&state, "u1".into(), start, end)
        .await
        .unwrap();
    let totals: Vec<u32> = days.iter().map(|day| day.total_percentage).collect();
    assert_eq!(totals, vec![40, 80, 80]);
}
