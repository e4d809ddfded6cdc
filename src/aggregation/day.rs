use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::window::DateWindow;
use crate::db::models::{Allocation, TimeOffWindow};

/// Totals strictly above this are overallocated; exactly 100% is a full
/// load, not an overload.
pub const OVERALLOCATION_THRESHOLD: u32 = 100;

/// One allocation's contribution to a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectShare {
    pub allocation_id: String,
    pub project_id: String,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayAggregate {
    pub date: NaiveDate,
    pub allocations: Vec<ProjectShare>,
    pub total_percentage: u32,
    pub overallocated: bool,
    pub on_time_off: bool,
}

/// Summarizes one calendar day.
///
/// Allocations are not deduplicated per project and the total is not
/// clamped. Time off is reported alongside the allocations, it does not
/// cancel them. Only approved time-off windows count.
pub fn aggregate_day(
    allocations: &[Allocation],
    time_off: &[TimeOffWindow],
    day: NaiveDate,
) -> DayAggregate {
    let shares: Vec<ProjectShare> = allocations
        .iter()
        .filter(|allocation| allocation.is_active(day))
        .map(|allocation| ProjectShare {
            allocation_id: allocation.id.clone(),
            project_id: allocation.project_id.clone(),
            percentage: allocation.allocation_percentage,
        })
        .collect();

    let total_percentage: u32 = shares.iter().map(|share| share.percentage).sum();

    let on_time_off = time_off
        .iter()
        .any(|window| window.is_approved() && window.is_active(day));

    DayAggregate {
        date: day,
        allocations: shares,
        total_percentage,
        overallocated: total_percentage > OVERALLOCATION_THRESHOLD,
        on_time_off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{RequestType, TimeOffStatus};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn allocation(project: &str, pct: u32, start: &str, end: Option<&str>) -> Allocation {
        Allocation::new("u1", project, pct, date(start), end.map(date)).unwrap()
    }

    fn time_off(start: &str, end: &str, status: TimeOffStatus) -> TimeOffWindow {
        TimeOffWindow::new("u1", date(start), date(end), RequestType::Vacation, "")
            .unwrap()
            .with_status(status)
    }

    fn projects(aggregate: &DayAggregate) -> Vec<(&str, u32)> {
        aggregate
            .allocations
            .iter()
            .map(|share| (share.project_id.as_str(), share.percentage))
            .collect()
    }

    #[test]
    fn overlapping_allocations_sum_past_one_hundred() {
        let allocations = vec![
            allocation("P1", 60, "2025-01-01", Some("2025-01-10")),
            allocation("P2", 50, "2025-01-05", None),
        ];

        let day = aggregate_day(&allocations, &[], date("2025-01-05"));
        assert_eq!(day.total_percentage, 110);
        assert!(day.overallocated);
        assert_eq!(projects(&day), vec![("P1", 60), ("P2", 50)]);

        let day = aggregate_day(&allocations, &[], date("2025-01-11"));
        assert_eq!(day.total_percentage, 50);
        assert!(!day.overallocated);
        assert_eq!(projects(&day), vec![("P2", 50)]);
    }

    #[test]
    fn empty_day_is_not_an_error() {
        let allocations = vec![allocation("P1", 60, "2025-01-01", Some("2025-01-10"))];
        let day = aggregate_day(&allocations, &[], date("2024-12-31"));
        assert_eq!(day.total_percentage, 0);
        assert!(!day.overallocated);
        assert!(day.allocations.is_empty());
        assert!(!day.on_time_off);
    }

    #[test]
    fn exactly_one_hundred_is_not_overallocated() {
        let allocations = vec![
            allocation("P1", 60, "2025-01-01", None),
            allocation("P2", 40, "2025-01-01", None),
        ];
        let day = aggregate_day(&allocations, &[], date("2025-01-02"));
        assert_eq!(day.total_percentage, 100);
        assert!(!day.overallocated);

        let mut allocations = allocations;
        allocations.push(allocation("P3", 1, "2025-01-02", Some("2025-01-02")));
        let day = aggregate_day(&allocations, &[], date("2025-01-02"));
        assert_eq!(day.total_percentage, 101);
        assert!(day.overallocated);
    }

    #[test]
    fn same_project_allocations_are_not_deduplicated() {
        let allocations = vec![
            allocation("P1", 70, "2025-03-01", None),
            allocation("P1", 70, "2025-03-01", Some("2025-03-31")),
        ];
        let day = aggregate_day(&allocations, &[], date("2025-03-15"));
        assert_eq!(projects(&day), vec![("P1", 70), ("P1", 70)]);
        assert_eq!(day.total_percentage, 140);
    }

    #[test]
    fn only_approved_time_off_counts() {
        let approved = vec![time_off("2025-02-01", "2025-02-03", TimeOffStatus::Approved)];
        assert!(aggregate_day(&[], &approved, date("2025-02-02")).on_time_off);
        assert!(!aggregate_day(&[], &approved, date("2025-02-04")).on_time_off);

        let pending = vec![time_off("2025-02-01", "2025-02-03", TimeOffStatus::Pending)];
        assert!(!aggregate_day(&[], &pending, date("2025-02-02")).on_time_off);

        let rejected = vec![time_off("2025-02-01", "2025-02-03", TimeOffStatus::Rejected)];
        assert!(!aggregate_day(&[], &rejected, date("2025-02-02")).on_time_off);
    }

    #[test]
    fn time_off_keeps_allocations() {
        let allocations = vec![allocation("P1", 80, "2025-02-01", None)];
        let windows = vec![time_off("2025-02-01", "2025-02-03", TimeOffStatus::Approved)];
        let day = aggregate_day(&allocations, &windows, date("2025-02-02"));
        assert!(day.on_time_off);
        assert_eq!(day.total_percentage, 80);
        assert_eq!(projects(&day), vec![("P1", 80)]);
    }
}
