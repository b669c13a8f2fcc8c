use indexmap::IndexMap;

use super::calendar::BusinessCalendar;
use super::timeline::SprintTimeline;
use crate::models::{same_column, SprintWindow, TimelineEvent};

/// Business days spent in each working column, in order of first visit.
///
/// Every interval between two consecutive timeline events is charged to the
/// column the issue sat in during it. Entry and terminal columns are queues,
/// not work, and are left out of the result.
pub fn allocate_column_time(
    timeline: &SprintTimeline,
    window: &SprintWindow,
    calendar: &BusinessCalendar,
) -> IndexMap<String, f64> {
    let mut totals: IndexMap<String, f64> = IndexMap::new();
    if timeline.is_empty() {
        return totals;
    }

    let events: Vec<&TimelineEvent> = timeline.with_boundary().collect();

    for pair in events.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let days = calendar.elapsed_business_days(current.at(), next.at());

        *totals.entry(current.to_column().to_string()).or_insert(0.0) += days;
    }

    totals.retain(|column, _| {
        !same_column(column, window.entry_column()) && !same_column(column, window.terminal_column())
    });
    totals
}

/// Sums per-issue allocations, ordering board columns first.
pub fn sum_column_time<'a>(
    allocations: impl IntoIterator<Item = &'a IndexMap<String, f64>>,
    window: &SprintWindow,
) -> IndexMap<String, f64> {
    let mut totals: IndexMap<String, f64> = window
        .columns
        .iter()
        .skip(1)
        .take(window.columns.len().saturating_sub(2))
        .map(|column| (column.clone(), 0.0))
        .collect();

    for allocation in allocations {
        for (column, days) in allocation {
            *totals.entry(column.clone()).or_insert(0.0) += days;
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusTransition;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn window() -> SprintWindow {
        let columns = ["Backlog", "Doing", "Review", "Done"]
            .iter()
            .map(ToString::to_string)
            .collect();
        SprintWindow::new(at(4, 6), at(8, 18), columns).unwrap()
    }

    fn transition(from: &str, to: &str, when: DateTime<Utc>) -> StatusTransition {
        StatusTransition {
            from_column: from.to_string(),
            from_id: None,
            to_column: to.to_string(),
            to_id: None,
            at: when,
        }
    }

    fn allocate(history: &[StatusTransition]) -> IndexMap<String, f64> {
        let window = window();
        let timeline = SprintTimeline::build(history, &window);
        allocate_column_time(&timeline, &window, &BusinessCalendar::default())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_charges_interval_to_column_being_left() {
        let history = vec![
            transition("Backlog", "Doing", at(4, 6)),
            transition("Doing", "Review", at(5, 6)),
            transition("Review", "Done", at(5, 12)),
        ];

        let totals = allocate(&history);

        assert!(approx(totals["Doing"], 1.0));
        assert!(approx(totals["Review"], 0.75));
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn test_repeated_visits_are_summed() {
        let history = vec![
            transition("Backlog", "Doing", at(4, 6)),
            transition("Doing", "Review", at(4, 12)),
            transition("Review", "Doing", at(4, 18)),
            transition("Doing", "Done", at(5, 12)),
        ];

        let totals = allocate(&history);

        assert!(approx(totals["Doing"], 1.5));
        assert!(approx(totals["Review"], 0.75));
    }

    #[test]
    fn test_entry_and_terminal_columns_are_excluded() {
        let history = vec![
            transition("", "Backlog", at(1, 9)),
            transition("Backlog", "Doing", at(6, 6)),
            transition("Doing", "Done", at(7, 6)),
            transition("Done", "Review", at(12, 6)),
        ];

        let totals = allocate(&history);

        assert!(!totals.contains_key("Backlog"));
        assert!(!totals.contains_key("Done"));
        assert!(approx(totals["Doing"], 1.0));
        assert!(totals.values().all(|days| *days >= 0.0));
    }

    #[test]
    fn test_in_flight_issue_is_charged_until_sprint_end() {
        let history = vec![
            transition("Backlog", "Doing", at(1, 9)),
            transition("Doing", "Review", at(6, 6)),
        ];

        let totals = allocate(&history);

        // Start boundary Monday 06:00 to Wednesday 06:00 in Doing, then Review
        // until the end boundary on Friday 18:00.
        assert!(approx(totals["Doing"], 2.0));
        assert!(approx(totals["Review"], 3.0));
    }

    #[test]
    fn test_single_event_timeline_allocates_nothing() {
        let history = vec![transition("Backlog", "Doing", at(1, 9))];

        assert!(allocate(&history).is_empty());
        assert!(allocate(&[]).is_empty());
    }

    #[test]
    fn test_sum_orders_board_columns_first() {
        let first = IndexMap::from([("Review".to_string(), 1.0), ("QA".to_string(), 0.5)]);
        let second = IndexMap::from([("Doing".to_string(), 2.0), ("Review".to_string(), 0.25)]);

        let totals = sum_column_time([&first, &second], &window());
        let keys: Vec<_> = totals.keys().cloned().collect();

        assert_eq!(keys, vec!["Doing", "Review", "QA"]);
        assert!(approx(totals["Review"], 1.25));
        assert!(approx(totals["Doing"], 2.0));
    }
}
