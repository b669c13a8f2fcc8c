use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::timeline::SprintTimeline;
use crate::models::{column_in, same_column, IssueFlags, SprintWindow, StatusTransition};

const COMPLETED_STATUSES: &[&str] = &["done", "complete"];
const CLOSED_STATUSES: &[&str] = &["closed", "resolved"];
const FINISHED_STATUSES: &[&str] = &["done", "closed", "resolved", "complete"];

/// Issue metadata the flags depend on besides its timeline.
#[derive(Debug, Clone, Copy)]
pub struct IssueContext<'a> {
    pub category: &'a str,
    pub created_at: DateTime<Utc>,
}

pub fn classify(
    issue: IssueContext<'_>,
    timeline: &SprintTimeline,
    window: &SprintWindow,
) -> IssueFlags {
    let is_completed = is_completed(timeline, window);

    IssueFlags {
        is_blocked: is_blocked(timeline),
        is_incident_response: issue.category.to_lowercase().contains("incident"),
        is_back_and_forth: is_back_and_forth(timeline),
        is_unplanned: window.contains(issue.created_at),
        is_inherited: is_inherited(issue.created_at, timeline, window),
        is_spillover: is_spillover(timeline, window),
        is_completed,
        // A board whose last column is literally "Closed" counts as completed.
        is_closed: !is_completed && is_closed(timeline),
    }
}

fn is_blocking_column(column: &str) -> bool {
    column.to_lowercase().contains("block")
}

fn is_blocked(timeline: &SprintTimeline) -> bool {
    timeline
        .real_only()
        .iter()
        .any(|e| is_blocking_column(e.to_column()))
}

fn is_back_and_forth(timeline: &SprintTimeline) -> bool {
    let mut visits: HashMap<String, usize> = HashMap::new();

    for event in timeline.real_only() {
        if is_blocking_column(event.to_column()) {
            continue;
        }

        let count = visits
            .entry(event.to_column().trim().to_lowercase())
            .or_insert(0);
        *count += 1;

        if *count > 1 {
            return true;
        }
    }

    false
}

fn is_inherited(
    created_at: DateTime<Utc>,
    timeline: &SprintTimeline,
    window: &SprintWindow,
) -> bool {
    created_at < window.start
        && timeline
            .with_boundary()
            .next()
            .is_some_and(|first| !same_column(first.from_column(), window.entry_column()))
}

fn is_spillover(timeline: &SprintTimeline, window: &SprintWindow) -> bool {
    if timeline
        .end_boundary()
        .is_some_and(|boundary| boundary.at() >= window.end)
    {
        return true;
    }

    timeline.with_boundary().next_back().is_some_and(|last| {
        let column = last.to_column();
        !same_column(column, window.entry_column())
            && !same_column(column, window.terminal_column())
            && !column_in(column, FINISHED_STATUSES)
    })
}

fn is_completed(timeline: &SprintTimeline, window: &SprintWindow) -> bool {
    timeline.real_only().last().is_some_and(|last| {
        let column = last.to_column();
        same_column(column, window.terminal_column()) || column_in(column, COMPLETED_STATUSES)
    })
}

fn is_closed(timeline: &SprintTimeline) -> bool {
    timeline
        .real_only()
        .last()
        .is_some_and(|last| column_in(last.to_column(), CLOSED_STATUSES))
}

/// First moment the issue left the entry column, over its full history.
pub fn work_started_at(
    transitions: &[StatusTransition],
    window: &SprintWindow,
) -> Option<DateTime<Utc>> {
    transitions
        .iter()
        .find(|t| !same_column(&t.to_column, window.entry_column()))
        .map(|t| t.at)
}

/// Moment the issue reached its final state, if its history ends finished.
pub fn completed_at(
    transitions: &[StatusTransition],
    window: &SprintWindow,
) -> Option<DateTime<Utc>> {
    transitions
        .last()
        .filter(|t| {
            same_column(&t.to_column, window.terminal_column())
                || column_in(&t.to_column, FINISHED_STATUSES)
        })
        .map(|t| t.at)
}
