use serde::{Serialize, Serializer};

use crate::models::{column_in, SprintWindow, StatusTransition, TimelineEvent};

/// Statuses after which an issue is no longer in flight at sprint end.
const SETTLED_STATUSES: &[&str] = &["done", "fixed", "finished", "closed", "cancelled"];

/// Sprint-scoped view of one issue's status history.
///
/// Holds the real transitions that happened inside the window plus at most
/// one synthetic event at each edge of the window. Consumers pick the view
/// they need explicitly: [`SprintTimeline::real_only`] answers "what happened
/// during the sprint", [`SprintTimeline::with_boundary`] answers "what state
/// was the issue in entering and leaving it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SprintTimeline {
    start_boundary: Option<TimelineEvent>,
    in_sprint: Vec<TimelineEvent>,
    end_boundary: Option<TimelineEvent>,
}

impl SprintTimeline {
    pub fn build(transitions: &[StatusTransition], window: &SprintWindow) -> Self {
        let last_before = transitions
            .iter()
            .filter(|t| t.at < window.start)
            .max_by_key(|t| t.at);

        let first_after = transitions
            .iter()
            .filter(|t| t.at > window.end)
            .min_by_key(|t| t.at);

        let mut in_sprint: Vec<TimelineEvent> = transitions
            .iter()
            .filter(|t| window.contains(t.at))
            .map(|t| TimelineEvent {
                transition: t.clone(),
                in_sprint: true,
            })
            .collect();
        in_sprint.sort_by_key(TimelineEvent::at);

        // Column the issue was already sitting in when the sprint began.
        let start_boundary = last_before.map(|before| {
            boundary_event(
                window.start,
                (&before.to_column, before.to_id.as_ref()),
                (&before.to_column, before.to_id.as_ref()),
            )
        });

        let last_known = in_sprint
            .last()
            .map(|e| &e.transition)
            .or(last_before)
            .map(|t| (&t.to_column, t.to_id.as_ref()));

        let end_boundary = match (first_after, in_sprint.last()) {
            // Moved again after the sprint closed, so it was still in flight.
            (Some(after), _) => {
                let empty = String::new();
                let from = last_known.unwrap_or((&empty, None));
                Some(boundary_event(
                    window.end,
                    from,
                    (&after.to_column, after.to_id.as_ref()),
                ))
            }
            (None, Some(last)) if !column_in(last.to_column(), SETTLED_STATUSES) => {
                let still_in = (&last.transition.to_column, last.transition.to_id.as_ref());
                Some(boundary_event(window.end, still_in, still_in))
            }
            _ => None,
        };

        Self {
            start_boundary,
            in_sprint,
            end_boundary,
        }
    }

    /// Real transitions recorded inside the sprint window.
    pub fn real_only(&self) -> &[TimelineEvent] {
        &self.in_sprint
    }

    /// Every event in chronological order, synthetic boundaries included.
    pub fn with_boundary(&self) -> impl DoubleEndedIterator<Item = &TimelineEvent> + '_ {
        self.start_boundary
            .iter()
            .chain(self.in_sprint.iter())
            .chain(self.end_boundary.iter())
    }

    pub fn start_boundary(&self) -> Option<&TimelineEvent> {
        self.start_boundary.as_ref()
    }

    pub fn end_boundary(&self) -> Option<&TimelineEvent> {
        self.end_boundary.as_ref()
    }

    pub fn len(&self) -> usize {
        self.in_sprint.len()
            + usize::from(self.start_boundary.is_some())
            + usize::from(self.end_boundary.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for SprintTimeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.with_boundary())
    }
}

fn boundary_event(
    at: chrono::DateTime<chrono::Utc>,
    from: (&String, Option<&String>),
    to: (&String, Option<&String>),
) -> TimelineEvent {
    TimelineEvent {
        transition: StatusTransition {
            from_column: from.0.clone(),
            from_id: from.1.cloned(),
            to_column: to.0.clone(),
            to_id: to.1.cloned(),
            at,
        },
        in_sprint: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
            to_id: Some(format!("id-{to}")),
            at: when,
        }
    }

    #[test]
    fn test_no_history_yields_empty_timeline() {
        let timeline = SprintTimeline::build(&[], &window());

        assert!(timeline.is_empty());
        assert!(timeline.real_only().is_empty());
        assert_eq!(timeline.with_boundary().count(), 0);
    }

    #[test]
    fn test_history_only_before_sprint_yields_single_start_boundary() {
        let history = vec![
            transition("Backlog", "Doing", at(1, 10)),
            transition("Doing", "Review", at(2, 10)),
        ];

        let timeline = SprintTimeline::build(&history, &window());
        let events: Vec<_> = timeline.with_boundary().collect();

        assert_eq!(events.len(), 1);
        assert!(!events[0].in_sprint);
        assert_eq!(events[0].at(), at(4, 6));
        assert_eq!(events[0].from_column(), "Review");
        assert_eq!(events[0].to_column(), "Review");
        assert_eq!(events[0].transition.to_id.as_deref(), Some("id-Review"));
        assert!(timeline.end_boundary().is_none());
    }

    #[test]
    fn test_in_window_events_are_tagged_in_sprint() {
        let history = vec![
            transition("Backlog", "Doing", at(5, 9)),
            transition("Doing", "Done", at(6, 9)),
        ];

        let timeline = SprintTimeline::build(&history, &window());

        assert_eq!(timeline.real_only().len(), 2);
        assert!(timeline.real_only().iter().all(|e| e.in_sprint));
        assert!(timeline.start_boundary().is_none());
        assert!(timeline.end_boundary().is_none());
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let history = vec![
            transition("Backlog", "Doing", at(4, 6)),
            transition("Doing", "Done", at(8, 18)),
        ];

        let timeline = SprintTimeline::build(&history, &window());

        assert_eq!(timeline.real_only().len(), 2);
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_open_issue_at_sprint_end_repeats_last_column() {
        let history = vec![transition("Backlog", "Doing", at(5, 9))];

        let timeline = SprintTimeline::build(&history, &window());
        let end = timeline.end_boundary().unwrap();

        assert!(!end.in_sprint);
        assert_eq!(end.at(), at(8, 18));
        assert_eq!(end.from_column(), "Doing");
        assert_eq!(end.to_column(), "Doing");
    }

    #[test]
    fn test_settled_statuses_do_not_get_end_boundary() {
        for status in ["Done", "FIXED", "finished", "Closed", "cancelled"] {
            let history = vec![transition("Doing", status, at(5, 9))];
            let timeline = SprintTimeline::build(&history, &window());
            assert!(timeline.end_boundary().is_none(), "status {status}");
        }
    }

    #[test]
    fn test_move_after_sprint_yields_end_boundary_to_next_column() {
        let history = vec![
            transition("Backlog", "Doing", at(5, 9)),
            transition("Doing", "Done", at(12, 9)),
            transition("Done", "Doing", at(13, 9)),
        ];

        let timeline = SprintTimeline::build(&history, &window());
        let end = timeline.end_boundary().unwrap();

        assert_eq!(end.at(), at(8, 18));
        assert_eq!(end.from_column(), "Doing");
        assert_eq!(end.to_column(), "Done");
    }

    #[test]
    fn test_end_boundary_falls_back_to_column_before_sprint() {
        let history = vec![
            transition("Backlog", "Review", at(1, 9)),
            transition("Review", "Done", at(12, 9)),
        ];

        let timeline = SprintTimeline::build(&history, &window());
        let events: Vec<_> = timeline.with_boundary().collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].from_column(), "Review");
        assert_eq!(events[1].to_column(), "Done");
    }

    #[test]
    fn test_end_boundary_without_prior_state_has_empty_origin() {
        let history = vec![transition("Backlog", "Doing", at(12, 9))];

        let timeline = SprintTimeline::build(&history, &window());
        let end = timeline.end_boundary().unwrap();

        assert_eq!(end.from_column(), "");
        assert!(end.transition.from_id.is_none());
        assert_eq!(end.to_column(), "Doing");
    }

    #[test]
    fn test_with_boundary_is_chronological() {
        let history = vec![
            transition("Doing", "Review", at(7, 9)),
            transition("Backlog", "Doing", at(1, 9)),
            transition("Review", "Doing", at(5, 9)),
            transition("Doing", "Done", at(15, 9)),
        ];

        let timeline = SprintTimeline::build(&history, &window());
        let times: Vec<_> = timeline.with_boundary().map(TimelineEvent::at).collect();

        assert_eq!(times.len(), 4);
        assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(times.first(), Some(&at(4, 6)));
        assert_eq!(times.last(), Some(&at(8, 18)));
    }

    #[test]
    fn test_serializes_as_flat_event_list() {
        let history = vec![transition("Backlog", "Doing", at(5, 9))];
        let timeline = SprintTimeline::build(&history, &window());

        let json = serde_json::to_value(&timeline).unwrap();
        let events = json.as_array().unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["in_sprint"], true);
        assert_eq!(events[0]["to_column"], "Doing");
        assert_eq!(events[1]["in_sprint"], false);
    }
}
