use super::calendar::BusinessCalendar;
use super::column_time::sum_column_time;
use crate::insights::{DoraMetrics, FlagCounts, SprintStats};
use crate::models::{BuildRecord, Issue, IssueFlags, SprintWindow};

/// Business days from work start to completion.
///
/// Falls back to the span of real in-sprint events when either timestamp is
/// missing. Returns `None` when neither is available.
pub fn cycle_time(issue: &Issue, calendar: &BusinessCalendar) -> Option<f64> {
    if let (Some(started), Some(completed)) = (issue.work_started_at, issue.completed_at) {
        return Some(calendar.elapsed_business_days(started, completed));
    }

    match issue.sprint_timeline.real_only() {
        [first, .., last] => Some(calendar.elapsed_business_days(first.at(), last.at())),
        _ => None,
    }
}

/// Upper-middle element of the sorted samples; zero when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted[sorted.len() / 2]
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn cycle_time_samples(issues: &[Issue], calendar: &BusinessCalendar) -> Vec<f64> {
    issues
        .iter()
        .filter(|issue| issue.flags.is_done())
        .filter_map(|issue| cycle_time(issue, calendar))
        .collect()
}

pub fn calculate_sprint_stats(
    issues: &[Issue],
    window: &SprintWindow,
    calendar: &BusinessCalendar,
) -> SprintStats {
    let done: Vec<_> = issues.iter().filter(|i| i.flags.is_done()).collect();
    let throughput = done.len();

    #[allow(clippy::cast_precision_loss)]
    let completion_rate = (throughput as f64 / issues.len().max(1) as f64) * 100.0;

    SprintStats {
        total_issues: issues.len(),
        committed_points: issues.iter().map(|i| i.story_points).sum(),
        throughput,
        velocity: done.iter().map(|i| i.story_points).sum(),
        avg_cycle_time_days: mean(&cycle_time_samples(issues, calendar)),
        completion_rate,
        flag_counts: count_flags(issues.iter().map(|i| &i.flags)),
        column_time: sum_column_time(issues.iter().map(|i| &i.column_time), window),
    }
}

fn count_flags<'a>(flags: impl Iterator<Item = &'a IssueFlags>) -> FlagCounts {
    flags.fold(FlagCounts::default(), |mut counts, f| {
        counts.blocked += usize::from(f.is_blocked);
        counts.incident_response += usize::from(f.is_incident_response);
        counts.back_and_forth += usize::from(f.is_back_and_forth);
        counts.unplanned += usize::from(f.is_unplanned);
        counts.inherited += usize::from(f.is_inherited);
        counts.spillover += usize::from(f.is_spillover);
        counts.completed += usize::from(f.is_completed);
        counts.closed += usize::from(f.is_closed);
        counts
    })
}

pub fn calculate_dora_metrics(
    issues: &[Issue],
    builds: &[BuildRecord],
    window: &SprintWindow,
    calendar: &BusinessCalendar,
) -> DoraMetrics {
    let successful_releases = builds.iter().filter(|b| b.is_successful_release()).count();
    let failed_releases = builds.iter().filter(|b| b.is_failed_release()).count();
    let sprint_business_days = calendar.elapsed_business_days(window.start, window.end);

    #[allow(clippy::cast_precision_loss)]
    let deployment_frequency = if sprint_business_days > 0.0 {
        successful_releases as f64 / sprint_business_days
    } else {
        0.0
    };

    let incidents: Vec<_> = issues.iter().filter(|i| i.flags.is_incident()).collect();

    #[allow(clippy::cast_precision_loss)]
    let change_failure_rate = if successful_releases > 0 {
        100.0 * incidents.len() as f64 / successful_releases as f64
    } else {
        0.0
    };

    let restore_samples: Vec<f64> = incidents
        .iter()
        .filter_map(|issue| time_to_restore(issue, calendar))
        .collect();
    let mttr_days = median(&restore_samples);

    DoraMetrics {
        deployment_frequency,
        lead_time_days: median(&cycle_time_samples(issues, calendar)),
        change_failure_rate,
        mttr_days,
        mttr_seconds: calendar.days_to_seconds(mttr_days),
        sprint_business_days,
        successful_releases,
        failed_releases,
        incidents: incidents.len(),
    }
}

fn time_to_restore(issue: &Issue, calendar: &BusinessCalendar) -> Option<f64> {
    let resolved_at = issue
        .completed_at
        .filter(|_| issue.flags.is_done())
        .or_else(|| issue.sprint_timeline.real_only().last().map(|e| e.at()))?;

    Some(calendar.elapsed_business_days(issue.created_at, resolved_at))
}
