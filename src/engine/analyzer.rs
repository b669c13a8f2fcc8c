use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use super::calendar::BusinessCalendar;
use super::classifier::{self, IssueContext};
use super::column_time::allocate_column_time;
use super::metrics::{calculate_dora_metrics, calculate_sprint_stats, cycle_time};
use super::normalizer::{normalize_changelog, DroppedEntry};
use super::timeline::SprintTimeline;
use crate::config::CalendarOverrides;
use crate::error::Result;
use crate::insights::{SprintReport, SprintSummary};
use crate::models::{BuildRecord, Issue, RawIssue, SprintInput, SprintWindow};

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Read-only state shared by every issue worker.
#[derive(Debug)]
struct BoardContext {
    window: SprintWindow,
    status_map: HashMap<String, String>,
    calendar: BusinessCalendar,
}

impl BoardContext {
    fn process_issue(&self, raw: &RawIssue) -> (Issue, Vec<DroppedEntry>) {
        let normalized = normalize_changelog(&raw.key, &raw.changelog, &self.status_map);
        let transitions = normalized.transitions;

        let sprint_timeline = SprintTimeline::build(&transitions, &self.window);
        let category = raw.category.clone().unwrap_or_default();
        let flags = classifier::classify(
            IssueContext {
                category: &category,
                created_at: raw.created_at,
            },
            &sprint_timeline,
            &self.window,
        );

        let column_time = allocate_column_time(&sprint_timeline, &self.window, &self.calendar);

        let mut issue = Issue {
            id: raw.id.clone(),
            key: raw.key.clone(),
            created_at: raw.created_at,
            story_points: raw.story_points.unwrap_or(0.0),
            category,
            work_started_at: classifier::work_started_at(&transitions, &self.window),
            completed_at: classifier::completed_at(&transitions, &self.window),
            transitions,
            sprint_timeline,
            flags,
            cycle_time_days: None,
            column_time,
        };
        issue.cycle_time_days = cycle_time(&issue, &self.calendar);

        debug!(
            "Classified {}: {} timeline events (entered in flight: {}), flags {:?}",
            issue.key,
            issue.sprint_timeline.len(),
            issue.sprint_timeline.start_boundary().is_some(),
            issue.flags
        );

        (issue, normalized.dropped)
    }
}

pub struct SprintAnalyzer {
    context: Arc<BoardContext>,
    concurrency: usize,
}

impl SprintAnalyzer {
    pub fn new(
        window: SprintWindow,
        status_map: HashMap<String, String>,
        calendar: BusinessCalendar,
    ) -> Self {
        Self {
            context: Arc::new(BoardContext {
                window,
                status_map,
                calendar,
            }),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Processes every issue on the blocking pool, returning them in input order.
    pub async fn analyze_issues(
        &self,
        issues: Vec<RawIssue>,
    ) -> Result<(Vec<Issue>, Vec<DroppedEntry>)> {
        info!(
            "Processing {} issues with up to {} workers...",
            issues.len(),
            self.concurrency
        );

        let processed: Vec<(Issue, Vec<DroppedEntry>)> = stream::iter(issues)
            .map(|raw| {
                let context = Arc::clone(&self.context);
                tokio::task::spawn_blocking(move || context.process_issue(&raw))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let (issues, dropped): (Vec<_>, Vec<_>) = processed.into_iter().unzip();
        let dropped: Vec<DroppedEntry> = dropped.into_iter().flatten().collect();

        if !dropped.is_empty() {
            warn!("Dropped {} malformed change-log entries", dropped.len());
        }

        Ok((issues, dropped))
    }

    pub async fn analyze(&self, input: AnalysisInput) -> Result<SprintReport> {
        let window = &self.context.window;
        let calendar = &self.context.calendar;

        if input.issues.is_empty() {
            warn!("No issues supplied for sprint");
        }
        if input.builds.is_empty() {
            warn!("No build records supplied for sprint");
        }

        let (issues, warnings) = self.analyze_issues(input.issues).await?;

        let stats = calculate_sprint_stats(&issues, window, calendar);
        let dora = calculate_dora_metrics(&issues, &input.builds, window, calendar);
        info!(
            "Sprint aggregated: throughput {}, velocity {}, {} successful releases",
            stats.throughput, stats.velocity, dora.successful_releases
        );

        let reference_time = input.reference_time.unwrap_or(window.end);

        Ok(SprintReport {
            sprint: SprintSummary {
                name: input.name,
                start: window.start,
                end: window.end,
                columns: window.columns.clone(),
            },
            reference_time,
            is_active: reference_time < window.end,
            issues,
            stats,
            dora,
            warnings,
        })
    }
}

/// Parts of the input document that vary per run once the board is fixed.
pub struct AnalysisInput {
    pub name: Option<String>,
    pub issues: Vec<RawIssue>,
    pub builds: Vec<BuildRecord>,
    pub reference_time: Option<DateTime<Utc>>,
}

/// Runs the full pipeline over a collaborator hand-off document.
pub async fn analyze_sprint(
    input: SprintInput,
    overrides: &CalendarOverrides,
    concurrency: usize,
) -> Result<SprintReport> {
    let calendar_config = input.calendar.unwrap_or_default().with_overrides(overrides);
    let calendar = BusinessCalendar::from_config(&calendar_config)?;
    let window = SprintWindow::new(input.sprint.start, input.sprint.end, input.board.columns)?;

    info!(
        "Analyzing sprint {} ({} to {})",
        input.sprint.name.as_deref().unwrap_or("<unnamed>"),
        window.start,
        window.end
    );

    SprintAnalyzer::new(window, input.board.status_map, calendar)
        .with_concurrency(concurrency)
        .analyze(AnalysisInput {
            name: input.sprint.name,
            issues: input.issues,
            builds: input.builds,
            reference_time: input.reference_time,
        })
        .await
}
