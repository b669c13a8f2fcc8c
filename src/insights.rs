use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::DroppedEntry;
use crate::models::Issue;

#[derive(Debug, Serialize)]
pub struct SprintReport {
    pub sprint: SprintSummary,
    pub reference_time: DateTime<Utc>,
    pub is_active: bool,
    pub issues: Vec<Issue>,
    pub stats: SprintStats,
    pub dora: DoraMetrics,
    pub warnings: Vec<DroppedEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SprintSummary {
    pub name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintStats {
    pub total_issues: usize,
    pub committed_points: f64,
    pub throughput: usize,
    pub velocity: f64,
    pub avg_cycle_time_days: f64,
    pub completion_rate: f64,
    pub flag_counts: FlagCounts,
    pub column_time: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlagCounts {
    pub blocked: usize,
    pub incident_response: usize,
    pub back_and_forth: usize,
    pub unplanned: usize,
    pub inherited: usize,
    pub spillover: usize,
    pub completed: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoraMetrics {
    /// Successful releases per business day of the sprint.
    pub deployment_frequency: f64,
    pub lead_time_days: f64,
    pub change_failure_rate: f64,
    pub mttr_days: f64,
    pub mttr_seconds: f64,
    pub sprint_business_days: f64,
    pub successful_releases: usize,
    pub failed_releases: usize,
    pub incidents: usize,
}
