use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::CalendarConfig;
use crate::engine::SprintTimeline;
use crate::error::{Result, SprintLensError};
use crate::timestamp;

/// Document handed over by the tracker and CI collaborators.
#[derive(Debug, Deserialize)]
pub struct SprintInput {
    pub sprint: SprintDescriptor,
    pub board: BoardDescriptor,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
    #[serde(default)]
    pub calendar: Option<CalendarConfig>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub reference_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SprintDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardDescriptor {
    pub columns: Vec<String>,
    #[serde(default)]
    pub status_map: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub id: String,
    pub key: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub story_points: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub changelog: Vec<RawChangeEvent>,
}

/// One logged field change. Every field is optional on the wire so a single
/// malformed entry can be dropped without rejecting the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChangeEvent {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, rename = "from")]
    pub from_id: Option<String>,
    #[serde(default, rename = "from_string")]
    pub from_label: Option<String>,
    #[serde(default, rename = "to")]
    pub to_id: Option<String>,
    #[serde(default, rename = "to_string")]
    pub to_label: Option<String>,
    #[serde(default, rename = "created")]
    pub occurred_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    pub pipeline_name: String,
    pub status: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub started_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_release: bool,
    #[serde(default)]
    pub is_release_success: bool,
    #[serde(default)]
    pub in_sprint: bool,
}

impl BuildRecord {
    pub fn is_successful_release(&self) -> bool {
        self.in_sprint && self.is_release && self.is_release_success
    }

    pub fn is_failed_release(&self) -> bool {
        self.in_sprint && self.is_release && !self.is_release_success
    }
}

/// Reporting period plus the ordered board columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub columns: Vec<String>,
}

impl SprintWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, columns: Vec<String>) -> Result<Self> {
        if start > end {
            return Err(SprintLensError::InvalidInput(format!(
                "sprint start {start} is after sprint end {end}"
            )));
        }

        if columns.is_empty() {
            return Err(SprintLensError::InvalidInput(
                "board must declare at least one column".to_string(),
            ));
        }

        Ok(Self {
            start,
            end,
            columns,
        })
    }

    pub fn entry_column(&self) -> &str {
        self.columns.first().map_or("", String::as_str)
    }

    pub fn terminal_column(&self) -> &str {
        self.columns.last().map_or("", String::as_str)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Normalized status change with columns resolved through the board mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTransition {
    pub from_column: String,
    pub from_id: Option<String>,
    pub to_column: String,
    pub to_id: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    #[serde(flatten)]
    pub transition: StatusTransition,
    pub in_sprint: bool,
}

impl TimelineEvent {
    pub fn at(&self) -> DateTime<Utc> {
        self.transition.at
    }

    pub fn from_column(&self) -> &str {
        &self.transition.from_column
    }

    pub fn to_column(&self) -> &str {
        &self.transition.to_column
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct IssueFlags {
    pub is_blocked: bool,
    pub is_incident_response: bool,
    pub is_back_and_forth: bool,
    pub is_unplanned: bool,
    pub is_inherited: bool,
    pub is_spillover: bool,
    pub is_completed: bool,
    pub is_closed: bool,
}

impl IssueFlags {
    pub fn is_done(&self) -> bool {
        self.is_completed || self.is_closed
    }

    pub fn is_incident(&self) -> bool {
        self.is_incident_response && self.is_unplanned
    }
}

/// Fully processed issue as handed to the dashboard and summarizer.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub story_points: f64,
    pub category: String,
    pub transitions: Vec<StatusTransition>,
    pub sprint_timeline: SprintTimeline,
    pub work_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub flags: IssueFlags,
    pub cycle_time_days: Option<f64>,
    pub column_time: IndexMap<String, f64>,
}

/// Case-insensitive column name comparison.
pub fn same_column(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub fn column_in(column: &str, set: &[&str]) -> bool {
    set.iter().any(|candidate| same_column(column, candidate))
}
