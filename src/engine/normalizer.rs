use log::warn;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{RawChangeEvent, StatusTransition};
use crate::timestamp;

const STATUS_FIELD: &str = "status";

/// A change-log entry that could not be turned into a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedEntry {
    pub issue_key: String,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub transitions: Vec<StatusTransition>,
    pub dropped: Vec<DroppedEntry>,
}

pub fn normalize_changelog(
    issue_key: &str,
    changelog: &[RawChangeEvent],
    status_map: &HashMap<String, String>,
) -> Normalized {
    let mut normalized = Normalized::default();

    for (index, entry) in changelog.iter().enumerate() {
        match to_transition(entry, status_map) {
            Ok(Some(transition)) => normalized.transitions.push(transition),
            Ok(None) => {}
            Err(reason) => {
                warn!("Dropping change-log entry {index} of {issue_key}: {reason}");
                normalized.dropped.push(DroppedEntry {
                    issue_key: issue_key.to_string(),
                    index,
                    reason,
                });
            }
        }
    }

    // Stable: same-timestamp changes keep their logged order.
    normalized.transitions.sort_by_key(|t| t.at);
    normalized
}

fn to_transition(
    entry: &RawChangeEvent,
    status_map: &HashMap<String, String>,
) -> Result<Option<StatusTransition>, String> {
    let Some(field) = entry.field.as_deref() else {
        return Err("missing changed field".to_string());
    };

    if !field.trim().eq_ignore_ascii_case(STATUS_FIELD) {
        return Ok(None);
    }

    let raw_at = entry
        .occurred_at
        .as_deref()
        .ok_or_else(|| "missing timestamp".to_string())?;
    let at = timestamp::parse(raw_at).ok_or_else(|| format!("unparseable timestamp '{raw_at}'"))?;

    Ok(Some(StatusTransition {
        from_column: resolve_column(entry.from_id.as_deref(), entry.from_label.as_deref(), status_map),
        from_id: entry.from_id.clone(),
        to_column: resolve_column(entry.to_id.as_deref(), entry.to_label.as_deref(), status_map),
        to_id: entry.to_id.clone(),
        at,
    }))
}

fn resolve_column(
    id: Option<&str>,
    label: Option<&str>,
    status_map: &HashMap<String, String>,
) -> String {
    id.and_then(|id| status_map.get(id))
        .map(String::as_str)
        .or(label)
        .unwrap_or_default()
        .to_string()
}
