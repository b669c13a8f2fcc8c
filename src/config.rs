use serde::{Deserialize, Serialize};

use crate::error::{Result, SprintLensError};

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// Working-hours model shared by cycle time, column time and DORA metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub workday_start_hour: u32,
    pub workday_end_hour: u32,
    /// Divisor for partial days. Deliberately smaller than the window span.
    pub effective_hours_per_day: u32,
    pub utc_offset_minutes: i32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            workday_start_hour: 6,
            workday_end_hour: 18,
            effective_hours_per_day: 8,
            utc_offset_minutes: 0,
        }
    }
}

/// Per-field overrides coming from CLI flags or the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalendarOverrides {
    pub workday_start_hour: Option<u32>,
    pub workday_end_hour: Option<u32>,
    pub effective_hours_per_day: Option<u32>,
    pub utc_offset_minutes: Option<i32>,
}

impl CalendarConfig {
    #[must_use]
    pub fn with_overrides(self, overrides: &CalendarOverrides) -> Self {
        Self {
            workday_start_hour: overrides
                .workday_start_hour
                .unwrap_or(self.workday_start_hour),
            workday_end_hour: overrides.workday_end_hour.unwrap_or(self.workday_end_hour),
            effective_hours_per_day: overrides
                .effective_hours_per_day
                .unwrap_or(self.effective_hours_per_day),
            utc_offset_minutes: overrides
                .utc_offset_minutes
                .unwrap_or(self.utc_offset_minutes),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workday_end_hour > 24 {
            return Err(SprintLensError::Config(format!(
                "workday end hour must be at most 24, got {}",
                self.workday_end_hour
            )));
        }

        if self.workday_start_hour >= self.workday_end_hour {
            return Err(SprintLensError::Config(format!(
                "workday start hour ({}) must be before end hour ({})",
                self.workday_start_hour, self.workday_end_hour
            )));
        }

        if self.effective_hours_per_day == 0 {
            return Err(SprintLensError::Config(
                "effective hours per day must be positive".to_string(),
            ));
        }

        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(SprintLensError::Config(format!(
                "UTC offset of {} minutes is out of range",
                self.utc_offset_minutes
            )));
        }

        Ok(())
    }
}
