use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    Utc, Weekday,
};

use crate::config::CalendarConfig;
use crate::error::{Result, SprintLensError};

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Business-time calculator over a fixed daily working window.
///
/// Weekends contribute nothing. A weekday whose overlap covers the whole
/// window counts as exactly one day; any partial overlap is divided by the
/// effective day length, which is shorter than the window. A six-hour
/// overlap in the default 06:00-18:00 window is therefore 0.75 days.
#[derive(Debug, Clone, Copy)]
pub struct BusinessCalendar {
    start_hour: u32,
    end_hour: u32,
    effective_hours: u32,
    offset: FixedOffset,
}

impl BusinessCalendar {
    pub fn from_config(config: &CalendarConfig) -> Result<Self> {
        config.validate()?;

        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            SprintLensError::Config(format!(
                "invalid UTC offset: {} minutes",
                config.utc_offset_minutes
            ))
        })?;

        Ok(Self {
            start_hour: config.workday_start_hour,
            end_hour: config.workday_end_hour,
            effective_hours: config.effective_hours_per_day,
            offset,
        })
    }

    pub fn elapsed_business_days(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
        let end = self.local(to);
        let mut current = self.local(from);
        let mut total = 0.0;

        while current < end {
            let date = current.date();

            if let Some(skip) = days_until_monday(date.weekday()) {
                current = self.window_start(date + Days::new(skip));
                continue;
            }

            let overlap_start = current.max(self.window_start(date));
            let overlap_end = end.min(self.window_end(date));

            if overlap_end > overlap_start {
                let overlap_ms = (overlap_end - overlap_start).num_milliseconds();

                #[allow(clippy::cast_precision_loss)]
                let days = if overlap_ms == self.window_ms() {
                    1.0
                } else {
                    overlap_ms as f64 / self.effective_ms() as f64
                };
                total += days;
            }

            current = self.window_start(date + Days::new(1));
        }

        total
    }

    /// Converts business days to seconds using the effective day length.
    pub fn days_to_seconds(&self, days: f64) -> f64 {
        days * f64::from(self.effective_hours) * 3600.0
    }

    fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.offset).naive_local()
    }

    fn window_start(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.start_hour))
    }

    fn window_end(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.end_hour))
    }

    fn window_ms(&self) -> i64 {
        i64::from(self.end_hour - self.start_hour) * MS_PER_HOUR
    }

    fn effective_ms(&self) -> i64 {
        i64::from(self.effective_hours) * MS_PER_HOUR
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        let config = CalendarConfig::default();
        Self {
            start_hour: config.workday_start_hour,
            end_hour: config.workday_end_hour,
            effective_hours: config.effective_hours_per_day,
            offset: Utc.fix(),
        }
    }
}

fn days_until_monday(weekday: Weekday) -> Option<u64> {
    match weekday {
        Weekday::Sat => Some(2),
        Weekday::Sun => Some(1),
        _ => None,
    }
}
