use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use libris_core::config::RemindersConfig;

use crate::error::{Result, SchedulerError};

/// Fire once a day at a wall-clock time in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    pub fn new(hour: u8, minute: u8, offset: FixedOffset) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0).ok_or_else(|| {
            SchedulerError::InvalidSchedule(format!("{hour:02}:{minute:02} is not a time of day"))
        })?;
        Ok(Self { at, offset })
    }

    pub fn from_config(config: &RemindersConfig) -> Result<Self> {
        let offset = config
            .offset()
            .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;
        Self::new(config.hour, config.minute, offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The first fire time strictly after `from`.
    pub fn next_fire_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = from.with_timezone(&self.offset).date_naive();
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        let candidate = Utc.from_utc_datetime(&(local_date.and_time(self.at) - shift));

        if candidate > from {
            candidate
        } else {
            candidate + Duration::days(1)
        }
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "daily at {} {}", self.at.format("%H:%M"), self.offset)
    }
}
