//! Firing rules for recurring jobs.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// When a job becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Every `minutes`, on a grid anchored at scheduler start.
    Interval { minutes: u32 },
    /// At a local wall-clock `hour:minute`, every day or on one weekday.
    Cron {
        hour: u32,
        minute: u32,
        day_of_week: Option<Weekday>,
    },
}

impl Trigger {
    pub const fn every_minutes(minutes: u32) -> Self {
        Self::Interval { minutes }
    }

    pub const fn daily_at(hour: u32, minute: u32) -> Self {
        Self::Cron {
            hour,
            minute,
            day_of_week: None,
        }
    }

    pub const fn weekly_at(day: Weekday, hour: u32, minute: u32) -> Self {
        Self::Cron {
            hour,
            minute,
            day_of_week: Some(day),
        }
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        match *self {
            Self::Interval { minutes: 0 } => Err(SchedulerError::InvalidTrigger(
                "interval must be at least one minute".into(),
            )),
            Self::Cron { hour, .. } if hour > 23 => Err(SchedulerError::InvalidTrigger(format!(
                "hour {hour} is out of range"
            ))),
            Self::Cron { minute, .. } if minute > 59 => Err(SchedulerError::InvalidTrigger(
                format!("minute {minute} is out of range"),
            )),
            _ => Ok(()),
        }
    }

    /// First firing time strictly after `after`.
    ///
    /// Interval triggers count whole periods from `anchor`. Cron triggers skip
    /// local times that do not exist (DST gaps) and take the earlier instant
    /// for ambiguous ones.
    pub fn next_after<Tz: TimeZone>(
        &self,
        anchor: &DateTime<Tz>,
        after: &DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        match *self {
            Self::Interval { minutes } => {
                if minutes == 0 {
                    return None;
                }
                let period = Duration::minutes(i64::from(minutes));
                let elapsed = after.clone().signed_duration_since(anchor.clone());
                let periods = if elapsed < Duration::zero() {
                    1
                } else {
                    elapsed.num_seconds() / period.num_seconds() + 1
                };
                Some(anchor.clone() + period * i32::try_from(periods).ok()?)
            }
            Self::Cron {
                hour,
                minute,
                day_of_week,
            } => {
                let tz = after.timezone();
                let start = after.date_naive();
                (0..=8)
                    .filter_map(|offset| start.checked_add_signed(Duration::days(offset)))
                    .filter(|day| day_of_week.map_or(true, |wd| day.weekday() == wd))
                    .filter_map(|day| day.and_hms_opt(hour, minute, 0))
                    .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
                    .find(|candidate| candidate > after)
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval { minutes: 1 } => f.write_str("every minute"),
            Self::Interval { minutes } => write!(f, "every {minutes} minutes"),
            Self::Cron {
                hour,
                minute,
                day_of_week: None,
            } => write!(f, "daily at {hour:02}:{minute:02}"),
            Self::Cron {
                hour,
                minute,
                day_of_week: Some(day),
            } => write!(f, "{day} at {hour:02}:{minute:02}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn interval_stays_on_the_start_grid() {
        let anchor = at(2025, 3, 3, 10, 0, 30);
        let trigger = Trigger::every_minutes(5);

        assert_eq!(
            trigger.next_after(&anchor, &anchor),
            Some(at(2025, 3, 3, 10, 5, 30))
        );
        assert_eq!(
            trigger.next_after(&anchor, &at(2025, 3, 3, 10, 5, 30)),
            Some(at(2025, 3, 3, 10, 10, 30))
        );
        // a late dispatcher skips ahead instead of replaying missed slots
        assert_eq!(
            trigger.next_after(&anchor, &at(2025, 3, 3, 10, 17, 0)),
            Some(at(2025, 3, 3, 10, 20, 30))
        );
    }

    #[test]
    fn daily_cron_rolls_to_tomorrow_once_passed() {
        let trigger = Trigger::daily_at(3, 0);
        let anchor = at(2025, 3, 3, 0, 0, 0);

        assert_eq!(
            trigger.next_after(&anchor, &at(2025, 3, 3, 2, 59, 59)),
            Some(at(2025, 3, 3, 3, 0, 0))
        );
        assert_eq!(
            trigger.next_after(&anchor, &at(2025, 3, 3, 3, 0, 0)),
            Some(at(2025, 3, 4, 3, 0, 0))
        );
    }

    #[test]
    fn weekly_cron_waits_for_its_weekday() {
        // 2025-03-03 is a Monday
        let trigger = Trigger::weekly_at(Weekday::Sun, 4, 0);
        let anchor = at(2025, 3, 3, 0, 0, 0);

        assert_eq!(
            trigger.next_after(&anchor, &anchor),
            Some(at(2025, 3, 9, 4, 0, 0))
        );
        assert_eq!(
            trigger.next_after(&anchor, &at(2025, 3, 9, 4, 0, 1)),
            Some(at(2025, 3, 16, 4, 0, 0))
        );
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        assert!(Trigger::every_minutes(0).validate().is_err());
        assert!(Trigger::daily_at(24, 0).validate().is_err());
        assert!(Trigger::daily_at(3, 60).validate().is_err());
        assert!(Trigger::weekly_at(Weekday::Sun, 4, 0).validate().is_ok());
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(Trigger::every_minutes(1).to_string(), "every minute");
        assert_eq!(Trigger::daily_at(3, 0).to_string(), "daily at 03:00");
        assert_eq!(
            Trigger::weekly_at(Weekday::Sun, 4, 0).to_string(),
            "Sun at 04:00"
        );
    }
}
