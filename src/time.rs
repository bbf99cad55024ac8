//! Clock abstraction and fixed-offset local time arithmetic.
//!
//! All date-boundary decisions (gate checks, reminder scheduling, the
//! (user, date) record key) use one configured UTC offset rather than a
//! timezone database. The offset is injected everywhere a "local date"
//! is computed so tests can pin both the instant and the offset.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use cron::Schedule;

use crate::error::ConfigError;

/// Source of the current instant.
///
/// Injected into the agent and the scheduler so tests can drive the flow
/// with a fixed or manually advanced clock.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Convert an instant to the configured local offset.
pub fn to_local(now: DateTime<Utc>, utc_offset_hours: i8) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(i32::from(utc_offset_hours) * 3600)
        .expect("offset validated at config load");
    now.with_timezone(&offset)
}

/// The local calendar date for an instant under the configured offset.
///
/// This is the date component of the (user, date) record key.
pub fn local_date(now: DateTime<Utc>, utc_offset_hours: i8) -> NaiveDate {
    to_local(now, utc_offset_hours).date_naive()
}

/// The local time-of-day for an instant under the configured offset.
pub fn local_time(now: DateTime<Utc>, utc_offset_hours: i8) -> NaiveTime {
    to_local(now, utc_offset_hours).time()
}

/// Build the cron schedule that fires once a day at the cutoff time.
pub fn daily_schedule(cutoff: NaiveTime) -> Result<Schedule, ConfigError> {
    use chrono::Timelike;
    let expr = format!("0 {} {} * * *", cutoff.minute(), cutoff.hour());
    Schedule::from_str(&expr).map_err(|e| ConfigError::InvalidValue {
        key: "DAILY_CUTOFF".to_string(),
        message: format!("cannot build schedule: {e}"),
    })
}

/// The next instant (UTC) at which the daily cutoff occurs in local time.
pub fn next_cutoff(
    now: DateTime<Utc>,
    cutoff: NaiveTime,
    utc_offset_hours: i8,
) -> Result<DateTime<Utc>, ConfigError> {
    let schedule = daily_schedule(cutoff)?;
    let local_now = to_local(now, utc_offset_hours);
    let next = schedule
        .after(&local_now)
        .next()
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "DAILY_CUTOFF".to_string(),
            message: "schedule produced no upcoming occurrence".to_string(),
        })?;
    Ok(next.with_timezone(&Utc))
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_date_crosses_midnight_with_offset() {
        // 20:30 UTC on Jun 1 is 01:30 Jun 2 at UTC+5.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 20, 30, 0).unwrap();
        assert_eq!(
            local_date(now, 5),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
        assert_eq!(
            local_date(now, 0),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
    }

    #[test]
    fn local_time_applies_offset() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap();
        assert_eq!(
            local_time(now, 5),
            NaiveTime::from_hms_opt(21, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_cutoff_same_day_when_before() {
        // 10:00 local -> cutoff at 21:00 the same local day.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap(); // 10:00 at UTC+5
        let cutoff = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        let next = next_cutoff(now, cutoff, 5).unwrap();
        // 21:00 local == 16:00 UTC
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap());
    }

    #[test]
    fn next_cutoff_rolls_to_tomorrow_when_past() {
        // 22:00 local -> cutoff tomorrow.
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap(); // 22:00 at UTC+5
        let cutoff = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        let next = next_cutoff(now, cutoff, 5).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 2, 16, 0, 0).unwrap());
    }
}
