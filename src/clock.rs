//! Fixed-offset local calendar.
//!
//! Every "today" and "now" in the service comes from a [`Clock`]. The date
//! component is part of the ledger's uniqueness key, so it must never be
//! derived from the host's timezone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::model::session::ScheduleDay;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock pinned to one UTC offset (UTC+7 for the school's site).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A single reading of the clock, split the way the attendance rules need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalInstant {
    pub date: NaiveDate,
    /// Second precision; sub-second parts are dropped.
    pub time: NaiveTime,
}

impl LocalInstant {
    pub fn read(clock: &dyn Clock) -> Self {
        let now = clock.now().naive_local();
        let time = now.time().with_nanosecond(0).unwrap_or(now.time());
        Self {
            date: now.date(),
            time,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn day(&self) -> ScheduleDay {
        ScheduleDay::of(self.date)
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        minutes_since_midnight(self.time)
    }
}

pub fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}


#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    struct UtcInstant(DateTime<Utc>);

    impl Clock for UtcInstant {
        fn now(&self) -> DateTime<FixedOffset> {
            self.0.with_timezone(&FixedOffset::east_opt(7 * 3600).unwrap())
        }
    }

    #[test]
    fn local_date_rolls_over_at_local_midnight() {
        // 17:30 UTC on a Sunday is already 00:30 Monday at UTC+7
        let clock = UtcInstant(Utc.with_ymd_and_hms(2025, 3, 2, 17, 30, 15).unwrap());
        let instant = LocalInstant::read(&clock);

        assert_eq!(instant.date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(instant.time, NaiveTime::from_hms_opt(0, 30, 15).unwrap());
        assert_eq!(instant.day(), ScheduleDay::Monday);
        assert_eq!(instant.minutes_since_midnight(), 30);
    }

    #[test]
    fn sub_second_precision_is_dropped() {
        let clock = UtcInstant(
            Utc.with_ymd_and_hms(2025, 3, 3, 1, 0, 0).unwrap()
                + chrono::Duration::milliseconds(750),
        );
        let instant = LocalInstant::read(&clock);
        assert_eq!(instant.time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }
}
