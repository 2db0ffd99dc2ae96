//! Calendar boundaries: weeks start Monday 00:00 UTC, months are
//! UTC calendar months.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub fn week_length() -> Duration {
    Duration::days(7)
}

/// Start (inclusive) of the week containing `now`.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let offset = i64::from(date.weekday().num_days_from_monday());
    let monday = date - Duration::days(offset);
    Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
}

/// End (exclusive) of the week containing `now`.
pub fn week_end(now: DateTime<Utc>) -> DateTime<Utc> {
    week_start(now) + week_length()
}

/// Number of whole weeks between two week starts. Negative if `to` precedes `from`.
pub fn weeks_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (week_start(to) - week_start(from)).num_days().div_euclid(7)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year:  i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(now: DateTime<Utc>) -> Self {
        Self { year: now.year(), month: now.month() }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
