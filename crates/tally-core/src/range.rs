//! # Date Ranges
//!
//! Resolves the `from`/`to` query parameters of the report endpoints into a
//! concrete UTC window plus the time zone used for calendar-day boundaries.
//!
//! - `from` absent or unparseable: first day of the current month, local midnight
//! - `to` absent or unparseable: now
//! - RFC 3339 timestamps are taken as-is; a bare `YYYY-MM-DD` means the start
//!   of that local day for `from` and its last millisecond for `to`
//! - a window longer than [`MAX_RANGE_DAYS`] keeps its `to` and has `from`
//!   pulled forward to fit

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Longest window a report covers, about five years of daily points.
pub const MAX_RANGE_DAYS: i64 = 1_830;

/// A closed `[from, to]` window with the zone its days are counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub tz: Tz,
}

impl DateRange {
    /// Resolves raw query values. `now` is supplied by the caller.
    pub fn resolve(from: Option<&str>, to: Option<&str>, tz: Tz, now: DateTime<Utc>) -> Self {
        let from = from
            .and_then(|raw| parse_bound(raw, tz, Bound::Start))
            .unwrap_or_else(|| start_of_month(now, tz));
        let to = to
            .and_then(|raw| parse_bound(raw, tz, Bound::End))
            .unwrap_or(now);
        let earliest = to.checked_sub_signed(Duration::days(MAX_RANGE_DAYS));
        let from = match earliest {
            Some(earliest) if from < earliest => earliest,
            _ => from,
        };
        DateRange { from, to, tz }
    }

    /// Calendar date of `ts` in this range's zone.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    /// Every local calendar day touched by the range, inclusive at both ends.
    ///
    /// Empty when `from > to`. A hand-built range wider than
    /// [`MAX_RANGE_DAYS`] yields only its first `MAX_RANGE_DAYS + 1` days.
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = self.local_date(self.from);
        let last = self.local_date(self.to);
        first
            .iter_days()
            .take_while(|d| *d <= last)
            .take(MAX_RANGE_DAYS as usize + 1)
            .collect()
    }

    /// Whether `ts` falls inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts <= self.to
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(raw: &str, tz: Tz, bound: Bound) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(match bound {
        Bound::Start => start_of_day(date, tz),
        Bound::End => {
            let next = date.succ_opt()?;
            start_of_day(next, tz) - Duration::milliseconds(1)
        }
    })
}

/// Local midnight of `date` as a UTC instant.
///
/// On days where midnight does not exist (DST gaps) the earliest valid local
/// time after the gap is used.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            let shifted = midnight + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
        }
    }
}

/// Local midnight of the first day of `now`'s month.
pub fn start_of_month(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    let first = today.with_day(1).unwrap_or(today);
    start_of_day(first, tz)
}

/// Local midnight of the day containing `now`.
pub fn start_of_today(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_day(now.with_timezone(&tz).date_naive(), tz)
}
