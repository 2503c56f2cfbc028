//! Period resolution: turns a user-selected window into the current
//! period and the same-length period immediately before it.

use crate::error::{AnalyticsError, AnalyticsResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}

/// Earliest date the ledger is ever queried from. Used as the open lower
/// bound for "any donation before X" style lookups.
pub fn ledger_floor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .map(start_of_day)
        .unwrap_or(NaiveDateTime::MIN)
}

/// Inclusive time range. Always `start <= end`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> AnalyticsResult<Self> {
        if start > end {
            return Err(AnalyticsError::invalid_period(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole calendar days from `from` to `to`, both inclusive.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> AnalyticsResult<Self> {
        Self::new(start_of_day(from), end_of_day(to))
    }

    pub fn calendar_month(year: i32, month: u32) -> AnalyticsResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AnalyticsError::invalid_period(format!("no such month {year}-{month:02}"))
        })?;
        let (ny, nm) = next_month(year, month);
        let next_first = NaiveDate::from_ymd_opt(ny, nm, 1).ok_or_else(|| {
            AnalyticsError::invalid_period(format!("no month after {year}-{month:02}"))
        })?;
        Self::new(start_of_day(first), start_of_day(next_first) - Duration::seconds(1))
    }

    pub fn calendar_year(year: i32) -> AnalyticsResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AnalyticsError::invalid_period(format!("no such year {year}")))?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| AnalyticsError::invalid_period(format!("no such year {year}")))?;
        Self::from_dates(first, last)
    }

    /// January 1st of `now`'s year up to `now`.
    pub fn year_to_date(now: NaiveDateTime) -> AnalyticsResult<Self> {
        let first = NaiveDate::from_ymd_opt(now.year(), 1, 1)
            .ok_or_else(|| AnalyticsError::invalid_period(format!("no such year {}", now.year())))?;
        Self::new(start_of_day(first), now)
    }

    /// Everything from the ledger floor up to, but excluding, `instant`.
    pub fn before(instant: NaiveDateTime) -> AnalyticsResult<Self> {
        Self::new(ledger_floor(), instant - Duration::seconds(1))
    }

    /// A gift dated `date` is placed at the first instant of that day.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        let at = start_of_day(date);
        self.start <= at && at <= self.end
    }

    /// Whole days between start and end.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The period of identical length ending the second before this one
    /// starts.
    pub fn previous(&self) -> AnalyticsResult<Self> {
        let start = self
            .start
            .checked_sub_signed(Duration::days(self.duration_days() + 1))
            .ok_or_else(|| AnalyticsError::invalid_period("previous period underflows"))?;
        Self::new(start, self.start - Duration::seconds(1))
    }

    /// Earliest calendar date whose gifts fall inside the period. Gifts dated
    /// before it are strictly earlier than `start`.
    pub fn first_date(&self) -> NaiveDate {
        let date = self.start.date();
        if self.start.time() == NaiveTime::MIN {
            date
        } else {
            date.succ_opt().unwrap_or(date)
        }
    }

    pub fn last_date(&self) -> NaiveDate {
        self.end.date()
    }
}

/// The (current, previous) pair every comparison runs over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeriodWindow {
    pub current: Period,
    pub previous: Period,
}

impl PeriodWindow {
    pub fn from_current(current: Period) -> AnalyticsResult<Self> {
        Ok(Self { previous: current.previous()?, current })
    }
}

/// Raw window selection as it arrives from the caller.
///
/// Explicit `from`/`to` win over `days` when both are given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeriodSelection {
    pub days: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl PeriodSelection {
    pub fn last_days(days: u32) -> Self {
        Self { days: Some(days), ..Self::default() }
    }

    pub fn between(from: &str, to: &str) -> Self {
        Self { days: None, from: Some(from.into()), to: Some(to.into()) }
    }

    pub fn resolve(&self, now: NaiveDateTime) -> AnalyticsResult<PeriodWindow> {
        let current = match (&self.from, &self.to) {
            (Some(from), Some(to)) => {
                let from = parse_date(from)?;
                let to = parse_date(to)?;
                if from > to {
                    return Err(AnalyticsError::invalid_period(format!(
                        "from {from} is after to {to}"
                    )));
                }
                Period::from_dates(from, to)?
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AnalyticsError::invalid_period(
                    "both from and to are required for an explicit range",
                ));
            }
            (None, None) => {
                let days = self.days.ok_or_else(|| {
                    AnalyticsError::invalid_period("either days or from/to must be given")
                })?;
                if days == 0 {
                    return Err(AnalyticsError::invalid_period("days must be > 0"));
                }
                let start = now
                    .checked_sub_signed(Duration::days(i64::from(days)))
                    .ok_or_else(|| AnalyticsError::invalid_period("relative window underflows"))?;
                Period::new(start, now)?
            }
        };
        PeriodWindow::from_current(current)
    }
}

pub fn parse_date(raw: &str) -> AnalyticsResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| AnalyticsError::invalid_period(format!("malformed date '{raw}': {e}")))
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 { (year + 1, 1) } else { (year, month + 1) }
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 { (year - 1, 12) } else { (year, month - 1) }
}
