//! Date-window gating for academic periods. Comparisons happen at a fixed
//! midday instant so an offset carried by the source timestamp cannot move
//! a date across a day boundary.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::model::AcademicPeriod;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("date {date} is outside {label} ({start}..={end})")]
pub struct GateViolation {
    pub date: NaiveDate,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn midday(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).expect("fixed time of day"))
}

/// Inclusive on both ends. A missing period is fail-open: with nothing to
/// gate against, every date is allowed rather than the view going dark.
pub fn is_date_allowed(date: NaiveDate, period: Option<&AcademicPeriod>) -> bool {
    let Some(period) = period else {
        return true;
    };
    let d = midday(date);
    d >= midday(period.start_date) && d <= midday(period.end_date)
}

/// Out-of-window selections reset to the period start, e.g. after the user
/// switches to a period that does not contain the previously selected day.
pub fn clamp_to_period(date: NaiveDate, period: &AcademicPeriod) -> NaiveDate {
    if is_date_allowed(date, Some(period)) {
        date
    } else {
        period.start_date
    }
}

pub fn check_in_window(date: NaiveDate, period: &AcademicPeriod) -> Result<(), GateViolation> {
    if is_date_allowed(date, Some(period)) {
        Ok(())
    } else {
        Err(GateViolation {
            date,
            label: period.label(),
            start: period.start_date,
            end: period.end_date,
        })
    }
}

/// Accepts both the plain `YYYY-MM-DD` the host usually sends and a full
/// RFC 3339 timestamp; timestamps are reduced to their calendar date at
/// midday rather than shifted through UTC.
pub fn parse_ui_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(d) = raw.parse::<NaiveDate>() {
        return Some(d);
    }
    raw.parse::<DateTime<FixedOffset>>().ok().map(|ts| ts.date_naive())
}
