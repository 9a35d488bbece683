//! Inclusive calendar-date ranges used by period locks, listings and exports.

use std::fmt;

use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Date, Timestamp};

/// Longest range accepted for a listing or export request, in days.
pub const MAX_QUERY_RANGE_DAYS: i64 = 366;

/// An inclusive `start..=end` range of UTC calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: Date,
    pub end: Date,
}

impl PeriodRange {
    /// Build a range, rejecting `end < start` and an `end` with no following
    /// calendar day.
    pub fn new(start: Date, end: Date) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::Validation(format!(
                "Period end ({end}) must not precede period start ({start})"
            )));
        }
        if end.checked_add_days(Days::new(1)).is_none() {
            return Err(CoreError::Validation(format!(
                "Period end ({end}) is out of range"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range for a listing/export query, additionally capping its length.
    pub fn for_query(start: Date, end: Date) -> Result<Self, CoreError> {
        let range = Self::new(start, end)?;
        if range.days() > MAX_QUERY_RANGE_DAYS {
            return Err(CoreError::Validation(format!(
                "Requested range spans {} days; at most {MAX_QUERY_RANGE_DAYS} allowed",
                range.days()
            )));
        }
        Ok(range)
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &PeriodRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Half-open timestamp bounds `[start 00:00Z, end+1 00:00Z)`.
    ///
    /// Saturates at the last representable instant for a range built
    /// without [`PeriodRange::new`].
    pub fn timestamp_bounds(&self) -> (Timestamp, Timestamp) {
        let from = self.start.and_time(NaiveTime::MIN).and_utc();
        let to = self
            .end
            .checked_add_days(Days::new(1))
            .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN))
            .and_utc();
        (from, to)
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
