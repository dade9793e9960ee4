//! Splits a date range into consecutive provider-sized query windows.
//!
//! The aWhere observation endpoints return at most [`QUERY_MAX`] days per call,
//! so a long range is cut into windows of at most that many days. A
//! [`DateWindower`] is cheap to copy and can be iterated any number of times;
//! each iteration yields the same windows in chronological order.

use crate::batch::error::BatchError;
use chrono::{Days, NaiveDate};
use std::fmt;

/// Maximum number of days the provider returns for a single observations call.
pub const QUERY_MAX: u32 = 120;

/// Date format used in every URL and file name (`YYYY-MM-DD`).
pub const AWHERE_DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive range of days, `start <= end`.
///
/// Only produced by [`DateWindower`], which guarantees the range spans at most
/// `max_days` days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{}",
            self.start.format(AWHERE_DATE_FORMAT),
            self.end.format(AWHERE_DATE_FORMAT)
        )
    }
}

/// A validated `[start, end]` range plus the window size used to split it.
///
/// Iterate with [`DateWindower::iter`] or by reference in a `for` loop.
///
/// # Examples
///
/// ```
/// use awhere::window;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2020, 5, 10).unwrap();
/// let windows: Vec<_> = window(start, end, 120).unwrap().iter().collect();
/// assert_eq!(windows.len(), 2);
/// assert_eq!(windows[0].end(), NaiveDate::from_ymd_opt(2020, 4, 29).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindower {
    start: NaiveDate,
    end: NaiveDate,
    max_days: u32,
}

impl DateWindower {
    pub fn iter(&self) -> DateWindows {
        DateWindows {
            next_start: Some(self.start),
            end: self.end,
            max_days: self.max_days,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl<'a> IntoIterator for &'a DateWindower {
    type Item = DateWindow;
    type IntoIter = DateWindows;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the windows of a [`DateWindower`].
#[derive(Debug, Clone)]
pub struct DateWindows {
    next_start: Option<NaiveDate>,
    end: NaiveDate,
    max_days: u32,
}

impl Iterator for DateWindows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start.filter(|start| *start <= self.end)?;
        // max_days - 1 because the start day itself counts.
        let window_end = start
            .checked_add_days(Days::new(u64::from(self.max_days - 1)))
            .map_or(self.end, |candidate| candidate.min(self.end));
        self.next_start = window_end.succ_opt();
        Some(DateWindow {
            start,
            end: window_end,
        })
    }
}

/// Validates `[start_date, end_date]` and returns a windower producing windows
/// of at most `max_days` days.
///
/// # Errors
///
/// Returns [`BatchError::InvalidRange`] if `start_date > end_date` and
/// [`BatchError::InvalidWindowSize`] if `max_days` is zero.
pub fn window(
    start_date: NaiveDate,
    end_date: NaiveDate,
    max_days: u32,
) -> Result<DateWindower, BatchError> {
    if start_date > end_date {
        return Err(BatchError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }
    if max_days == 0 {
        return Err(BatchError::InvalidWindowSize);
    }
    Ok(DateWindower {
        start: start_date,
        end: end_date,
        max_days,
    })
}
