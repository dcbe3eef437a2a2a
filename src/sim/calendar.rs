use std::ops::Range;

use crate::series::steps_per_day;

/// Days per calendar month of the simulated (non-leap) year.
pub const DAYS_PER_MONTH: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Maps step indices onto months and hours of the day.
///
/// The year starts at 1 January 00:00 and February always has 28 days.
/// Steps past the end of day 365 count as December.
///
/// # Examples
///
/// ```
/// use battery_roi::sim::calendar::Calendar;
///
/// let cal = Calendar::new(1.0);
/// assert_eq!(cal.month_of(0), 0);
/// assert_eq!(cal.month_of(31 * 24), 1);
/// assert_eq!(cal.hour_of_day(30), 6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    dt_hours: f64,
    steps_per_day: usize,
    /// First step of the following month, per month.
    month_end: [usize; 12],
}

impl Calendar {
    /// Creates a calendar for an interval of `dt_hours`.
    pub fn new(dt_hours: f64) -> Self {
        let steps_per_day = steps_per_day(dt_hours);
        let mut month_end = [0; 12];
        let mut acc = 0;
        for (m, days) in DAYS_PER_MONTH.iter().enumerate() {
            acc += days * steps_per_day;
            month_end[m] = acc;
        }
        Self {
            dt_hours,
            steps_per_day,
            month_end,
        }
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day
    }

    /// Zero-based month (0 = January) of step `t`.
    pub fn month_of(&self, t: usize) -> usize {
        self.month_end
            .iter()
            .position(|&end| t < end)
            .unwrap_or(11)
    }

    /// Whole hour of the day (0..24) at the start of step `t`.
    pub fn hour_of_day(&self, t: usize) -> usize {
        let hours = (t % self.steps_per_day) as f64 * self.dt_hours;
        (hours.floor() as usize).min(23)
    }

    /// Step ranges of each month, clipped to a series of `len` steps.
    ///
    /// Months that start after the series ends get an empty range; the
    /// December range absorbs any steps past day 365.
    pub fn month_ranges(&self, len: usize) -> [Range<usize>; 12] {
        std::array::from_fn(|m| {
            let start = if m == 0 { 0 } else { self.month_end[m - 1] };
            let end = if m == 11 { len } else { self.month_end[m] };
            start.min(len)..end.min(len).max(start.min(len))
        })
    }

    /// Month index of every step in a series of `len` steps.
    pub fn month_index(&self, len: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(len);
        for (m, range) in self.month_ranges(len).into_iter().enumerate() {
            out.extend(std::iter::repeat_n(m, range.len()));
        }
        out
    }
}
