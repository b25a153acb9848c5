//! Conversion between clock encoding and elapsed planning minutes.
//!
//! Order windows and answer timestamps use a compact clock encoding where the
//! hundreds digit(s) hold the hour and the remainder holds the minute
//! (`1145` = 11:45). The planner works in minutes elapsed since an epoch.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Epoch of the planning horizon, in minutes since midnight.
///
/// The default origin is 10:30, so `1100` maps to minute 30.
///
/// # Examples
///
/// ```
/// use u_pdptw::clock::ClockEpoch;
///
/// let epoch = ClockEpoch::default();
/// assert_eq!(epoch.to_minutes(1100).unwrap(), 30);
/// assert_eq!(epoch.to_clock(30).unwrap(), 1100);
/// assert_eq!(epoch.to_minutes(1030).unwrap(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEpoch {
    origin_minutes: i64,
}

impl ClockEpoch {
    /// Creates an epoch at the given minute of the day.
    pub fn new(origin_minutes: i64) -> Self {
        Self { origin_minutes }
    }

    /// Minute of the day the horizon starts at.
    pub fn origin_minutes(&self) -> i64 {
        self.origin_minutes
    }

    /// Converts a clock value to minutes elapsed since the epoch.
    ///
    /// Fails if the value is negative or its minute part is 60 or more.
    pub fn to_minutes(&self, clock: i64) -> Result<i64> {
        if clock < 0 || clock % 100 >= 60 {
            return Err(PlanError::Configuration(format!(
                "invalid clock value {clock}"
            )));
        }
        Ok(clock / 100 * 60 + clock % 100 - self.origin_minutes)
    }

    /// Converts minutes elapsed since the epoch back to a clock value.
    ///
    /// Fails if the minute falls before midnight.
    pub fn to_clock(&self, minute: i64) -> Result<i64> {
        let of_day = minute + self.origin_minutes;
        if of_day < 0 {
            return Err(PlanError::Configuration(format!(
                "minute {minute} precedes midnight"
            )));
        }
        Ok(of_day / 60 * 100 + of_day % 60)
    }
}

impl Default for ClockEpoch {
    fn default() -> Self {
        Self::new(10 * 60 + 30)
    }
}
