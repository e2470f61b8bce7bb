//! Time values and calendar conversion
//!
//! Gridded model output stores time as fractional days since a dataset epoch
//! (the CF convention `days since 1970-01-01 00:00:00`). Bucketing by month, year or
//! season needs to move between that representation and calendar dates in the
//! dataset's time zone, which is what [`Calendar`] provides.
//!
//! # Examples
//!
//! ```rust
//! use gridagg_core::time::Calendar;
//!
//! let calendar = Calendar::from_units("days since 1970-01-01", chrono_tz::UTC).unwrap();
//! // 1970-02-15 12:00 is 45.5 days after the epoch
//! assert_eq!(calendar.start_of_month(45.5).unwrap(), 31.0);
//! assert_eq!(calendar.start_of_year(45.5).unwrap(), 0.0);
//! ```

use crate::errors::{GridAggError, GridAggResult};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Floating point type used for all cell values.
pub type FloatValue = f64;

/// A timestamp in fractional days since the dataset epoch.
pub type Time = f64;

const MILLIS_PER_DAY: FloatValue = 86_400_000.0;

/// Longest wall-clock gap searched past a skipped local time
const MAX_GAP_MINUTES: u32 = 24 * 60;

fn default_zone() -> Tz {
    chrono_tz::UTC
}

/// Conversion between dataset timestamps and calendar dates.
///
/// The epoch is an instant in UTC. Calendar boundaries (the first of a month, the
/// start of a season) are resolved in `zone`, so a dataset declared in
/// `Australia/Sydney` starts its months at local midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    epoch: NaiveDateTime,
    #[serde(default = "default_zone")]
    zone: Tz,
}

impl Calendar {
    pub fn new(epoch: NaiveDateTime, zone: Tz) -> Self {
        Self { epoch, zone }
    }

    /// Calendar with boundaries resolved in UTC
    pub fn utc(epoch: NaiveDateTime) -> Self {
        Self::new(epoch, chrono_tz::UTC)
    }

    /// Parse a CF-style units string such as `days since 1900-01-01 00:00:00`.
    ///
    /// Only `days` are supported because daily bucketing truncates day fractions.
    pub fn from_units(units: &str, zone: Tz) -> GridAggResult<Self> {
        let invalid = || GridAggError::InvalidTimeUnits(units.to_string());

        let (unit, reference) = units.trim().split_once(" since ").ok_or_else(invalid)?;
        if !matches!(unit.trim().to_lowercase().as_str(), "days" | "day") {
            return Err(invalid());
        }

        let reference = reference.trim();
        let epoch = NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| {
                NaiveDate::parse_from_str(reference, "%Y-%m-%d")
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
            .map_err(|_| invalid())?;

        Ok(Self::new(epoch, zone))
    }

    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Convert a dataset timestamp into a zoned date time.
    ///
    /// Times are resolved to the nearest millisecond.
    pub fn to_datetime(&self, time: Time) -> GridAggResult<DateTime<Tz>> {
        if !time.is_finite() {
            return Err(GridAggError::CalendarConversion(format!(
                "time {} is not finite",
                time
            )));
        }

        let offset = TimeDelta::try_milliseconds((time * MILLIS_PER_DAY).round() as i64)
            .ok_or_else(|| {
                GridAggError::CalendarConversion(format!("time {} is out of range", time))
            })?;

        Utc.from_utc_datetime(&self.epoch)
            .checked_add_signed(offset)
            .map(|instant| instant.with_timezone(&self.zone))
            .ok_or_else(|| {
                GridAggError::CalendarConversion(format!("time {} is out of range", time))
            })
    }

    /// Convert any zoned date time into a dataset timestamp.
    pub fn to_time<Z: TimeZone>(&self, datetime: &DateTime<Z>) -> Time {
        let delta = datetime.naive_utc() - self.epoch;
        delta.num_milliseconds() as FloatValue / MILLIS_PER_DAY
    }

    /// Convert a wall-clock time in the calendar zone into a dataset timestamp.
    ///
    /// Ambiguous local times resolve to the earlier instant. A local time skipped by
    /// a daylight saving transition resolves to the first instant after the gap.
    pub fn from_local(&self, local: NaiveDateTime) -> GridAggResult<Time> {
        let unresolved = || {
            GridAggError::CalendarConversion(format!(
                "{} does not exist in zone {}",
                local, self.zone
            ))
        };

        let mut candidate = local;
        for _ in 0..=MAX_GAP_MINUTES {
            if let Some(instant) = self.zone.from_local_datetime(&candidate).earliest() {
                return Ok(self.to_time(&instant));
            }
            candidate = candidate
                .checked_add_signed(TimeDelta::minutes(1))
                .ok_or_else(unresolved)?;
        }
        Err(unresolved())
    }

    /// Calendar year of a timestamp in the calendar zone
    pub fn year_of(&self, time: Time) -> GridAggResult<i32> {
        Ok(self.to_datetime(time)?.year())
    }

    /// First instant of the month containing `time`
    pub fn start_of_month(&self, time: Time) -> GridAggResult<Time> {
        let local = self.to_datetime(time)?.naive_local();
        self.midnight(local.year(), local.month(), 1)
    }

    /// First instant of the year containing `time`
    pub fn start_of_year(&self, time: Time) -> GridAggResult<Time> {
        let local = self.to_datetime(time)?.naive_local();
        self.midnight(local.year(), 1, 1)
    }

    /// Timestamp of local midnight on the given date
    pub fn midnight(&self, year: i32, month: u32, day: u32) -> GridAggResult<Time> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            GridAggError::CalendarConversion(format!(
                "{:04}-{:02}-{:02} is not a valid date",
                year, month, day
            ))
        })?;
        self.from_local(date.and_time(NaiveTime::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn unix() -> Calendar {
        Calendar::from_units("days since 1970-01-01 00:00:00", chrono_tz::UTC).unwrap()
    }

    #[test]
    fn parse_units() {
        let calendar = Calendar::from_units("days since 1900-01-01", chrono_tz::UTC).unwrap();
        assert_eq!(
            calendar.epoch(),
            NaiveDate::from_ymd_opt(1900, 1, 1)
                .unwrap()
                .and_time(NaiveTime::MIN)
        );

        let calendar =
            Calendar::from_units("days since 2000-01-01T12:00:00", chrono_tz::UTC).unwrap();
        assert_eq!(calendar.epoch().time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn parse_units_rejects_other_units() {
        let result = Calendar::from_units("hours since 1970-01-01", chrono_tz::UTC);
        assert_eq!(
            result,
            Err(GridAggError::InvalidTimeUnits(
                "hours since 1970-01-01".to_string()
            ))
        );
        assert!(Calendar::from_units("days after 1970-01-01", chrono_tz::UTC).is_err());
        assert!(Calendar::from_units("days since yesterday", chrono_tz::UTC).is_err());
    }

    #[test]
    fn round_trip() {
        let calendar = unix();
        let datetime = calendar.to_datetime(10957.25).unwrap();
        assert_eq!(datetime.year(), 2000);
        assert_eq!(datetime.naive_local().time(), NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(calendar.to_time(&datetime), 10957.25);
    }

    #[test]
    fn month_and_year_starts() {
        let calendar = unix();
        // 2000-03-15 is day 11031
        assert_eq!(calendar.start_of_month(11031.5).unwrap(), 11017.0);
        assert_eq!(calendar.start_of_year(11031.5).unwrap(), 10957.0);
        assert_eq!(calendar.year_of(11031.5).unwrap(), 2000);
    }

    #[test]
    fn zoned_month_start() {
        let calendar = Calendar::new(unix().epoch(), chrono_tz::Australia::Sydney);
        // 2000-01-31T14:00Z is already 1 February in Sydney (UTC+11)
        let time = 10957.0 + 30.0 + 14.0 / 24.0;
        let start = calendar.start_of_month(time).unwrap();
        // Local midnight on 1 February is 13:00Z on 31 January
        assert!(is_close!(start, 10957.0 + 30.0 + 13.0 / 24.0));
    }

    #[test]
    fn non_finite_times_fail() {
        assert!(matches!(
            unix().to_datetime(f64::NAN),
            Err(GridAggError::CalendarConversion(_))
        ));
    }

    #[test]
    fn skipped_midnight_moves_past_gap() {
        // Clocks in Sao Paulo jumped from 00:00 to 01:00 on 2018-11-04
        let calendar = Calendar::new(unix().epoch(), chrono_tz::America::Sao_Paulo);
        // 01:00 local is 03:00Z
        let expected = 17836.0 + 3.0 + 3.0 / 24.0;
        assert!(is_close!(calendar.midnight(2018, 11, 4).unwrap(), expected));

        let inside = NaiveDate::from_ymd_opt(2018, 11, 4)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap();
        assert!(is_close!(calendar.from_local(inside).unwrap(), expected));
    }

    #[test]
    fn invalid_dates_fail() {
        assert!(unix().midnight(2001, 2, 29).is_err());
        assert!(unix().midnight(2000, 2, 29).is_ok());
    }
}
