use super::TimeBucketing;
use crate::errors::GridAggResult;
use crate::time::{Calendar, Time};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Every distinct timestamp is its own bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoBucketing {}

impl NoBucketing {
    pub fn new() -> Self {
        Self {}
    }
}

#[typetag::serde]
impl TimeBucketing for NoBucketing {
    fn bucket_key(&mut self, time: Time) -> GridAggResult<Time> {
        Ok(time)
    }

    fn descriptor(&self) -> &'static str {
        "none"
    }
}

/// Buckets by calendar day.
///
/// Timestamps are day fractions so truncating the fractional part gives midnight
/// of the same day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyBucketing {}

impl DailyBucketing {
    pub fn new() -> Self {
        Self {}
    }
}

#[typetag::serde]
impl TimeBucketing for DailyBucketing {
    fn bucket_key(&mut self, time: Time) -> GridAggResult<Time> {
        Ok(time.floor())
    }

    fn descriptor(&self) -> &'static str {
        "daily"
    }
}

fn default_anchor() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1990, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Collapses the whole run into a single bucket.
///
/// The key is a fixed historical anchor (1990-01-01 by default) rather than anything
/// derived from the input. It is converted through the calendar on first use and then
/// reused for every timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllBucketing {
    calendar: Calendar,
    #[serde(default = "default_anchor")]
    anchor: NaiveDateTime,
    #[serde(skip)]
    key: Option<Time>,
}

impl AllBucketing {
    pub fn new(calendar: Calendar) -> Self {
        Self::with_anchor(calendar, default_anchor())
    }

    /// Use a different anchor, for dataset families whose records start after 1990
    pub fn with_anchor(calendar: Calendar, anchor: NaiveDateTime) -> Self {
        Self {
            calendar,
            anchor,
            key: None,
        }
    }
}

#[typetag::serde]
impl TimeBucketing for AllBucketing {
    fn bucket_key(&mut self, _time: Time) -> GridAggResult<Time> {
        match self.key {
            Some(key) => Ok(key),
            None => {
                let key = self.calendar.from_local(self.anchor)?;
                self.key = Some(key);
                Ok(key)
            }
        }
    }

    fn descriptor(&self) -> &'static str {
        "all"
    }
}
