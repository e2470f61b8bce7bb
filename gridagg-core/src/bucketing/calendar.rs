use super::TimeBucketing;
use crate::errors::GridAggResult;
use crate::time::{Calendar, Time};
use serde::{Deserialize, Serialize};

/// Buckets by calendar month in the dataset's zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBucketing {
    calendar: Calendar,
}

impl MonthlyBucketing {
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }
}

#[typetag::serde]
impl TimeBucketing for MonthlyBucketing {
    fn bucket_key(&mut self, time: Time) -> GridAggResult<Time> {
        self.calendar.start_of_month(time)
    }

    fn descriptor(&self) -> &'static str {
        "monthly"
    }
}

/// Buckets by calendar year in the dataset's zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualBucketing {
    calendar: Calendar,
}

impl AnnualBucketing {
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }
}

#[typetag::serde]
impl TimeBucketing for AnnualBucketing {
    fn bucket_key(&mut self, time: Time) -> GridAggResult<Time> {
        self.calendar.start_of_year(time)
    }

    fn descriptor(&self) -> &'static str {
        "annual"
    }
}
