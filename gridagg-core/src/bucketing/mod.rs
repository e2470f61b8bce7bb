//! Temporal bucketing
//!
//! A bucketing strategy maps a raw timestamp to the canonical start of the
//! aggregation period it belongs to (its bucket key). Strategies are tagged trait
//! objects so that a run configuration can name its period:
//!
//! ```toml
//! period = "MonthlyBucketing"
//! calendar = { epoch = "1970-01-01T00:00:00", zone = "UTC" }
//! ```
//!
//! Bucket keys use the same units as the input timestamps.

mod calendar;
mod seasonal;
mod simple;

pub use calendar::{AnnualBucketing, MonthlyBucketing};
pub use seasonal::{Season, SeasonalBucketing};
pub use simple::{AllBucketing, DailyBucketing, NoBucketing};

use crate::errors::GridAggResult;
use crate::time::Time;
use log::{debug, warn};
use serde::Serialize;

/// Strategy for mapping timestamps onto aggregation periods.
///
/// Implementations may cache calendar state between calls, which is why the key
/// lookup takes `&mut self`. Each strategy instance belongs to a single aggregator.
#[typetag::serde(tag = "period")]
pub trait TimeBucketing: std::fmt::Debug + Send + Sync {
    /// Canonical start timestamp of the period containing `time`
    fn bucket_key(&mut self, time: Time) -> GridAggResult<Time>;

    /// Short name of the period type, e.g. `"monthly"`
    fn descriptor(&self) -> &'static str;

    /// Group timestamps by bucket key.
    ///
    /// At most `min(times.len(), max_expected)` timestamps are considered, in input
    /// order. An input file can hold more slices than the current output period
    /// should claim and the remainder belongs to a later run.
    fn build_bucketing(
        &mut self,
        times: &[Time],
        max_expected: usize,
    ) -> GridAggResult<BucketedTimes> {
        let limit = times.len().min(max_expected);
        if limit < times.len() {
            warn!(
                "{} bucketing considers {} of {} timestamps",
                self.descriptor(),
                limit,
                times.len()
            );
        }

        let mut bucketed = BucketedTimes::new();
        for &time in &times[..limit] {
            let key = self.bucket_key(time)?;
            bucketed.insert(key, time);
        }

        debug!(
            "{} bucketing grouped {} timestamps into {} buckets",
            self.descriptor(),
            limit,
            bucketed.len()
        );
        Ok(bucketed)
    }
}

/// The raw timestamps falling into one aggregation period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub key: Time,
    pub times: Vec<Time>,
}

/// Timestamps grouped by bucket key.
///
/// Buckets are ordered ascending by key. Within a bucket, timestamps keep their
/// insertion order and duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketedTimes {
    buckets: Vec<TimeBucket>,
}

impl BucketedTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `time` to the bucket identified by `key`, creating the bucket if needed.
    pub fn insert(&mut self, key: Time, time: Time) {
        match self
            .buckets
            .binary_search_by(|bucket| bucket.key.total_cmp(&key))
        {
            Ok(index) => {
                let times = &mut self.buckets[index].times;
                if !times.contains(&time) {
                    times.push(time);
                }
            }
            Err(index) => self.buckets.insert(
                index,
                TimeBucket {
                    key,
                    times: vec![time],
                },
            ),
        }
    }

    /// Timestamps in the bucket identified by `key`
    pub fn get(&self, key: Time) -> Option<&[Time]> {
        self.buckets
            .binary_search_by(|bucket| bucket.key.total_cmp(&key))
            .ok()
            .map(|index| self.buckets[index].times.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = Time> + '_ {
        self.buckets.iter().map(|bucket| bucket.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeBucket> {
        self.buckets.iter()
    }

    pub fn first(&self) -> Option<&TimeBucket> {
        self.buckets.first()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl IntoIterator for BucketedTimes {
    type Item = TimeBucket;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}
