use super::TimeBucketing;
use crate::errors::{GridAggError, GridAggResult};
use crate::time::{Calendar, Time};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A named season starting on the same calendar day each year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    /// Calendar start as `MM-DD`
    pub start: String,
}

impl Season {
    pub fn new(name: impl Into<String>, start: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
        }
    }

    /// Parse the start into a `(month, day)` pair
    pub fn month_day(&self) -> GridAggResult<(u32, u32)> {
        let invalid = || {
            GridAggError::InvalidSeason(format!(
                "season '{}' has start '{}', expected MM-DD",
                self.name, self.start
            ))
        };

        let (month, day) = self.start.trim().split_once('-').ok_or_else(invalid)?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }
        Ok((month, day))
    }
}

/// Buckets by season.
///
/// Season boundaries are resolved lazily, one calendar year at a time, and cached
/// for the lifetime of the strategy. The cache is never evicted which is fine for a
/// single batch run covering a bounded number of years.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalBucketing {
    calendar: Calendar,
    seasons: Vec<Season>,
    /// Absolute season starts for every populated year
    #[serde(skip)]
    boundaries: Vec<Time>,
    /// Season index keyed by the bit pattern of its start
    #[serde(skip)]
    season_starts: HashMap<u64, usize>,
    #[serde(skip)]
    populated_years: BTreeSet<i32>,
}

impl SeasonalBucketing {
    /// Create a seasonal strategy, validating the season definitions up front.
    pub fn new(calendar: Calendar, seasons: Vec<Season>) -> GridAggResult<Self> {
        if seasons.is_empty() {
            return Err(GridAggError::InvalidSeason(
                "at least one season must be defined".to_string(),
            ));
        }
        for season in &seasons {
            season.month_day()?;
        }

        Ok(Self {
            calendar,
            seasons,
            boundaries: vec![],
            season_starts: HashMap::new(),
            populated_years: BTreeSet::new(),
        })
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    /// The season whose start produced `key`, if `key` is a known boundary
    pub fn season_for(&self, key: Time) -> Option<&Season> {
        self.season_starts
            .get(&key.to_bits())
            .map(|index| &self.seasons[*index])
    }

    /// Years whose boundaries have been resolved
    pub fn populated_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.populated_years.iter().copied()
    }

    fn populate_year(&mut self, year: i32) -> GridAggResult<()> {
        if self.populated_years.contains(&year) {
            return Ok(());
        }
        if self.seasons.is_empty() {
            return Err(GridAggError::InvalidSeason(
                "at least one season must be defined".to_string(),
            ));
        }

        for (index, season) in self.seasons.iter().enumerate() {
            let (month, day) = season.month_day()?;
            let start = self.calendar.midnight(year, month, day).map_err(|_| {
                GridAggError::InvalidSeason(format!(
                    "season '{}' starting {} does not exist in {}",
                    season.name, season.start, year
                ))
            })?;
            self.boundaries.push(start);
            self.season_starts.insert(start.to_bits(), index);
        }
        self.populated_years.insert(year);

        debug!(
            "Resolved {} season boundaries for {}",
            self.seasons.len(),
            year
        );
        Ok(())
    }

    fn latest_boundary(&self, time: Time) -> Option<Time> {
        self.boundaries
            .iter()
            .copied()
            .filter(|start| *start <= time)
            .max_by(|a, b| a.total_cmp(b))
    }
}

#[typetag::serde]
impl TimeBucketing for SeasonalBucketing {
    fn bucket_key(&mut self, time: Time) -> GridAggResult<Time> {
        let year = self.calendar.year_of(time)?;

        // The previous year guarantees a boundary at or before early-January times,
        // whatever years earlier queries have cached
        self.populate_year(year - 1)?;
        self.populate_year(year)?;
        self.populate_year(year + 1)?;

        self.latest_boundary(time).ok_or_else(|| {
            GridAggError::InvalidSeason(format!("no season starts on or before time {}", time))
        })
    }

    fn descriptor(&self) -> &'static str {
        "seasonal"
    }
}
