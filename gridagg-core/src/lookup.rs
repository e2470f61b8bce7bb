//! Externally populated lookup tables bound to operators by name.
//!
//! Zonal thresholds need two tables: one mapping each grid cell to the zone that
//! contains it and one mapping each zone to its threshold. Both are produced outside
//! this crate (for example by intersecting the grid with zone polygons) and handed
//! over through a [`LookupContext`].

use crate::errors::{GridAggError, GridAggResult};
use crate::pipeline::CellArray;
use crate::time::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupTable {
    /// Zone of each grid cell. `None` marks a cell outside every zone.
    CellZones(Vec<Option<String>>),
    /// Value for each zone
    ZoneValues(HashMap<String, FloatValue>),
}

/// Named lookup tables shared by every operator of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupContext {
    tables: HashMap<String, LookupTable>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, bind: impl Into<String>, table: LookupTable) -> Self {
        self.insert(bind, table);
        self
    }

    pub fn insert(&mut self, bind: impl Into<String>, table: LookupTable) {
        self.tables.insert(bind.into(), table);
    }

    pub fn get(&self, bind: &str) -> GridAggResult<&LookupTable> {
        self.tables.get(bind).ok_or_else(|| GridAggError::MissingLookup {
            bind: bind.to_string(),
        })
    }

    pub fn cell_zones(&self, bind: &str) -> GridAggResult<&[Option<String>]> {
        match self.get(bind)? {
            LookupTable::CellZones(zones) => Ok(zones),
            _ => Err(GridAggError::LookupTypeMismatch {
                bind: bind.to_string(),
                expected: "cell zones".to_string(),
            }),
        }
    }

    pub fn zone_values(&self, bind: &str) -> GridAggResult<&HashMap<String, FloatValue>> {
        match self.get(bind)? {
            LookupTable::ZoneValues(values) => Ok(values),
            _ => Err(GridAggError::LookupTypeMismatch {
                bind: bind.to_string(),
                expected: "zone values".to_string(),
            }),
        }
    }

    /// Resolve a threshold for every cell from its zone.
    ///
    /// Cells outside every zone get NaN so that any comparison against them yields
    /// a missing value. Every zone named by a cell must have a threshold.
    pub fn resolve_zonal_thresholds(
        &self,
        zones_bind: &str,
        thresholds_bind: &str,
    ) -> GridAggResult<CellArray> {
        let zones = self.cell_zones(zones_bind)?;
        let thresholds = self.zone_values(thresholds_bind)?;

        zones
            .iter()
            .map(|zone| match zone {
                None => Ok(FloatValue::NAN),
                Some(zone) => thresholds.get(zone).copied().ok_or_else(|| {
                    GridAggError::MissingZoneThreshold {
                        zone: zone.clone(),
                        bind: thresholds_bind.to_string(),
                    }
                }),
            })
            .collect::<GridAggResult<Vec<FloatValue>>>()
            .map(CellArray::from)
    }
}
