use crate::calibration::scan::ScanTable;
use crate::calibration::sparse::SparseMatrix;
use crate::error::GainCacheError;

use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// How gains are segmented in time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum GainSegmentation {
    /// One gain per station per scan
    #[default]
    Scan,
    /// One gain per station for the whole observation
    Track,
}

/// Gain slot: the station and the time its gain starts to apply
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GainSlot {
    pub time: f64,
    pub station: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SlotKey {
    Scan(NotNan<f64>, String),
    Track(String),
}

impl SlotKey {
    fn new(segmentation: GainSegmentation, time: NotNan<f64>, station: &str) -> Self {
        match segmentation {
            GainSegmentation::Scan => Self::Scan(time, station.to_owned()),
            GainSegmentation::Track => Self::Track(station.to_owned()),
        }
    }
}

/// Design matrices mapping gain slots onto measurement rows
///
/// Row `i` of `design1` (`design2`) has a single unit entry at the slot of the first (second)
/// station of measurement `i`, so `design1 · g` picks the first-endpoint gain of every row. The
/// cache is built once per observation and shared between model evaluations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GainCache {
    segmentation: GainSegmentation,
    design1: SparseMatrix<f64>,
    design2: SparseMatrix<f64>,
    slots: Vec<GainSlot>,
}

impl GainCache {
    /// Build the cache enumerating gain slots from the scan table
    ///
    /// Slots are ordered by scan, stations of a scan are ordered by name. With
    /// [GainSegmentation::Track] a station gets a single slot timed at its first scan.
    pub fn new(table: &ScanTable, segmentation: GainSegmentation) -> Result<Self, GainCacheError> {
        let mut slots = vec![];
        let mut index = HashMap::new();
        for (i, scan) in table.scans().iter().enumerate() {
            let time = NotNan::new(scan.time).map_err(|_| GainCacheError::InvalidTime { scan: i })?;
            for station in scan.stations() {
                match index.entry(SlotKey::new(segmentation, time, station)) {
                    Entry::Vacant(entry) => {
                        entry.insert(slots.len());
                        slots.push(GainSlot {
                            time: scan.time,
                            station: station.to_owned(),
                        });
                    }
                    Entry::Occupied(_) => {
                        if segmentation == GainSegmentation::Scan {
                            return Err(GainCacheError::DuplicateSlot {
                                time: scan.time,
                                station: station.to_owned(),
                            });
                        }
                    }
                }
            }
        }
        Self::build(table, segmentation, slots, index)
    }

    /// Build the cache from a caller-supplied slot list
    ///
    /// Every measurement endpoint must have a slot in the list.
    pub fn with_slots(
        table: &ScanTable,
        segmentation: GainSegmentation,
        slots: Vec<GainSlot>,
    ) -> Result<Self, GainCacheError> {
        let mut index = HashMap::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let time = NotNan::new(slot.time).map_err(|_| GainCacheError::InvalidTime { scan: i })?;
            if index
                .insert(SlotKey::new(segmentation, time, &slot.station), i)
                .is_some()
            {
                return Err(GainCacheError::DuplicateSlot {
                    time: slot.time,
                    station: slot.station.clone(),
                });
            }
        }
        Self::build(table, segmentation, slots, index)
    }

    fn build(
        table: &ScanTable,
        segmentation: GainSegmentation,
        slots: Vec<GainSlot>,
        index: HashMap<SlotKey, usize>,
    ) -> Result<Self, GainCacheError> {
        let nrows = table.num_rows();
        let mut cols1 = Vec::with_capacity(nrows);
        let mut cols2 = Vec::with_capacity(nrows);
        for (row, measurement) in table.rows().enumerate() {
            let baseline = measurement.baseline;
            if baseline.station1 == baseline.station2 {
                return Err(GainCacheError::Autocorrelation {
                    row,
                    station: baseline.station1.clone(),
                });
            }
            let time = NotNan::new(measurement.time).map_err(|_| GainCacheError::InvalidTime {
                scan: measurement.scan,
            })?;
            let lookup = |station: &str| {
                index
                    .get(&SlotKey::new(segmentation, time, station))
                    .copied()
                    .ok_or_else(|| GainCacheError::MissingSlot {
                        row,
                        time: measurement.time,
                        station: station.to_owned(),
                    })
            };
            cols1.push(lookup(&baseline.station1)?);
            cols2.push(lookup(&baseline.station2)?);
        }

        let rows: Vec<usize> = (0..nrows).collect();
        let ones = vec![1.0; nrows];
        let design1 = SparseMatrix::from_triplets(nrows, slots.len(), &rows, &cols1, &ones)?;
        let design2 = SparseMatrix::from_triplets(nrows, slots.len(), &rows, &cols2, &ones)?;
        log::debug!(
            "gain cache: {} measurement rows, {} gain slots ({:?} segmentation)",
            nrows,
            slots.len(),
            segmentation,
        );

        Ok(Self {
            segmentation,
            design1,
            design2,
            slots,
        })
    }

    pub fn segmentation(&self) -> GainSegmentation {
        self.segmentation
    }

    /// Design matrix of the first baseline endpoint
    pub fn design1(&self) -> &SparseMatrix<f64> {
        &self.design1
    }

    /// Design matrix of the second baseline endpoint
    pub fn design2(&self) -> &SparseMatrix<f64> {
        &self.design2
    }

    pub fn slots(&self) -> &[GainSlot] {
        &self.slots
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().map(|slot| slot.time)
    }

    pub fn stations(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map(|slot| slot.station.as_str())
    }

    /// Number of gain slots, the length of every gain vector applied with this cache
    pub fn num_gains(&self) -> usize {
        self.slots.len()
    }

    /// Number of measurement rows
    pub fn num_rows(&self) -> usize {
        self.design1.nrows()
    }
}
