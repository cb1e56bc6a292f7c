use crate::calibration::gain_cache::GainCache;
use crate::error::CalTableError;

use itertools::Itertools;
use ndarray::ArrayView1;
use num_complex::Complex64;
use serde::Serialize;

/// Gains tabulated by time and station
///
/// Rows are the distinct slot times in increasing order, columns are the distinct stations sorted
/// by name. A cell is empty when the station has no gain slot at that time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalTable {
    times: Vec<f64>,
    stations: Vec<String>,
    cells: Vec<Vec<Option<Complex64>>>,
}

impl CalTable {
    pub fn new(cache: &GainCache, gains: ArrayView1<Complex64>) -> Result<Self, CalTableError> {
        if gains.len() != cache.num_gains() {
            return Err(CalTableError::GainLength {
                actual: gains.len(),
                expected: cache.num_gains(),
            });
        }
        let times: Vec<f64> = cache
            .times()
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect();
        let stations: Vec<String> = cache
            .stations()
            .sorted_unstable()
            .dedup()
            .map(str::to_owned)
            .collect();

        let mut cells = vec![vec![None; stations.len()]; times.len()];
        for (slot, &gain) in cache.slots().iter().zip(gains.iter()) {
            let row = search_time(&times, slot.time);
            let col = stations.binary_search(&slot.station);
            if let (Some(row), Ok(col)) = (row, col) {
                cells[row][col] = Some(gain);
            }
        }
        Ok(Self {
            times,
            stations,
            cells,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    /// Table rows, one per time
    pub fn rows(&self) -> impl Iterator<Item = (f64, &[Option<Complex64>])> {
        self.times
            .iter()
            .copied()
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    pub fn get(&self, time: f64, station: &str) -> Option<Complex64> {
        let row = search_time(&self.times, time)?;
        let col = self.station_index(station)?;
        self.cells[row][col]
    }

    /// All cells of a station in time order, `None` for an unknown station
    pub fn column(&self, station: &str) -> Option<Vec<Option<Complex64>>> {
        let col = self.station_index(station)?;
        Some(self.cells.iter().map(|row| row[col]).collect())
    }

    fn station_index(&self, station: &str) -> Option<usize> {
        self.stations
            .binary_search_by(|s| s.as_str().cmp(station))
            .ok()
    }
}

fn search_time(times: &[f64], time: f64) -> Option<usize> {
    times.binary_search_by(|t| t.total_cmp(&time)).ok()
}
