use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single correlated station pair
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Baseline {
    pub station1: String,
    pub station2: String,
}

impl Baseline {
    pub fn new(station1: impl Into<String>, station2: impl Into<String>) -> Self {
        Self {
            station1: station1.into(),
            station2: station2.into(),
        }
    }
}

/// Baselines measured simultaneously at one timestamp
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scan {
    pub time: f64,
    pub baselines: Vec<Baseline>,
}

impl Scan {
    pub fn new(time: f64, baselines: impl IntoIterator<Item = Baseline>) -> Self {
        Self {
            time,
            baselines: baselines.into_iter().collect(),
        }
    }

    /// Scan with every pair of the given stations, `(s_i, s_j)` for `i < j`
    pub fn all_pairs<S: AsRef<str>>(time: f64, stations: &[S]) -> Self {
        let baselines = stations
            .iter()
            .tuple_combinations()
            .map(|(a, b)| Baseline::new(a.as_ref(), b.as_ref()));
        Self::new(time, baselines)
    }

    /// Distinct stations of the scan sorted by name
    pub fn stations(&self) -> Vec<&str> {
        self.baselines
            .iter()
            .flat_map(|b| [b.station1.as_str(), b.station2.as_str()])
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

/// One measurement: a baseline at a scan time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Row<'a> {
    pub scan: usize,
    pub time: f64,
    pub baseline: &'a Baseline,
}

/// Ordered scans of an observation
///
/// Measurement rows are the scan-ordered concatenation of all baselines, every row-aligned array
/// of the crate (visibilities, noise levels, uv points) follows this order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScanTable {
    scans: Vec<Scan>,
}

impl ScanTable {
    pub fn new(scans: impl IntoIterator<Item = Scan>) -> Self {
        Self {
            scans: scans.into_iter().collect(),
        }
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn num_scans(&self) -> usize {
        self.scans.len()
    }

    /// Total number of measurement rows
    pub fn num_rows(&self) -> usize {
        self.scans.iter().map(|scan| scan.baselines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.scans.iter().enumerate().flat_map(|(i, scan)| {
            scan.baselines.iter().map(move |baseline| Row {
                scan: i,
                time: scan.time,
                baseline,
            })
        })
    }

    /// Distinct stations of the whole table sorted by name
    pub fn stations(&self) -> Vec<&str> {
        self.scans
            .iter()
            .flat_map(|scan| scan.baselines.iter())
            .flat_map(|b| [b.station1.as_str(), b.station2.as_str()])
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

impl FromIterator<Scan> for ScanTable {
    fn from_iter<I: IntoIterator<Item = Scan>>(iter: I) -> Self {
        Self::new(iter)
    }
}
