use crate::calibration::{Scan, ScanTable, SparseMatrix};
use crate::error::ClosureError;

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Three stations of one scan, closure phase is `φ_ab + φ_bc + φ_ca`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Triangle {
    pub scan: usize,
    pub stations: [String; 3],
}

/// Four stations of one scan, log closure amplitude is `ln|V_ab| + ln|V_cd| - ln|V_ac| - ln|V_bd|`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Quadrangle {
    pub scan: usize,
    pub stations: [String; 4],
}

/// Independent closure triangles of every scan
///
/// Only triangles with all three baselines measured are considered. Candidates are taken in
/// lexicographic order and kept while they add a new closure relation, so a scan with every
/// baseline gives the `(N - 1)(N - 2) / 2` triangles through its alphabetically first station.
pub fn reference_triangles(table: &ScanTable) -> Vec<Triangle> {
    independent_closures(table, |scan, stations, columns| {
        stations
            .iter()
            .tuple_combinations()
            .filter_map(|(&a, &b, &c)| {
                let entries = [(a, b), (b, c), (c, a)]
                    .into_iter()
                    .map(|(s1, s2)| columns.oriented(s1, s2))
                    .collect::<Option<Vec<_>>>()?;
                let triangle = Triangle {
                    scan,
                    stations: [a.into(), b.into(), c.into()],
                };
                Some((triangle, entries))
            })
            .collect()
    })
}

/// Independent log closure amplitudes of every scan
///
/// Every four-station combination has three quadrangles, two of them independent. Only
/// quadrangles with all four baselines measured are considered, and they are kept while they add
/// a new closure relation, giving `N (N - 3) / 2` per scan with every baseline measured.
pub fn independent_quadrangles(table: &ScanTable) -> Vec<Quadrangle> {
    independent_closures(table, |scan, stations, columns| {
        stations
            .iter()
            .tuple_combinations()
            .flat_map(|(&a, &b, &c, &d)| [[a, b, c, d], [a, b, d, c], [a, c, d, b]])
            .filter_map(|[a, b, c, d]| {
                let entries = [(a, b, 1.0), (c, d, 1.0), (a, c, -1.0), (b, d, -1.0)]
                    .into_iter()
                    .map(|(s1, s2, sign)| Some((columns.oriented(s1, s2)?.0, sign)))
                    .collect::<Option<Vec<_>>>()?;
                let quadrangle = Quadrangle {
                    scan,
                    stations: [a.into(), b.into(), c.into(), d.into()],
                };
                Some((quadrangle, entries))
            })
            .collect()
    })
}

/// Greedy selection of linearly independent closure relations, scan by scan
///
/// `candidates` gets the scan index, its sorted stations and its baselines, and returns closures
/// with their coefficients over the scan baselines.
fn independent_closures<T>(
    table: &ScanTable,
    candidates: impl Fn(usize, &[&str], &BaselineColumns) -> Vec<(T, Vec<(usize, f64)>)>,
) -> Vec<T> {
    table
        .scans()
        .iter()
        .enumerate()
        .flat_map(|(i, scan)| {
            let columns = BaselineColumns::new(scan);
            let mut basis = Basis::new(columns.len());
            candidates(i, &scan.stations(), &columns)
                .into_iter()
                .filter_map(|(closure, entries)| basis.insert(&entries).then_some(closure))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Baselines of a single scan, numbered regardless of orientation
struct BaselineColumns<'a> {
    columns: HashMap<(&'a str, &'a str), usize>,
}

impl<'a> BaselineColumns<'a> {
    fn new(scan: &'a Scan) -> Self {
        let mut columns = HashMap::new();
        for baseline in &scan.baselines {
            let key = ordered(&baseline.station1, &baseline.station2);
            let next = columns.len();
            columns.entry(key).or_insert(next);
        }
        Self { columns }
    }

    fn len(&self) -> usize {
        self.columns.len()
    }

    /// Column of the `a-b` baseline, with `-1` when `a` sorts after `b`
    fn oriented(&self, a: &str, b: &str) -> Option<(usize, f64)> {
        let &column = self.columns.get(&ordered(a, b))?;
        Some((column, if a < b { 1.0 } else { -1.0 }))
    }
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a < b { (a, b) } else { (b, a) }
}

const RANK_TOLERANCE: f64 = 1e-9;

/// Row-reduced set of closure relations
struct Basis {
    dimension: usize,
    rows: Vec<(usize, Vec<f64>)>,
}

impl Basis {
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: vec![],
        }
    }

    /// Adds the relation when it is independent of the ones already present
    fn insert(&mut self, entries: &[(usize, f64)]) -> bool {
        let mut v = vec![0.0; self.dimension];
        for &(j, x) in entries {
            v[j] += x;
        }
        // Every row is zero at the pivots of the rows before it
        for (pivot, row) in &self.rows {
            let factor = v[*pivot];
            if factor != 0.0 {
                for (vi, ri) in v.iter_mut().zip(row) {
                    *vi -= factor * ri;
                }
            }
        }
        let Some((pivot, value)) = v
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
        else {
            return false;
        };
        if value.abs() < RANK_TOLERANCE {
            return false;
        }
        v.iter_mut().for_each(|x| *x /= value);
        self.rows.push((pivot, v));
        true
    }
}

/// Finds the measurement row of a station pair and its orientation
struct RowIndex<'a> {
    rows: HashMap<(usize, &'a str, &'a str), usize>,
    num_scans: usize,
}

impl<'a> RowIndex<'a> {
    fn new(table: &'a ScanTable) -> Self {
        let rows = table
            .rows()
            .enumerate()
            .map(|(i, row)| {
                (
                    (
                        row.scan,
                        row.baseline.station1.as_str(),
                        row.baseline.station2.as_str(),
                    ),
                    i,
                )
            })
            .collect();
        Self {
            rows,
            num_scans: table.num_scans(),
        }
    }

    /// Row and sign of the phase of `V_ab`: `-1` when the row is measured as `b-a`
    fn find(&self, scan: usize, a: &str, b: &str) -> Result<(usize, f64), ClosureError> {
        if scan >= self.num_scans {
            return Err(ClosureError::ScanOutOfRange {
                scan,
                num_scans: self.num_scans,
            });
        }
        if let Some(&row) = self.rows.get(&(scan, a, b)) {
            return Ok((row, 1.0));
        }
        if let Some(&row) = self.rows.get(&(scan, b, a)) {
            return Ok((row, -1.0));
        }
        Err(ClosureError::MissingBaseline {
            scan,
            station1: a.to_owned(),
            station2: b.to_owned(),
        })
    }
}

fn design_from_entries(
    nrows: usize,
    ncols: usize,
    entries: Vec<(usize, usize, f64)>,
) -> SparseMatrix<f64> {
    let (rows, (cols, values)): (Vec<_>, (Vec<_>, Vec<_>)) =
        entries.into_iter().map(|(i, j, v)| (i, (j, v))).unzip();
    // Indices are produced from the table itself, so they are always in bounds
    SparseMatrix::from_triplets(nrows, ncols, &rows, &cols, &values)
        .expect("closure design indices are in bounds")
}

/// Closure phase design matrix: one row per triangle, `±1` entries over measurement rows
pub fn closure_phase_design(
    table: &ScanTable,
    triangles: &[Triangle],
) -> Result<SparseMatrix<f64>, ClosureError> {
    let index = RowIndex::new(table);
    let mut entries = Vec::with_capacity(3 * triangles.len());
    for (i, triangle) in triangles.iter().enumerate() {
        let [a, b, c] = &triangle.stations;
        for (s1, s2) in [(a, b), (b, c), (c, a)] {
            let (row, sign) = index.find(triangle.scan, s1, s2)?;
            entries.push((i, row, sign));
        }
    }
    Ok(design_from_entries(
        triangles.len(),
        table.num_rows(),
        entries,
    ))
}

/// Log closure amplitude design matrix: one row per quadrangle, `+1` for `ab`, `cd` and `-1` for
/// `ac`, `bd`
pub fn log_closure_amplitude_design(
    table: &ScanTable,
    quadrangles: &[Quadrangle],
) -> Result<SparseMatrix<f64>, ClosureError> {
    let index = RowIndex::new(table);
    let mut entries = Vec::with_capacity(4 * quadrangles.len());
    for (i, quadrangle) in quadrangles.iter().enumerate() {
        let [a, b, c, d] = &quadrangle.stations;
        for (s1, s2, sign) in [(a, b, 1.0), (c, d, 1.0), (a, c, -1.0), (b, d, -1.0)] {
            let (row, _) = index.find(quadrangle.scan, s1, s2)?;
            entries.push((i, row, sign));
        }
    }
    Ok(design_from_entries(
        quadrangles.len(),
        table.num_rows(),
        entries,
    ))
}
