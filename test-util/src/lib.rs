use itertools::Itertools;
use ndarray::Array1;
use num_complex::Complex64;
use rand::prelude::*;
use rand_distr::StandardNormal;
use std::sync::Arc;
use vlbi_posterior::calibration::{Scan, complex_gains};
use vlbi_posterior::likelihood::{ClosurePhases, ComplexVisibilities};
use vlbi_posterior::model::{closure_phase_design, reference_triangles};
use vlbi_posterior::{
    CorruptedModel, DataProduct, GainCache, GainSegmentation, LnPrior1D, ModelError, Params, Prior,
    RadioLikelihood, ScanTable, SkyModel, UvCoverage, VisModel, VisibilityModelTrait,
};

/// Station names "S0", "S1", ...
pub fn station_names(num_stations: usize) -> Vec<String> {
    (0..num_stations).map(|i| format!("S{i}")).collect()
}

/// Every station observes every baseline at every one of `num_scans` unit-spaced times
pub fn all_pairs_table(num_stations: usize, num_scans: usize) -> ScanTable {
    let stations = station_names(num_stations);
    (0..num_scans)
        .map(|i| Scan::all_pairs(i as f64, &stations))
        .collect()
}

/// Like [all_pairs_table], but station `(scan mod num_stations)` sits out every scan
pub fn sparse_table(num_stations: usize, num_scans: usize) -> ScanTable {
    let stations = station_names(num_stations);
    (0..num_scans)
        .map(|i| {
            let present = stations
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i % num_stations)
                .map(|(_, s)| s.as_str())
                .collect_vec();
            Scan::all_pairs(i as f64, &present)
        })
        .collect()
}

/// Baseline coordinates of an east-west array tracked through hour angle
///
/// Station `k` sits at `(k, k²/4)`, a scan at time `t` uses hour angle `t / 4`.
pub fn uv_coverage(table: &ScanTable) -> UvCoverage {
    let position = |station: &str| -> (f64, f64) {
        let k: f64 = station[1..].parse().unwrap_or(0.0);
        (k, 0.25 * k * k)
    };
    table
        .rows()
        .map(|row| {
            let (x1, y1) = position(&row.baseline.station1);
            let (x2, y2) = position(&row.baseline.station2);
            let (dx, dy) = (x1 - x2, y1 - y2);
            let (sin_h, cos_h) = (0.25 * row.time).sin_cos();
            (dx * cos_h - dy * sin_h, dx * sin_h + dy * cos_h)
        })
        .collect()
}

/// Gains of unit-ish amplitude and random phase for every slot of `cache`
pub fn random_gains(cache: &GainCache, rng: &mut impl Rng) -> Array1<Complex64> {
    (0..cache.num_gains())
        .map(|_| {
            let ln_amplitude: f64 = 0.1 * rng.sample::<f64, _>(StandardNormal);
            let phase = rng.random_range(-std::f64::consts::PI..std::f64::consts::PI);
            Complex64::from_polar(ln_amplitude.exp(), phase)
        })
        .collect()
}

/// All-pairs table, its coverage, per-scan gain cache and a seeded set of gains
pub fn synthetic_observation(
    num_stations: usize,
    num_scans: usize,
    seed: u64,
) -> (ScanTable, UvCoverage, GainCache, Array1<Complex64>) {
    let table = all_pairs_table(num_stations, num_scans);
    let uv = uv_coverage(&table);
    let cache = GainCache::new(&table, GainSegmentation::Scan)
        .expect("all-pairs tables have neither autocorrelations nor repeated times");
    let mut rng = StdRng::seed_from_u64(seed);
    let gains = random_gains(&cache, &mut rng);
    (table, uv, cache, gains)
}

/// Noise level of every synthetic data product
pub const SIGMA: f64 = 0.05;

/// Circular Gaussian source of flux 2 and width 0.3 seen through per-scan station gains
///
/// Parameter blocks are `"sky"` (flux and width), `"lgamp"` (log gain amplitudes) and `"gphase"`
/// (gain phases). Returns the prior, a likelihood of noiseless complex visibilities and closure
/// phases, and the parameters the data were generated from.
pub fn gaussian_source_problem(
    num_stations: usize,
    num_scans: usize,
    seed: u64,
) -> (
    Prior,
    RadioLikelihood<impl Fn(&Params) -> Result<VisModel, ModelError> + Send + Sync>,
    Params,
) {
    let (table, uv, cache, gains) = synthetic_observation(num_stations, num_scans, seed);
    let num_gains = cache.num_gains();
    let cache = Arc::new(cache);

    let prior = Prior::new([
        (
            "sky",
            vec![LnPrior1D::log_uniform(0.1, 10.0), LnPrior1D::uniform(0.01, 2.0)],
        ),
        ("lgamp", vec![LnPrior1D::normal(0.0, 0.2); num_gains]),
        ("gphase", vec![LnPrior1D::circular_uniform(); num_gains]),
    ])
    .expect("block names are distinct");

    let sky = [2.0, 0.3];
    let lgamp = gains.mapv(|g| g.norm().ln()).to_vec();
    let gphase = gains.mapv(|g| g.arg()).to_vec();
    let truth = Params::from_blocks(
        prior.layout().clone(),
        [
            ("sky", &sky[..]),
            ("lgamp", &lgamp[..]),
            ("gphase", &gphase[..]),
        ],
    )
    .expect("blocks match the prior layout");

    let builder = move |params: &Params| -> Result<VisModel, ModelError> {
        let sky = params.block("sky")?;
        let gains = complex_gains(params.block("lgamp")?, params.block("gphase")?)?;
        let model = CorruptedModel::new(SkyModel::gaussian(sky[0], sky[1]), cache.clone(), gains)?;
        Ok(model.into())
    };

    let model = builder(&truth).expect("truth is a valid parameter set");
    let vis = model.visibilities(&uv).expect("coverage matches the table");
    let design = closure_phase_design(&table, &reference_triangles(&table))
        .expect("triangles are built from the table");
    let phases = model
        .closure_phases(&uv, &design)
        .expect("design matches the table");
    let products: Vec<DataProduct> = vec![
        ComplexVisibilities::new(vis.clone(), Array1::from_elem(vis.len(), SIGMA)).into(),
        ClosurePhases::new(phases.clone(), Array1::from_elem(phases.len(), SIGMA), design).into(),
    ];
    let likelihood =
        RadioLikelihood::new(builder, uv, products).expect("products are consistent");

    (prior, likelihood, truth)
}
