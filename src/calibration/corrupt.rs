use crate::calibration::gain_cache::GainCache;
use crate::error::CorruptionError;

use ndarray::{Array1, ArrayView1, Zip};
use num_complex::Complex64;

fn check_len(what: &'static str, actual: usize, expected: usize) -> Result<(), CorruptionError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CorruptionError::LengthMismatch {
            what,
            actual,
            expected,
        })
    }
}

/// Gains of the first and the second endpoint of every measurement row
fn endpoint_gains(
    cache: &GainCache,
    gains: ArrayView1<Complex64>,
) -> Result<(Array1<Complex64>, Array1<Complex64>), CorruptionError> {
    check_len("gains", gains.len(), cache.num_gains())?;
    Ok((
        cache.design1().mul_vec(gains)?,
        cache.design2().mul_vec(gains)?,
    ))
}

/// Apply station gains to model visibilities: `g1 · V · conj(g2)` per measurement row
pub fn corrupt(
    vis: ArrayView1<Complex64>,
    cache: &GainCache,
    gains: ArrayView1<Complex64>,
) -> Result<Array1<Complex64>, CorruptionError> {
    check_len("visibilities", vis.len(), cache.num_rows())?;
    let (g1, g2) = endpoint_gains(cache, gains)?;
    Ok(Zip::from(&g1)
        .and(&vis)
        .and(&g2)
        .map_collect(|&g1, &v, &g2| g1 * v * g2.conj()))
}

/// Forward derivative of [corrupt] along a gain tangent `dgains`
pub fn corrupt_jvp(
    vis: ArrayView1<Complex64>,
    cache: &GainCache,
    gains: ArrayView1<Complex64>,
    dgains: ArrayView1<Complex64>,
) -> Result<Array1<Complex64>, CorruptionError> {
    check_len("visibilities", vis.len(), cache.num_rows())?;
    check_len("gain tangent", dgains.len(), cache.num_gains())?;
    let (g1, g2) = endpoint_gains(cache, gains)?;
    let (dg1, dg2) = endpoint_gains(cache, dgains)?;
    let mut result = Array1::zeros(vis.len());
    Zip::from(&mut result)
        .and(&vis)
        .and(&g1)
        .and(&g2)
        .and(&dg1)
        .and(&dg2)
        .for_each(|y, &v, &g1, &g2, &dg1, &dg2| {
            *y = dg1 * v * g2.conj() + g1 * v * dg2.conj();
        });
    Ok(result)
}

/// Adjoint of [corrupt]
///
/// Cotangents are taken with respect to the real inner product `Re <a, b>`, so for a real loss
/// `L` the returned arrays are `dL/dRe(z) + i dL/dIm(z)` of the visibilities and the gains.
/// Returns `(vis_bar, gains_bar)`.
pub fn corrupt_vjp(
    vis: ArrayView1<Complex64>,
    cache: &GainCache,
    gains: ArrayView1<Complex64>,
    cotangent: ArrayView1<Complex64>,
) -> Result<(Array1<Complex64>, Array1<Complex64>), CorruptionError> {
    check_len("visibilities", vis.len(), cache.num_rows())?;
    check_len("cotangent", cotangent.len(), cache.num_rows())?;
    let (g1, g2) = endpoint_gains(cache, gains)?;

    let vis_bar = Zip::from(&cotangent)
        .and(&g1)
        .and(&g2)
        .map_collect(|&y, &g1, &g2| y * g1.conj() * g2);
    let g1_bar = Zip::from(&cotangent)
        .and(&vis)
        .and(&g2)
        .map_collect(|&y, &v, &g2| y * v.conj() * g2);
    let g2_bar = Zip::from(&cotangent)
        .and(&vis)
        .and(&g1)
        .map_collect(|&y, &v, &g1| y.conj() * g1 * v);

    let gains_bar = cache.design1().transpose_mul_vec(g1_bar.view())?
        + cache.design2().transpose_mul_vec(g2_bar.view())?;
    Ok((vis_bar, gains_bar))
}

/// Complex gains from log-amplitudes and phases: `exp(log_amp + i phase)`
pub fn complex_gains(
    log_amp: ArrayView1<f64>,
    phase: ArrayView1<f64>,
) -> Result<Array1<Complex64>, CorruptionError> {
    check_len("gain phases", phase.len(), log_amp.len())?;
    Ok(Zip::from(&log_amp)
        .and(&phase)
        .map_collect(|&a, &p| Complex64::from_polar(a.exp(), p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::gain_cache::GainSegmentation;
    use crate::calibration::scan::{Baseline, Scan, ScanTable};

    use approx::assert_relative_eq;
    use ndarray::arr1;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_complex(rng: &mut StdRng, n: usize) -> Array1<Complex64> {
        (0..n)
            .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect()
    }

    fn cache() -> GainCache {
        let table = ScanTable::new([
            Scan::all_pairs(0.0, &["A", "B", "C"]),
            Scan::all_pairs(1.0, &["A", "B", "C", "D"]),
        ]);
        GainCache::new(&table, GainSegmentation::Scan).unwrap()
    }

    #[test]
    fn identity_gains() {
        let cache = cache();
        let mut rng = StdRng::seed_from_u64(0);
        let vis = random_complex(&mut rng, cache.num_rows());
        let gains = Array1::from_elem(cache.num_gains(), Complex64::new(1.0, 0.0));
        let actual = corrupt(vis.view(), &cache, gains.view()).unwrap();
        assert_eq!(actual, vis);
    }

    #[test]
    fn conjugation_follows_baseline_order() {
        let forward = ScanTable::new([Scan::new(0.0, [Baseline::new("A", "B")])]);
        let backward = ScanTable::new([Scan::new(0.0, [Baseline::new("B", "A")])]);
        // Slots are sorted by station name in both tables: [A, B]
        let gains = arr1(&[Complex64::new(2.0, 0.0), Complex64::new(0.0, 1.0)]);
        let vis = arr1(&[Complex64::new(1.0, 0.0)]);

        let cache = GainCache::new(&forward, GainSegmentation::Scan).unwrap();
        let actual = corrupt(vis.view(), &cache, gains.view()).unwrap();
        assert_eq!(actual, arr1(&[Complex64::new(0.0, -2.0)]));

        let cache = GainCache::new(&backward, GainSegmentation::Scan).unwrap();
        let actual = corrupt(vis.view(), &cache, gains.view()).unwrap();
        assert_eq!(actual, arr1(&[Complex64::new(0.0, 2.0)]));
    }

    #[test]
    fn jvp_matches_finite_difference() {
        let cache = cache();
        let mut rng = StdRng::seed_from_u64(1);
        let vis = random_complex(&mut rng, cache.num_rows());
        let gains = random_complex(&mut rng, cache.num_gains());
        let dgains = random_complex(&mut rng, cache.num_gains());

        let jvp = corrupt_jvp(vis.view(), &cache, gains.view(), dgains.view()).unwrap();

        let eps = 1e-6;
        let plus = &gains + &dgains.mapv(|x| x * eps);
        let minus = &gains - &dgains.mapv(|x| x * eps);
        let numerical = (corrupt(vis.view(), &cache, plus.view()).unwrap()
            - corrupt(vis.view(), &cache, minus.view()).unwrap())
        .mapv(|x| x / (2.0 * eps));
        for (a, b) in jvp.iter().zip(numerical.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-6);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-6);
        }
    }

    #[test]
    fn vjp_matches_finite_difference() {
        let cache = cache();
        let mut rng = StdRng::seed_from_u64(2);
        let vis = random_complex(&mut rng, cache.num_rows());
        let gains = random_complex(&mut rng, cache.num_gains());
        let cotangent = random_complex(&mut rng, cache.num_rows());

        let loss = |vis: &Array1<Complex64>, gains: &Array1<Complex64>| -> f64 {
            let y = corrupt(vis.view(), &cache, gains.view()).unwrap();
            cotangent
                .iter()
                .zip(y.iter())
                .map(|(c, y)| (c.conj() * y).re)
                .sum()
        };

        let (vis_bar, gains_bar) =
            corrupt_vjp(vis.view(), &cache, gains.view(), cotangent.view()).unwrap();

        let eps = 1e-6;
        for (k, expected) in gains_bar.iter().enumerate() {
            for (direction, component) in [
                (Complex64::new(eps, 0.0), expected.re),
                (Complex64::new(0.0, eps), expected.im),
            ] {
                let mut plus = gains.clone();
                plus[k] += direction;
                let mut minus = gains.clone();
                minus[k] -= direction;
                let numerical = (loss(&vis, &plus) - loss(&vis, &minus)) / (2.0 * eps);
                assert_relative_eq!(component, numerical, epsilon = 1e-6);
            }
        }
        for (k, expected) in vis_bar.iter().enumerate() {
            let mut plus = vis.clone();
            plus[k] += Complex64::new(0.0, eps);
            let mut minus = vis.clone();
            minus[k] -= Complex64::new(0.0, eps);
            let numerical = (loss(&plus, &gains) - loss(&minus, &gains)) / (2.0 * eps);
            assert_relative_eq!(expected.im, numerical, epsilon = 1e-6);
        }
    }

    #[test]
    fn complex_gains_polar() {
        let gains = complex_gains(
            arr1(&[0.0, 2.0_f64.ln()]).view(),
            arr1(&[std::f64::consts::FRAC_PI_2, 0.0]).view(),
        )
        .unwrap();
        assert_relative_eq!(gains[0].re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(gains[0].im, 1.0, epsilon = 1e-12);
        assert_relative_eq!(gains[1].re, 2.0, epsilon = 1e-12);
        assert_relative_eq!(gains[1].im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn length_mismatch() {
        let cache = cache();
        let vis = Array1::from_elem(cache.num_rows(), Complex64::new(1.0, 0.0));
        let gains = Array1::from_elem(3, Complex64::new(1.0, 0.0));
        assert_eq!(
            corrupt(vis.view(), &cache, gains.view()),
            Err(CorruptionError::LengthMismatch {
                what: "gains",
                actual: 3,
                expected: cache.num_gains()
            })
        );
    }
}
