use approx::assert_abs_diff_eq;
use ndarray::Array1;
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use vlbi_posterior::{
    CalTable, DataProductTrait, EmceeSettings, GainCache, GainSegmentation, LikelihoodTrait,
    Params, Posterior, Prior, Registry, Transform, TransformTrait, TransformedPosterior,
    VisibilityModelTrait, run_emcee,
};
use vlbi_posterior_test_util::{gaussian_source_problem, sparse_table, synthetic_observation};

fn transformed<L: LikelihoodTrait>(
    prior: &Prior,
    likelihood: &Arc<L>,
    transform: Transform,
) -> TransformedPosterior<L> {
    let posterior = Posterior::new(prior.clone(), likelihood.clone());
    TransformedPosterior::new(posterior, transform).unwrap()
}

fn posterior<L: LikelihoodTrait>(prior: Prior, likelihood: L) -> Posterior<L> {
    Posterior::new(prior, likelihood)
}

fn with_sky(params: &Params, flux: f64) -> Params {
    let mut values = params.as_flat().to_owned();
    values[0] = flux;
    Params::from_flat(params.layout().clone(), values).unwrap()
}

#[test]
fn truth_maximizes_likelihood() {
    let (prior, likelihood, truth) = gaussian_source_problem(4, 3, 0);
    let posterior = posterior(prior, likelihood);
    let at_truth = posterior.ln_likelihood(&truth);
    assert!(at_truth.is_finite());
    for flux in [1.5, 1.9, 2.1, 3.0] {
        assert!(posterior.ln_likelihood(&with_sky(&truth, flux)) < at_truth);
    }
    assert!(posterior.ln_density(&truth).is_finite());
}

#[test]
fn outside_of_prior_support() {
    let (prior, likelihood, truth) = gaussian_source_problem(3, 2, 1);
    let posterior = posterior(prior, likelihood);
    assert_eq!(
        posterior.ln_density(&with_sky(&truth, 20.0)),
        f64::NEG_INFINITY
    );
}

#[test]
fn flat_transform_recovers_truth() {
    let (prior, likelihood, truth) = gaussian_source_problem(4, 3, 2);
    let tp = transformed(&prior, &Arc::new(likelihood), Transform::flat(&prior));
    let x = tp.inverse(&truth).unwrap();
    let restored = tp.transform(x.as_slice().unwrap()).unwrap();

    for block in ["sky", "lgamp"] {
        for (a, b) in restored
            .block(block)
            .unwrap()
            .iter()
            .zip(truth.block(block).unwrap().iter())
        {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }
    for (a, b) in restored
        .block("gphase")
        .unwrap()
        .iter()
        .zip(truth.block("gphase").unwrap().iter())
    {
        assert_abs_diff_eq!(a.cos(), b.cos(), epsilon = 1e-9);
        assert_abs_diff_eq!(a.sin(), b.sin(), epsilon = 1e-9);
    }
    assert!(tp.ln_density(x.as_slice().unwrap()).is_finite());
}

#[test]
fn cube_transform_density() {
    let (prior, likelihood, truth) = gaussian_source_problem(4, 3, 3);
    let likelihood = Arc::new(likelihood);
    let tp = transformed(&prior, &likelihood, Transform::cube(&prior));
    let x = tp.inverse(&truth).unwrap();
    assert!(x.iter().all(|&p| p > 0.0 && p < 1.0));

    let params = tp.transform(x.as_slice().unwrap()).unwrap();
    assert_abs_diff_eq!(
        tp.ln_density(x.as_slice().unwrap()),
        likelihood.ln_likelihood(&params),
        epsilon = 1e-6
    );

    let mut outside = x.to_vec();
    outside[0] = 1.0;
    assert_eq!(tp.ln_density(&outside), f64::NEG_INFINITY);
}

#[test]
fn prior_draws_through_every_transform() {
    let (prior, likelihood, _truth) = gaussian_source_problem(3, 2, 4);
    let likelihood = Arc::new(likelihood);
    let mut rng = StdRng::seed_from_u64(4);
    for transform in [
        Transform::flat(&prior),
        Transform::cube(&prior),
        Transform::raw(prior.layout()),
    ] {
        assert_eq!(transform.layout().size(), prior.dimension());
        let tp = transformed(&prior, &likelihood, transform);
        for _ in 0..20 {
            let x = tp.sample_prior(&mut rng).unwrap();
            assert!(tp.ln_prior(x.as_slice().unwrap()).is_finite());
        }
    }
}

#[test]
fn simulated_observation_is_seeded() {
    let (prior, likelihood, truth) = gaussian_source_problem(4, 2, 5);
    let posterior = posterior(prior, likelihood);

    let a = posterior
        .simulate_observation(&truth, &mut StdRng::seed_from_u64(0))
        .unwrap();
    let b = posterior
        .simulate_observation(&truth, &mut StdRng::seed_from_u64(0))
        .unwrap();
    let c = posterior
        .simulate_observation(&truth, &mut StdRng::seed_from_u64(1))
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    for (simulated, observed) in a.iter().zip(posterior.likelihood().products()) {
        assert_eq!(simulated.len(), observed.len());
        assert_eq!(simulated.kind(), observed.kind());
    }

    let model = posterior.visibility_model(&truth).unwrap();
    let amplitudes = model.amplitudes(posterior.likelihood().uv()).unwrap();
    assert_eq!(amplitudes.len(), posterior.likelihood().uv().len());
}

#[test]
fn ensemble_sampler_stays_in_support() {
    let (prior, likelihood, _truth) = gaussian_source_problem(3, 1, 6);
    let tp = transformed(&prior, &Arc::new(likelihood), Transform::flat(&prior));
    let num_walkers = 2 * tp.dimension() + 2;
    let settings = EmceeSettings::new(num_walkers, 20, 5, 6);
    let chain = run_emcee(&tp, &settings).unwrap();
    assert_eq!(chain.len(), 15 * num_walkers);
    assert!(chain.ln_density().iter().all(|x| x.is_finite()));
    for params in chain.to_params(&tp).unwrap() {
        assert!(prior.ln_prior(&params).is_finite());
    }
}

#[test]
fn caltable_rendering() {
    let (table, _uv, cache, gains) = synthetic_observation(3, 4, 7);
    let caltable = CalTable::new(&cache, gains.view()).unwrap();
    assert_eq!(caltable.times().len(), table.num_scans());

    let registry = Registry::with_default_formatters();
    let tsv = registry.get("tsv").unwrap().format(&caltable).unwrap();
    assert_eq!(tsv.lines().count(), table.num_scans() + 1);

    let unit = Array1::from_elem(cache.num_gains(), Complex64::new(1.0, 0.0));
    let caltable = CalTable::new(&cache, unit.view()).unwrap();
    assert_eq!(caltable.get(0.0, "S0"), Some(Complex64::new(1.0, 0.0)));
    assert!(registry.get("csv").is_err());
}

#[test]
fn segmentation_of_partial_scans() {
    let table = sparse_table(4, 4);
    let per_scan = GainCache::new(&table, GainSegmentation::Scan).unwrap();
    assert_eq!(per_scan.num_gains(), 4 * 3);
    let per_track = GainCache::new(&table, GainSegmentation::Track).unwrap();
    assert_eq!(per_track.num_gains(), 4);
    assert_eq!(per_track.num_rows(), table.num_rows());
}
