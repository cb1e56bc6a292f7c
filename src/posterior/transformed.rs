use crate::error::TransformError;
use crate::likelihood::LikelihoodTrait;
use crate::params::{ParamLayout, Params};
use crate::posterior::posterior::Posterior;
use crate::transforms::{Transform, TransformTrait};

use ndarray::Array1;
use rand::Rng;

/// Posterior density in the working space of a [Transform]
///
/// `ln p(x) = ln posterior(transform(x)) + ln |det J(x)|`. Points outside of the transform
/// domain have zero density and never reach the posterior.
#[derive(Clone, Debug)]
pub struct TransformedPosterior<L> {
    posterior: Posterior<L>,
    transform: Transform,
}

impl<L> TransformedPosterior<L>
where
    L: LikelihoodTrait,
{
    pub fn new(posterior: Posterior<L>, transform: Transform) -> Result<Self, TransformError> {
        if transform.layout() != posterior.layout() {
            return Err(TransformError::LayoutMismatch {
                transform: block_names(transform.layout()),
                posterior: block_names(posterior.layout()),
            });
        }
        Ok(Self {
            posterior,
            transform,
        })
    }

    pub fn posterior(&self) -> &Posterior<L> {
        &self.posterior
    }

    pub fn transformation(&self) -> &Transform {
        &self.transform
    }

    /// Size of the working space
    pub fn dimension(&self) -> usize {
        self.transform.dimension()
    }

    pub fn in_domain(&self, x: &[f64]) -> bool {
        self.transform.in_domain(x)
    }

    pub fn transform(&self, x: &[f64]) -> Result<Params, TransformError> {
        self.transform.transform(x)
    }

    pub fn inverse(&self, params: &Params) -> Result<Array1<f64>, TransformError> {
        self.transform.inverse(params)
    }

    /// Log density, `-inf` for every invalid input including a wrong dimension
    pub fn ln_density(&self, x: &[f64]) -> f64 {
        self.try_ln_density(x).unwrap_or(f64::NEG_INFINITY)
    }

    /// Log density, a working-space vector of wrong length is an error
    pub fn try_ln_density(&self, x: &[f64]) -> Result<f64, TransformError> {
        self.check_dimension(x)?;
        if !self.transform.in_domain(x) {
            return Ok(f64::NEG_INFINITY);
        }
        let (params, logjac) = self.transform.transform_with_logjac(x)?;
        Ok(self.posterior.ln_density(&params) + logjac)
    }

    /// Prior part of the working-space density: `ln prior(transform(x)) + ln |det J(x)|`
    pub fn ln_prior(&self, x: &[f64]) -> f64 {
        self.split_ln_density(x).0
    }

    /// Likelihood at `transform(x)`, `-inf` outside of the domain
    pub fn ln_likelihood(&self, x: &[f64]) -> f64 {
        self.split_ln_density(x).1
    }

    fn split_ln_density(&self, x: &[f64]) -> (f64, f64) {
        if self.check_dimension(x).is_err() || !self.transform.in_domain(x) {
            return (f64::NEG_INFINITY, f64::NEG_INFINITY);
        }
        match self.transform.transform_with_logjac(x) {
            Ok((params, logjac)) => (
                self.posterior.ln_prior(&params) + logjac,
                self.posterior.ln_likelihood(&params),
            ),
            Err(_) => (f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Prior draw mapped to the working space
    pub fn sample_prior<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Array1<f64>, TransformError> {
        self.transform.inverse(&self.posterior.sample_prior(rng))
    }

    fn check_dimension(&self, x: &[f64]) -> Result<(), TransformError> {
        if x.len() == self.dimension() {
            Ok(())
        } else {
            Err(TransformError::DimensionMismatch {
                actual: x.len(),
                expected: self.dimension(),
            })
        }
    }
}

fn block_names(layout: &ParamLayout) -> Vec<String> {
    layout.names().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::{LnPrior1D, Prior};

    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLikelihood {
        calls: AtomicUsize,
    }

    impl LikelihoodTrait for CountingLikelihood {
        fn ln_likelihood(&self, params: &Params) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            -params.as_flat().iter().map(|x| (x - 1.0).powi(2)).sum::<f64>()
        }
    }

    fn prior() -> Prior {
        Prior::new([
            (
                "sky",
                vec![LnPrior1D::log_uniform(0.1, 10.0), LnPrior1D::normal(1.0, 2.0)],
            ),
            ("gphase", vec![LnPrior1D::circular_uniform()]),
        ])
        .unwrap()
    }

    fn transformed(kind: fn(&Prior) -> Transform) -> TransformedPosterior<CountingLikelihood> {
        let prior = prior();
        let transform = kind(&prior);
        let posterior = Posterior::new(
            prior,
            CountingLikelihood {
                calls: AtomicUsize::new(0),
            },
        );
        TransformedPosterior::new(posterior, transform).unwrap()
    }

    fn calls(tp: &TransformedPosterior<CountingLikelihood>) -> usize {
        tp.posterior().likelihood().calls.load(Ordering::SeqCst)
    }

    #[test]
    fn cube_outside_of_domain_skips_posterior() {
        let tp = transformed(Transform::cube);
        for x in [[0.0, 0.5, 0.5], [0.5, 1.0, 0.5], [-0.1, 0.5, 0.5], [0.5, 0.5, f64::NAN]] {
            assert_eq!(tp.ln_density(&x), f64::NEG_INFINITY);
        }
        assert_eq!(calls(&tp), 0);
        assert!(tp.ln_density(&[0.3, 0.4, 0.5]).is_finite());
        assert_eq!(calls(&tp), 1);
    }

    #[test]
    fn cube_density_is_likelihood() {
        let tp = transformed(Transform::cube);
        let x = [0.3, 0.4, 0.5];
        let params = tp.transform(&x).unwrap();
        assert_relative_eq!(
            tp.ln_density(&x),
            tp.posterior().ln_likelihood(&params),
            epsilon = 1e-10
        );
    }

    #[test]
    fn flat_density_law() {
        let tp = transformed(Transform::flat);
        let x = [0.2, -0.4, 0.6, -1.1];
        let (params, logjac) = tp.transformation().transform_with_logjac(&x).unwrap();
        assert_relative_eq!(
            tp.ln_density(&x),
            tp.posterior().ln_density(&params) + logjac,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            tp.ln_prior(&x) + tp.ln_likelihood(&x),
            tp.ln_density(&x),
            epsilon = 1e-12
        );
    }

    #[test]
    fn raw_density_is_posterior() {
        let tp = transformed(|prior| Transform::raw(prior.layout()));
        let x = [2.0, 0.5, -1.0];
        let params = tp.transform(&x).unwrap();
        assert_eq!(tp.ln_density(&x), tp.posterior().ln_density(&params));
        assert_eq!(tp.ln_density(&[20.0, 0.5, -1.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn wrong_dimension() {
        let tp = transformed(Transform::flat);
        assert_eq!(
            tp.try_ln_density(&[0.0; 3]),
            Err(TransformError::DimensionMismatch {
                actual: 3,
                expected: 4
            })
        );
        assert_eq!(tp.ln_density(&[0.0; 3]), f64::NEG_INFINITY);
    }

    #[test]
    fn prior_samples_are_in_domain() {
        let mut rng = StdRng::seed_from_u64(0);
        for kind in [Transform::flat, Transform::cube] {
            let tp = transformed(kind);
            for _ in 0..100 {
                let x = tp.sample_prior(&mut rng).unwrap();
                assert_eq!(x.len(), tp.dimension());
                assert!(tp.ln_density(x.as_slice().unwrap()).is_finite());
            }
        }
    }

    #[test]
    fn non_angular_round_trip() {
        let tp = transformed(Transform::flat);
        let layout = tp.posterior().layout().clone();
        let params = Params::from_flat(layout, vec![3.0, -0.7, 0.0]).unwrap();
        let x = tp.inverse(&params).unwrap();
        let restored = tp.transform(x.as_slice().unwrap()).unwrap();
        let original = params.block("sky").unwrap();
        for (a, b) in restored.block("sky").unwrap().iter().zip(original.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn layout_mismatch() {
        let prior = prior();
        let other = Prior::new([("x", vec![LnPrior1D::normal(0.0, 1.0)])]).unwrap();
        let posterior = Posterior::new(
            prior,
            CountingLikelihood {
                calls: AtomicUsize::new(0),
            },
        );
        assert!(TransformedPosterior::new(posterior, Transform::cube(&other)).is_err());
    }

    #[test]
    fn same_size_different_blocks() {
        let other = Prior::new([
            (
                "flux",
                vec![LnPrior1D::log_uniform(0.1, 10.0), LnPrior1D::normal(1.0, 2.0)],
            ),
            ("gphase", vec![LnPrior1D::circular_uniform()]),
        ])
        .unwrap();
        assert_eq!(other.dimension(), prior().dimension());
        let posterior = Posterior::new(
            prior(),
            CountingLikelihood {
                calls: AtomicUsize::new(0),
            },
        );
        assert_eq!(
            TransformedPosterior::new(posterior, Transform::flat(&other)).err(),
            Some(TransformError::LayoutMismatch {
                transform: vec!["flux".into(), "gphase".into()],
                posterior: vec!["sky".into(), "gphase".into()],
            })
        );
    }
}
