use crate::error::ModelError;
use crate::likelihood::{DataProduct, LikelihoodTrait, RadioLikelihood};
use crate::model::VisModel;
use crate::params::{ParamLayout, Params};
use crate::prior::Prior;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Posterior density over the natural parameter space
///
/// `ln p(θ | data) = ln prior(θ) + ln likelihood(θ)` up to the evidence. The likelihood is
/// evaluated only at points of finite prior density.
#[derive(Debug)]
pub struct Posterior<L> {
    prior: Arc<Prior>,
    likelihood: Arc<L>,
}

impl<L> Clone for Posterior<L> {
    fn clone(&self) -> Self {
        Self {
            prior: self.prior.clone(),
            likelihood: self.likelihood.clone(),
        }
    }
}

impl<L> Posterior<L>
where
    L: LikelihoodTrait,
{
    pub fn new(prior: impl Into<Arc<Prior>>, likelihood: impl Into<Arc<L>>) -> Self {
        Self {
            prior: prior.into(),
            likelihood: likelihood.into(),
        }
    }

    pub fn prior(&self) -> &Prior {
        &self.prior
    }

    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    pub fn layout(&self) -> &Arc<ParamLayout> {
        self.prior.layout()
    }

    /// Number of natural parameters
    pub fn dimension(&self) -> usize {
        self.prior.dimension()
    }

    pub fn ln_prior(&self, params: &Params) -> f64 {
        self.prior.ln_prior(params)
    }

    pub fn ln_likelihood(&self, params: &Params) -> f64 {
        self.likelihood.ln_likelihood(params)
    }

    pub fn ln_density(&self, params: &Params) -> f64 {
        let ln_prior = self.ln_prior(params);
        if !ln_prior.is_finite() {
            return f64::NEG_INFINITY;
        }
        ln_prior + self.ln_likelihood(params)
    }

    pub fn sample_prior<R: Rng + ?Sized>(&self, rng: &mut R) -> Params {
        self.prior.sample(rng)
    }

    pub fn sample_prior_seeded(&self, seed: u64) -> Params {
        self.sample_prior(&mut StdRng::seed_from_u64(seed))
    }
}

impl<B> Posterior<RadioLikelihood<B>>
where
    B: Fn(&Params) -> Result<VisModel, ModelError> + Send + Sync,
{
    /// Sky and instrument model of the likelihood at `params`
    pub fn visibility_model(&self, params: &Params) -> Result<VisModel, ModelError> {
        self.likelihood.visibility_model(params)
    }

    /// Posterior-predictive draw: one noise realization of every data product at `params`
    pub fn simulate_observation<R: Rng + ?Sized>(
        &self,
        params: &Params,
        rng: &mut R,
    ) -> Result<Vec<DataProduct>, ModelError> {
        self.likelihood.simulate(params, rng)
    }
}
