use crate::error::{LikelihoodError, ModelError};
use crate::likelihood::data_product::{DataProduct, DataProductTrait};
use crate::model::{UvCoverage, VisModel};
use crate::params::Params;

use rand::Rng;
use std::fmt;

/// Log-likelihood over the natural parameter space
pub trait LikelihoodTrait: Send + Sync {
    fn ln_likelihood(&self, params: &Params) -> f64;
}

impl<F> LikelihoodTrait for F
where
    F: Fn(&Params) -> f64 + Send + Sync,
{
    fn ln_likelihood(&self, params: &Params) -> f64 {
        self(params)
    }
}

/// Likelihood of interferometric data products
///
/// The builder turns a parameter value into a visibility model, typically a sky model wrapped
/// into a [crate::CorruptedModel] built from gain blocks of the parameters. Every data product
/// is evaluated against the same model and the log-likelihoods are summed.
pub struct RadioLikelihood<B> {
    builder: B,
    uv: UvCoverage,
    products: Vec<DataProduct>,
}

impl<B> RadioLikelihood<B>
where
    B: Fn(&Params) -> Result<VisModel, ModelError> + Send + Sync,
{
    pub fn new(
        builder: B,
        uv: UvCoverage,
        products: Vec<DataProduct>,
    ) -> Result<Self, LikelihoodError> {
        for (index, product) in products.iter().enumerate() {
            product.validate(index, uv.len())?;
        }
        Ok(Self {
            builder,
            uv,
            products,
        })
    }

    pub fn uv(&self) -> &UvCoverage {
        &self.uv
    }

    pub fn products(&self) -> &[DataProduct] {
        &self.products
    }

    /// Visibility model the likelihood evaluates at `params`
    pub fn visibility_model(&self, params: &Params) -> Result<VisModel, ModelError> {
        (self.builder)(params)
    }

    /// Log-likelihood reporting model failures instead of mapping them to `-inf`
    pub fn try_ln_likelihood(&self, params: &Params) -> Result<f64, ModelError> {
        let model = self.visibility_model(params)?;
        let mut total = 0.0;
        for product in &self.products {
            total += product.ln_likelihood(&model, &self.uv)?;
        }
        Ok(total)
    }

    /// One noise realization of every data product around the model at `params`
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        params: &Params,
        rng: &mut R,
    ) -> Result<Vec<DataProduct>, ModelError> {
        let model = self.visibility_model(params)?;
        self.products
            .iter()
            .map(|product| product.simulate(&model, &self.uv, rng))
            .collect()
    }
}

impl<B> LikelihoodTrait for RadioLikelihood<B>
where
    B: Fn(&Params) -> Result<VisModel, ModelError> + Send + Sync,
{
    fn ln_likelihood(&self, params: &Params) -> f64 {
        match self.try_ln_likelihood(params) {
            Ok(ln_lik) => ln_lik,
            Err(error) => {
                log::debug!("likelihood evaluation failed: {error}");
                f64::NEG_INFINITY
            }
        }
    }
}

impl<B> fmt::Debug for RadioLikelihood<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadioLikelihood")
            .field("uv", &self.uv)
            .field("products", &self.products)
            .finish_non_exhaustive()
    }
}
