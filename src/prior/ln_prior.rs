use crate::error::ParamsError;
use crate::params::{ParamLayout, Params};
use crate::prior::ln_prior_1d::{LnPrior1D, LnPrior1DTrait};

use ndarray::Array1;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prior over the natural parameter space made of independent scalar components
///
/// Components are grouped in named blocks, the block structure defines the [ParamLayout] of
/// every [Params] value the prior evaluates or samples.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(into = "PriorParameters", try_from = "PriorParameters")]
pub struct Prior {
    layout: Arc<ParamLayout>,
    components: Vec<LnPrior1D>,
}

impl Prior {
    pub fn new<S>(
        blocks: impl IntoIterator<Item = (S, Vec<LnPrior1D>)>,
    ) -> Result<Self, ParamsError>
    where
        S: Into<String>,
    {
        let mut names = vec![];
        let mut components = vec![];
        for (name, block) in blocks {
            names.push((name.into(), block.len()));
            components.extend(block);
        }
        Ok(Self {
            layout: Arc::new(ParamLayout::new(names)?),
            components,
        })
    }

    pub fn layout(&self) -> &Arc<ParamLayout> {
        &self.layout
    }

    /// Components in the flat order of the layout
    pub fn components(&self) -> &[LnPrior1D] {
        &self.components
    }

    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    /// Natural logarithm of the prior density
    ///
    /// Stops at the first component outside of its support and returns `-inf`.
    pub fn ln_prior(&self, params: &Params) -> f64 {
        self.ln_prior_iter(params.len(), params.as_flat().iter().copied())
    }

    pub fn ln_prior_flat(&self, values: &[f64]) -> f64 {
        self.ln_prior_iter(values.len(), values.iter().copied())
    }

    fn ln_prior_iter(&self, len: usize, values: impl Iterator<Item = f64>) -> f64 {
        if len != self.components.len() {
            return f64::NEG_INFINITY;
        }
        let mut total = 0.0;
        for (x, component) in values.zip(self.components.iter()) {
            total += component.ln_prior_1d(x, None);
            if !total.is_finite() {
                return f64::NEG_INFINITY;
            }
        }
        total
    }

    /// Natural logarithm of the prior density and its gradient
    ///
    /// Returns `-inf` and leaves `grad` untouched when its length or the parameter length differs
    /// from the prior dimension.
    pub fn ln_prior_with_grad(&self, params: &Params, grad: &mut [f64]) -> f64 {
        if grad.len() != self.components.len() || params.len() != self.components.len() {
            return f64::NEG_INFINITY;
        }
        params
            .as_flat()
            .iter()
            .zip(self.components.iter())
            .zip(grad.iter_mut())
            .map(|((&x, component), g)| component.ln_prior_1d(x, Some(g)))
            .sum()
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Params {
        let values: Array1<f64> = self.components.iter().map(|c| c.sample(rng)).collect();
        Params::from_flat(self.layout.clone(), values)
            .expect("components are aligned with the layout")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "Prior")]
struct PriorParameters {
    blocks: Vec<PriorBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct PriorBlock {
    name: String,
    components: Vec<LnPrior1D>,
}

impl From<Prior> for PriorParameters {
    fn from(prior: Prior) -> Self {
        let blocks = prior
            .layout
            .blocks()
            .map(|(name, range)| PriorBlock {
                name: name.to_string(),
                components: prior.components[range].to_vec(),
            })
            .collect();
        Self { blocks }
    }
}

impl TryFrom<PriorParameters> for Prior {
    type Error = ParamsError;

    fn try_from(p: PriorParameters) -> Result<Self, Self::Error> {
        Self::new(p.blocks.into_iter().map(|b| (b.name, b.components)))
    }
}
