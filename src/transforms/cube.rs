use crate::error::TransformError;
use crate::params::{ParamLayout, Params};
use crate::prior::{LnPrior1D, LnPrior1DTrait, Prior};
use crate::transforms::transform::{TransformTrait, check_dimension};

use macro_const::macro_const;
use ndarray::Array1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

macro_const! {
    const DOC: &str = r#"
Transform from the open unit hypercube

Component `i` is `theta_i = Q_i(u_i)` with `Q_i` the quantile function of its prior, so a uniform
draw from the cube is a draw from the prior. The log-Jacobian is `-sum ln p_i(theta_i)`, which
makes the transformed density of a posterior equal to its likelihood. Points with any component
outside of `(0, 1)` are outside of the domain.
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CubeTransform {
    layout: Arc<ParamLayout>,
    components: Vec<LnPrior1D>,
}

impl CubeTransform {
    pub fn new(prior: &Prior) -> Self {
        Self {
            layout: prior.layout().clone(),
            components: prior.components().to_vec(),
        }
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl TransformTrait for CubeTransform {
    fn dimension(&self) -> usize {
        self.components.len()
    }

    fn layout(&self) -> &Arc<ParamLayout> {
        &self.layout
    }

    fn in_domain(&self, x: &[f64]) -> bool {
        x.len() == self.dimension() && x.iter().all(|&u| u > 0.0 && u < 1.0)
    }

    fn transform_with_logjac(&self, x: &[f64]) -> Result<(Params, f64), TransformError> {
        check_dimension(x.len(), self.dimension())?;
        let mut ln_prior = 0.0;
        let values: Vec<f64> = self
            .components
            .iter()
            .zip(x)
            .map(|(component, &u)| {
                let theta = component.quantile(u);
                ln_prior += component.ln_prior_1d(theta, None);
                theta
            })
            .collect();
        let logjac = if self.in_domain(x) {
            -ln_prior
        } else {
            f64::NEG_INFINITY
        };
        let params = Params::from_flat(self.layout.clone(), values)?;
        Ok((params, logjac))
    }

    fn inverse(&self, params: &Params) -> Result<Array1<f64>, TransformError> {
        check_dimension(params.len(), self.dimension())?;
        Ok(self
            .components
            .iter()
            .zip(params.as_flat())
            .map(|(component, &theta)| component.cdf(theta))
            .collect())
    }
}
