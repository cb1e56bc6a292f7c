use crate::error::TransformError;
use crate::params::{ParamLayout, Params};
use crate::prior::Prior;

use enum_dispatch::enum_dispatch;
use ndarray::Array1;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

pub(super) fn check_dimension(actual: usize, expected: usize) -> Result<(), TransformError> {
    if actual == expected {
        Ok(())
    } else {
        Err(TransformError::DimensionMismatch { actual, expected })
    }
}

/// Map between a flat working space and the natural parameter space
#[enum_dispatch]
pub trait TransformTrait:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + JsonSchema
{
    /// Size of the working space
    fn dimension(&self) -> usize;

    /// Layout of the natural parameters produced by the transform
    fn layout(&self) -> &Arc<ParamLayout>;

    /// Is `x` a valid working-space point
    fn in_domain(&self, x: &[f64]) -> bool;

    /// Natural parameters and `ln |det J|` at `x`
    ///
    /// The log-Jacobian is `-inf` for `x` of the right length outside of the domain.
    fn transform_with_logjac(&self, x: &[f64]) -> Result<(Params, f64), TransformError>;

    fn transform(&self, x: &[f64]) -> Result<Params, TransformError> {
        self.transform_with_logjac(x).map(|(params, _)| params)
    }

    /// Working-space point of natural parameters
    fn inverse(&self, params: &Params) -> Result<Array1<f64>, TransformError>;
}

#[enum_dispatch(TransformTrait)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[non_exhaustive]
pub enum Transform {
    Flat(super::flat::FlatTransform),
    Cube(super::cube::CubeTransform),
    Raw(super::raw::RawTransform),
}

impl Transform {
    pub fn flat(prior: &Prior) -> Self {
        super::flat::FlatTransform::new(prior).into()
    }

    pub fn cube(prior: &Prior) -> Self {
        super::cube::CubeTransform::new(prior).into()
    }

    pub fn raw(layout: &Arc<ParamLayout>) -> Self {
        super::raw::RawTransform::new(layout.clone()).into()
    }
}
