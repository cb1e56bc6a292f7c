use crate::error::TransformError;
use crate::params::{ParamLayout, Params};
use crate::transforms::transform::{TransformTrait, check_dimension};

use macro_const::macro_const;
use ndarray::Array1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

macro_const! {
    const DOC: &str = r#"
Structural flattening of the natural parameters, log-Jacobian is zero
"#;
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawTransform {
    layout: Arc<ParamLayout>,
}

impl RawTransform {
    pub fn new(layout: Arc<ParamLayout>) -> Self {
        Self { layout }
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl TransformTrait for RawTransform {
    fn dimension(&self) -> usize {
        self.layout.size()
    }

    fn layout(&self) -> &Arc<ParamLayout> {
        &self.layout
    }

    fn in_domain(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
    }

    fn transform_with_logjac(&self, x: &[f64]) -> Result<(Params, f64), TransformError> {
        check_dimension(x.len(), self.dimension())?;
        Ok((Params::from_flat(self.layout.clone(), x.to_vec())?, 0.0))
    }

    fn inverse(&self, params: &Params) -> Result<Array1<f64>, TransformError> {
        check_dimension(params.len(), self.dimension())?;
        Ok(params.as_flat().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshape_only() {
        let layout = Arc::new(ParamLayout::new([("a", 2), ("b", 1)]).unwrap());
        let transform = RawTransform::new(layout);
        let (params, logjac) = transform.transform_with_logjac(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(logjac, 0.0);
        assert_eq!(params.block("b").unwrap().to_vec(), vec![3.0]);
        assert_eq!(transform.inverse(&params).unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }
}
