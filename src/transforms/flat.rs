use crate::error::TransformError;
use crate::params::{ParamLayout, Params};
use crate::prior::{LnPrior1DTrait, Prior};
use crate::transforms::bijector::Bijector;
use crate::transforms::transform::{TransformTrait, check_dimension};

use macro_const::macro_const;
use ndarray::Array1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

macro_const! {
    const DOC: &str = r#"
Unconstrained transform onto the whole real space

Every bounded component is mapped from the real line by a [Bijector]. Angles are lifted to a
two-dimensional working space, `theta = atan2(y, x)`, with the radial term `-(x^2 + y^2) / 2`
added to the log-Jacobian so the lifted density is normalizable. The working space is larger than
the natural one by the number of angular components, and [TransformTrait::inverse] recovers the
direction `(cos theta, sin theta)` of a lifted angle.
"#;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum FlatComponent {
    Scalar(Bijector),
    Circle,
}

impl FlatComponent {
    fn dimension(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Circle => 2,
        }
    }
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlatTransform {
    layout: Arc<ParamLayout>,
    components: Vec<FlatComponent>,
}

impl FlatTransform {
    pub fn new(prior: &Prior) -> Self {
        let components = prior
            .components()
            .iter()
            .map(|c| match Bijector::from_support(c.support()) {
                Some(bijector) => FlatComponent::Scalar(bijector),
                None => FlatComponent::Circle,
            })
            .collect();
        Self {
            layout: prior.layout().clone(),
            components,
        }
    }

    pub fn components(&self) -> &[FlatComponent] {
        &self.components
    }

    pub const fn doc() -> &'static str {
        DOC
    }
}

impl TransformTrait for FlatTransform {
    fn dimension(&self) -> usize {
        self.components.iter().map(FlatComponent::dimension).sum()
    }

    fn layout(&self) -> &Arc<ParamLayout> {
        &self.layout
    }

    fn in_domain(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
    }

    fn transform_with_logjac(&self, x: &[f64]) -> Result<(Params, f64), TransformError> {
        check_dimension(x.len(), self.dimension())?;
        let mut values = Vec::with_capacity(self.components.len());
        let mut logjac = 0.0;
        let mut x = x;
        for component in &self.components {
            let (head, tail) = x.split_at(component.dimension());
            x = tail;
            match component {
                FlatComponent::Scalar(bijector) => {
                    values.push(bijector.forward(head[0]));
                    logjac += bijector.ln_abs_jacobian(head[0]);
                }
                FlatComponent::Circle => {
                    let (a, b) = (head[0], head[1]);
                    values.push(b.atan2(a));
                    logjac -= 0.5 * (a * a + b * b);
                }
            }
        }
        let params = Params::from_flat(self.layout.clone(), values)?;
        Ok((params, logjac))
    }

    fn inverse(&self, params: &Params) -> Result<Array1<f64>, TransformError> {
        check_dimension(params.len(), self.components.len())?;
        let mut x = Vec::with_capacity(self.dimension());
        for (component, &value) in self.components.iter().zip(params.as_flat()) {
            match component {
                FlatComponent::Scalar(bijector) => x.push(bijector.inverse(value)),
                FlatComponent::Circle => {
                    x.push(value.cos());
                    x.push(value.sin());
                }
            }
        }
        Ok(x.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::LnPrior1D;

    use approx::assert_relative_eq;
    use hyperdual::Hyperdual;

    fn prior() -> Prior {
        Prior::new([
            (
                "sky",
                vec![
                    LnPrior1D::log_uniform(0.1, 10.0),
                    LnPrior1D::uniform(-2.0, 3.0),
                    LnPrior1D::normal(0.0, 1.0),
                ],
            ),
            ("gphase", vec![LnPrior1D::circular_uniform(); 2]),
        ])
        .unwrap()
    }

    #[test]
    fn dimension_counts_lifted_angles() {
        let transform = FlatTransform::new(&prior());
        assert_eq!(transform.layout().size(), 5);
        assert_eq!(transform.dimension(), 7);
    }

    #[test]
    fn round_trip_of_scalar_components() {
        let prior = prior();
        let transform = FlatTransform::new(&prior);
        let params = Params::from_flat(
            prior.layout().clone(),
            vec![2.0, 0.5, -1.3, 0.3, -2.0],
        )
        .unwrap();
        let x = transform.inverse(&params).unwrap();
        let restored = transform.transform(x.as_slice().unwrap()).unwrap();
        for (a, b) in restored.as_flat().iter().zip(params.as_flat()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn lifted_angle_keeps_direction() {
        let transform = FlatTransform::new(&prior());
        let x = [0.0, 0.0, 0.0, 3.0, 3.0, -0.5, 0.0];
        let params = transform.transform(&x).unwrap();
        let angles = params.block("gphase").unwrap();
        assert_relative_eq!(angles[0], std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(angles[1], std::f64::consts::PI, epsilon = 1e-12);
    }

    #[test]
    fn lifted_angle_round_trip_through_unit_circle() {
        let transform = FlatTransform::new(&prior());
        let x = [0.3, -1.2, 0.8, 3.0, -4.0, -0.2, 0.7];
        let params = transform.transform(&x).unwrap();
        let x_back = transform.inverse(&params).unwrap();
        // The lifted pair comes back on the unit circle, not at its original radius
        assert_relative_eq!(x_back[3], 0.6, epsilon = 1e-12);
        assert_relative_eq!(x_back[4], -0.8, epsilon = 1e-12);
        for (a, b) in x_back.iter().zip(x.iter()).take(3) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }

        let restored = transform.transform(x_back.as_slice().unwrap()).unwrap();
        for (a, b) in restored.as_flat().iter().zip(params.as_flat()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn logjac_is_sum_of_component_derivatives() {
        let prior = prior();
        let transform = FlatTransform::new(&prior);
        let x = [0.3, -1.2, 0.8, 0.5, -0.25, 1.5, 2.0];
        let (_, logjac) = transform.transform_with_logjac(&x).unwrap();

        let mut desired = 0.0;
        for (i, &z) in x[..3].iter().enumerate() {
            let FlatComponent::Scalar(bijector) = transform.components()[i] else {
                panic!("first three components are scalar");
            };
            let mut z_dual = Hyperdual::<f64, 2>::from_real(z);
            z_dual[1] = 1.0;
            desired += bijector.forward(z_dual)[1].abs().ln();
        }
        desired -= 0.5 * (0.5_f64.powi(2) + 0.25_f64.powi(2));
        desired -= 0.5 * (1.5_f64.powi(2) + 2.0_f64.powi(2));
        assert_relative_eq!(logjac, desired, epsilon = 1e-9);
    }

    #[test]
    fn wrong_dimension() {
        let transform = FlatTransform::new(&prior());
        assert_eq!(
            transform.transform(&[0.0; 5]),
            Err(TransformError::DimensionMismatch {
                actual: 5,
                expected: 7
            })
        );
        assert!(!transform.in_domain(&[0.0; 5]));
    }

    #[test]
    fn serialization() {
        let transform = FlatTransform::new(&prior());
        let serialized = serde_json::to_string(&transform).unwrap();
        let deserialized: FlatTransform = serde_json::from_str(&serialized).unwrap();
        assert_eq!(transform, deserialized);
    }
}
