use crate::prior::Support;

use num_traits::Float;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Smooth bijection from the real line onto the support of a scalar component
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum Bijector {
    /// `x = z`
    Identity,
    /// `x = lower + exp(z)`
    LowerBounded { lower: f64 },
    /// `x = upper - exp(z)`
    UpperBounded { upper: f64 },
    /// `x = lower + (upper - lower) / (1 + exp(-z))`
    Interval { lower: f64, upper: f64 },
}

impl Bijector {
    /// Bijector onto a non-periodic support, `None` for [Support::Circle]
    pub fn from_support(support: Support) -> Option<Self> {
        match support {
            Support::Real => Some(Self::Identity),
            Support::LowerBounded(lower) => Some(Self::LowerBounded { lower }),
            Support::UpperBounded(upper) => Some(Self::UpperBounded { upper }),
            Support::Interval(lower, upper) => Some(Self::Interval { lower, upper }),
            Support::Circle => None,
        }
    }

    pub fn forward<T: Float>(&self, z: T) -> T {
        match *self {
            Self::Identity => z,
            Self::LowerBounded { lower } => from_f64::<T>(lower) + z.exp(),
            Self::UpperBounded { upper } => from_f64::<T>(upper) - z.exp(),
            Self::Interval { lower, upper } => {
                from_f64::<T>(lower) + from_f64::<T>(upper - lower) / (T::one() + (-z).exp())
            }
        }
    }

    /// `ln |dx/dz|`
    pub fn ln_abs_jacobian<T: Float>(&self, z: T) -> T {
        match *self {
            Self::Identity => T::zero(),
            Self::LowerBounded { .. } | Self::UpperBounded { .. } => z,
            // ln(w) + ln(s(z)) + ln(s(-z)) with s the logistic function
            Self::Interval { lower, upper } => {
                let abs_z = z.abs();
                from_f64::<T>((upper - lower).ln())
                    - abs_z
                    - from_f64::<T>(2.0) * (-abs_z).exp().ln_1p()
            }
        }
    }

    pub fn inverse(&self, x: f64) -> f64 {
        match *self {
            Self::Identity => x,
            Self::LowerBounded { lower } => (x - lower).ln(),
            Self::UpperBounded { upper } => (upper - x).ln(),
            Self::Interval { lower, upper } => {
                let p = (x - lower) / (upper - lower);
                (p / (1.0 - p)).ln()
            }
        }
    }
}

fn from_f64<T: Float>(x: f64) -> T {
    T::from(x).expect("f64 is representable by any Float")
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use hyperdual::Hyperdual;

    fn bijectors() -> [Bijector; 4] {
        [
            Bijector::Identity,
            Bijector::LowerBounded { lower: 0.0 },
            Bijector::UpperBounded { upper: 3.0 },
            Bijector::Interval {
                lower: -1.0,
                upper: 5.0,
            },
        ]
    }

    #[test]
    fn ln_jacobian_matches_dual_derivative() {
        for bijector in bijectors() {
            for &z in &[-20.0, -3.0, -0.5, 0.0, 0.7, 4.0, 20.0] {
                let mut z_dual = Hyperdual::<f64, 2>::from_real(z);
                z_dual[1] = 1.0;
                let x_dual = bijector.forward(z_dual);
                assert_relative_eq!(x_dual[0], bijector.forward(z), epsilon = 1e-12);
                assert_relative_eq!(
                    bijector.ln_abs_jacobian(z),
                    x_dual[1].abs().ln(),
                    epsilon = 1e-9,
                    max_relative = 1e-9,
                );
            }
        }
    }

    #[test]
    fn inverse_round_trip() {
        for bijector in bijectors() {
            for &z in &[-5.0, -0.5, 0.0, 0.7, 4.0] {
                let x = bijector.forward(z);
                assert_relative_eq!(bijector.inverse(x), z, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn forward_stays_in_support() {
        let interval = Bijector::Interval {
            lower: -1.0,
            upper: 5.0,
        };
        assert!(interval.forward(-800.0) >= -1.0);
        assert!(interval.forward(800.0) <= 5.0);
        assert!(Bijector::LowerBounded { lower: 2.0 }.forward(-800.0) >= 2.0);
    }

    #[test]
    fn circle_has_no_scalar_bijector() {
        assert_eq!(Bijector::from_support(Support::Circle), None);
        assert_eq!(
            Bijector::from_support(Support::LowerBounded(0.0)),
            Some(Bijector::LowerBounded { lower: 0.0 })
        );
    }
}
