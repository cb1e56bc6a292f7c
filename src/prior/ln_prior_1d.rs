use enum_dispatch::enum_dispatch;
use ordered_float::NotNan;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2, TAU};
use std::fmt::Debug;
use std::hash::Hash;

/// Support of a single prior component
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Support {
    /// The whole real line
    Real,
    /// `(lower, +inf)`
    LowerBounded(f64),
    /// `(-inf, upper)`
    UpperBounded(f64),
    /// `(lower, upper)`
    Interval(f64, f64),
    /// An angle, periodic with period `2 pi`, canonical range `[-pi, pi)`
    Circle,
}

#[enum_dispatch]
pub trait LnPrior1DTrait:
    Clone + Debug + Serialize + DeserializeOwned + PartialEq + Eq + Hash
{
    /// Evaluate the natural logarithm of the prior at x
    ///
    /// If `grad` is `Some`, the gradient d(ln_prior)/dx is also computed and stored in it.
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64;

    fn support(&self) -> Support;

    /// Cumulative distribution function
    fn cdf(&self, x: f64) -> f64;

    /// Inverse of [LnPrior1DTrait::cdf], defined on `(0, 1)`
    fn quantile(&self, u: f64) -> f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;
}

/// Natural logarithm of prior for a single scalar parameter
#[enum_dispatch(LnPrior1DTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LnPrior1D {
    Normal(NormalLnPrior1D),
    LogNormal(LogNormalLnPrior1D),
    Uniform(UniformLnPrior1D),
    LogUniform(LogUniformLnPrior1D),
    CircularUniform(CircularUniformLnPrior1D),
}

impl LnPrior1D {
    pub fn normal(mu: f64, std: f64) -> Self {
        NormalLnPrior1D::new(mu, std).into()
    }

    pub fn log_normal(mu: f64, std: f64) -> Self {
        LogNormalLnPrior1D::new(mu, std).into()
    }

    pub fn uniform(left: f64, right: f64) -> Self {
        UniformLnPrior1D::new(left, right).into()
    }

    pub fn log_uniform(left: f64, right: f64) -> Self {
        LogUniformLnPrior1D::new(left, right).into()
    }

    pub fn circular_uniform() -> Self {
        CircularUniformLnPrior1D {}.into()
    }
}

#[inline]
fn std_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

#[inline]
fn std_normal_quantile(u: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * u)
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(into = "NormalLnPrior1DParameters", from = "NormalLnPrior1DParameters")]
pub struct NormalLnPrior1D {
    mu: NotNan<f64>,
    std: NotNan<f64>,
    ln_prob_coeff: NotNan<f64>,
}

impl NormalLnPrior1D {
    pub fn new(mu: f64, std: f64) -> Self {
        assert!(std > 0.0, "std must be positive");
        Self {
            mu: NotNan::new(mu).expect("mu must be not NaN"),
            std: NotNan::new(std).expect("std must be positive and finite"),
            ln_prob_coeff: NotNan::new(-f64::ln(std) - 0.5 * f64::ln(TAU))
                .expect("std must be positive and finite"),
        }
    }

    fn mu(&self) -> f64 {
        self.mu.into_inner()
    }

    fn std(&self) -> f64 {
        self.std.into_inner()
    }
}

impl LnPrior1DTrait for NormalLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        let inv_std2 = self.std().powi(-2);
        let diff = self.mu() - x;
        if let Some(g) = grad {
            *g = diff * inv_std2;
        }
        self.ln_prob_coeff.into_inner() - 0.5 * diff.powi(2) * inv_std2
    }

    fn support(&self) -> Support {
        Support::Real
    }

    fn cdf(&self, x: f64) -> f64 {
        std_normal_cdf((x - self.mu()) / self.std())
    }

    fn quantile(&self, u: f64) -> f64 {
        self.mu() + self.std() * std_normal_quantile(u)
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        self.mu() + self.std() * z
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "NormalLnPrior1D")]
struct NormalLnPrior1DParameters {
    mu: f64,
    std: f64,
}

impl From<NormalLnPrior1D> for NormalLnPrior1DParameters {
    fn from(f: NormalLnPrior1D) -> Self {
        Self {
            mu: f.mu(),
            std: f.std(),
        }
    }
}

impl From<NormalLnPrior1DParameters> for NormalLnPrior1D {
    fn from(f: NormalLnPrior1DParameters) -> Self {
        Self::new(f.mu, f.std)
    }
}

/// Normal distribution of `ln(x)`, mostly used for gain amplitudes
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "LogNormalLnPrior1DParameters",
    from = "LogNormalLnPrior1DParameters"
)]
pub struct LogNormalLnPrior1D {
    normal: NormalLnPrior1D,
}

impl LogNormalLnPrior1D {
    pub fn new(mu: f64, std: f64) -> Self {
        Self {
            normal: NormalLnPrior1D::new(mu, std),
        }
    }
}

impl LnPrior1DTrait for LogNormalLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        if !(x > 0.0) {
            if let Some(g) = grad {
                *g = 0.0;
            }
            return f64::NEG_INFINITY;
        }
        let ln_x = f64::ln(x);
        let mut normal_grad = 0.0;
        let ln_prior = self.normal.ln_prior_1d(ln_x, Some(&mut normal_grad)) - ln_x;
        if let Some(g) = grad {
            *g = (normal_grad - 1.0) / x;
        }
        ln_prior
    }

    fn support(&self) -> Support {
        Support::LowerBounded(0.0)
    }

    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            0.0
        } else {
            self.normal.cdf(x.ln())
        }
    }

    fn quantile(&self, u: f64) -> f64 {
        self.normal.quantile(u).exp()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.normal.sample(rng).exp()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "LogNormalLnPrior1D")]
struct LogNormalLnPrior1DParameters {
    mu: f64,
    std: f64,
}

impl From<LogNormalLnPrior1D> for LogNormalLnPrior1DParameters {
    fn from(f: LogNormalLnPrior1D) -> Self {
        Self {
            mu: f.normal.mu(),
            std: f.normal.std(),
        }
    }
}

impl From<LogNormalLnPrior1DParameters> for LogNormalLnPrior1D {
    fn from(f: LogNormalLnPrior1DParameters) -> Self {
        Self::new(f.mu, f.std)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "UniformLnPrior1DParameters",
    from = "UniformLnPrior1DParameters"
)]
pub struct UniformLnPrior1D {
    range: std::ops::RangeInclusive<NotNan<f64>>,
    ln_prob: NotNan<f64>,
}

impl UniformLnPrior1D {
    pub fn new(left: f64, right: f64) -> Self {
        assert!(left < right, "right must be larger than left");
        let left = NotNan::new(left).expect("left must be finite");
        let right = NotNan::new(right).expect("right must be finite");
        Self {
            range: left..=right,
            ln_prob: NotNan::new(-f64::ln(right.into_inner() - left.into_inner()))
                .expect("right must be larger than left"),
        }
    }

    fn left(&self) -> f64 {
        self.range.start().into_inner()
    }

    fn right(&self) -> f64 {
        self.range.end().into_inner()
    }
}

impl LnPrior1DTrait for UniformLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        if let Some(g) = grad {
            *g = 0.0;
        }
        match NotNan::new(x) {
            Ok(x) if self.range.contains(&x) => self.ln_prob.into_inner(),
            _ => f64::NEG_INFINITY,
        }
    }

    fn support(&self) -> Support {
        Support::Interval(self.left(), self.right())
    }

    fn cdf(&self, x: f64) -> f64 {
        ((x - self.left()) / (self.right() - self.left())).clamp(0.0, 1.0)
    }

    fn quantile(&self, u: f64) -> f64 {
        self.left() + u * (self.right() - self.left())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.quantile(rng.random::<f64>())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "UniformLnPrior1D")]
struct UniformLnPrior1DParameters {
    range: std::ops::RangeInclusive<f64>,
}

impl From<UniformLnPrior1D> for UniformLnPrior1DParameters {
    fn from(f: UniformLnPrior1D) -> Self {
        Self {
            range: f.left()..=f.right(),
        }
    }
}

impl From<UniformLnPrior1DParameters> for UniformLnPrior1D {
    fn from(f: UniformLnPrior1DParameters) -> Self {
        Self::new(*f.range.start(), *f.range.end())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "LogUniformLnPrior1DParameters",
    from = "LogUniformLnPrior1DParameters"
)]
pub struct LogUniformLnPrior1D {
    ln_range: std::ops::RangeInclusive<NotNan<f64>>,
    ln_prob_coeff: NotNan<f64>,
}

impl LogUniformLnPrior1D {
    pub fn new(left: f64, right: f64) -> Self {
        assert!(left < right, "right must be larger than left");
        let ln_left = NotNan::new(f64::ln(left)).expect("left must be positive and finite");
        let ln_right = NotNan::new(f64::ln(right)).expect("right must be positive and finite");
        Self {
            ln_range: ln_left..=ln_right,
            ln_prob_coeff: NotNan::new(-f64::ln(ln_right.into_inner() - ln_left.into_inner()))
                .expect("right must be larger than left"),
        }
    }

    fn ln_left(&self) -> f64 {
        self.ln_range.start().into_inner()
    }

    fn ln_right(&self) -> f64 {
        self.ln_range.end().into_inner()
    }
}

impl LnPrior1DTrait for LogUniformLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        match NotNan::new(f64::ln(x)) {
            Ok(ln_x) if self.ln_range.contains(&ln_x) => {
                if let Some(g) = grad {
                    *g = -1.0 / x;
                }
                self.ln_prob_coeff.into_inner() - ln_x.into_inner()
            }
            _ => {
                if let Some(g) = grad {
                    *g = 0.0;
                }
                f64::NEG_INFINITY
            }
        }
    }

    fn support(&self) -> Support {
        Support::Interval(self.ln_left().exp(), self.ln_right().exp())
    }

    fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        ((x.ln() - self.ln_left()) / (self.ln_right() - self.ln_left())).clamp(0.0, 1.0)
    }

    fn quantile(&self, u: f64) -> f64 {
        (self.ln_left() + u * (self.ln_right() - self.ln_left())).exp()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.quantile(rng.random::<f64>())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "LogUniformLnPrior1D")]
struct LogUniformLnPrior1DParameters {
    ln_range: std::ops::RangeInclusive<f64>,
}

impl From<LogUniformLnPrior1D> for LogUniformLnPrior1DParameters {
    fn from(f: LogUniformLnPrior1D) -> Self {
        Self {
            ln_range: f.ln_left()..=f.ln_right(),
        }
    }
}

impl From<LogUniformLnPrior1DParameters> for LogUniformLnPrior1D {
    fn from(f: LogUniformLnPrior1DParameters) -> Self {
        Self::new(f.ln_range.start().exp(), f.ln_range.end().exp())
    }
}

/// Uniform distribution of an angle, used for gain phases
///
/// The density is periodic, every finite angle is inside the support.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct CircularUniformLnPrior1D {}

impl LnPrior1DTrait for CircularUniformLnPrior1D {
    fn ln_prior_1d(&self, x: f64, grad: Option<&mut f64>) -> f64 {
        if let Some(g) = grad {
            *g = 0.0;
        }
        if x.is_finite() {
            -f64::ln(TAU)
        } else {
            f64::NEG_INFINITY
        }
    }

    fn support(&self) -> Support {
        Support::Circle
    }

    fn cdf(&self, x: f64) -> f64 {
        ((x + PI) / TAU).clamp(0.0, 1.0)
    }

    fn quantile(&self, u: f64) -> f64 {
        TAU * u - PI
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.quantile(rng.random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hyperdual::Hyperdual;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ln_prior_normal<T: num_traits::Float>(x: T, mu: f64, std: f64) -> T {
        let mu_t = T::from(mu).unwrap();
        let std_t = T::from(std).unwrap();
        let diff = mu_t - x;
        let inv_std2 = T::one() / (std_t * std_t);
        let ln_prob_coeff = -T::ln(std_t) - T::from(0.5).unwrap() * T::ln(T::from(TAU).unwrap());
        ln_prob_coeff - T::from(0.5).unwrap() * diff * diff * inv_std2
    }

    fn ln_prior_log_normal<T: num_traits::Float>(x: T, mu: f64, std: f64) -> T {
        let ln_x = T::ln(x);
        ln_prior_normal(ln_x, mu, std) - ln_x
    }

    fn ln_prior_log_uniform<T: num_traits::Float>(x: T, left: f64, right: f64) -> T {
        -T::from(f64::ln(right.ln() - left.ln())).unwrap() - T::ln(x)
    }

    fn check_gradient<F, P>(f: F, test_values: &[f64], prior: P)
    where
        F: Fn(Hyperdual<f64, 2>) -> Hyperdual<f64, 2>,
        P: LnPrior1DTrait,
    {
        for &x in test_values {
            let mut actual_grad = 0.0;
            let actual_ln_p = prior.ln_prior_1d(x, Some(&mut actual_grad));
            assert!(actual_ln_p.is_finite());

            let mut x_dual = Hyperdual::<f64, 2>::from_real(x);
            x_dual[1] = 1.0;
            let ln_p_dual = f(x_dual);
            assert_relative_eq!(actual_ln_p, ln_p_dual[0], epsilon = 1e-12);
            assert_relative_eq!(actual_grad, ln_p_dual[1], epsilon = 1e-9);
        }
    }

    fn check_quantile_inverts_cdf(prior: LnPrior1D, us: &[f64]) {
        for &u in us {
            let x = prior.quantile(u);
            assert_relative_eq!(prior.cdf(x), u, epsilon = 1e-10);
        }
    }

    #[test]
    fn normal_gradient() {
        check_gradient(
            |x| ln_prior_normal(x, 5.0, 2.0),
            &[0.0, 3.0, 5.0, 7.0, 10.0],
            NormalLnPrior1D::new(5.0, 2.0),
        );
    }

    #[test]
    fn log_normal_gradient() {
        check_gradient(
            |x| ln_prior_log_normal(x, 0.0, 0.1),
            &[0.5, 0.9, 1.0, 1.1, 2.0],
            LogNormalLnPrior1D::new(0.0, 0.1),
        );
    }

    #[test]
    fn log_uniform_gradient() {
        check_gradient(
            |x| ln_prior_log_uniform(x, 1.0, 10.0),
            &[1.5, 3.0, 9.0],
            LogUniformLnPrior1D::new(1.0, 10.0),
        );
    }

    #[test]
    fn quantiles() {
        let us = [1e-6, 0.01, 0.3, 0.5, 0.77, 0.999];
        check_quantile_inverts_cdf(LnPrior1D::normal(-3.0, 0.5), &us);
        check_quantile_inverts_cdf(LnPrior1D::log_normal(0.0, 0.2), &us);
        check_quantile_inverts_cdf(LnPrior1D::uniform(-1.0, 4.0), &us);
        check_quantile_inverts_cdf(LnPrior1D::log_uniform(0.1, 100.0), &us);
        check_quantile_inverts_cdf(LnPrior1D::circular_uniform(), &us);
    }

    #[test]
    fn normal_median_and_tails() {
        let prior = LnPrior1D::normal(2.0, 3.0);
        assert_relative_eq!(prior.quantile(0.5), 2.0, epsilon = 1e-12);
        assert_relative_eq!(prior.cdf(2.0 + 3.0 * 1.959963984540054), 0.975, epsilon = 1e-9);
    }

    #[test]
    fn out_of_support_is_neg_infinity() {
        assert_eq!(
            LnPrior1D::uniform(0.0, 1.0).ln_prior_1d(1.5, None),
            f64::NEG_INFINITY
        );
        assert_eq!(
            LnPrior1D::log_normal(0.0, 1.0).ln_prior_1d(-1.0, None),
            f64::NEG_INFINITY
        );
        assert_eq!(
            LnPrior1D::log_uniform(1.0, 2.0).ln_prior_1d(0.5, None),
            f64::NEG_INFINITY
        );
        assert_eq!(
            LnPrior1D::uniform(0.0, 1.0).ln_prior_1d(f64::NAN, None),
            f64::NEG_INFINITY
        );
        assert_eq!(
            LnPrior1D::circular_uniform().ln_prior_1d(f64::INFINITY, None),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn samples_are_inside_support() {
        let mut rng = StdRng::seed_from_u64(0);
        let priors = [
            LnPrior1D::normal(0.0, 1.0),
            LnPrior1D::log_normal(0.0, 0.1),
            LnPrior1D::uniform(-2.0, -1.0),
            LnPrior1D::log_uniform(1e-3, 1.0),
            LnPrior1D::circular_uniform(),
        ];
        for prior in priors {
            for _ in 0..100 {
                let x = prior.sample(&mut rng);
                assert!(prior.ln_prior_1d(x, None).is_finite(), "{prior:?} {x}");
            }
        }
    }

    #[test]
    fn serialization() {
        let priors = [
            LnPrior1D::normal(0.0, 1.0),
            LnPrior1D::log_normal(0.0, 0.1),
            LnPrior1D::uniform(-2.0, -1.0),
            LnPrior1D::log_uniform(1e-3, 1.0),
            LnPrior1D::circular_uniform(),
        ];
        for prior in priors {
            let serialized = serde_json::to_string(&prior).unwrap();
            let deserialized: LnPrior1D = serde_json::from_str(&serialized).unwrap();
            for x in [0.1, 0.5, 0.9] {
                assert_relative_eq!(
                    prior.ln_prior_1d(x, None),
                    deserialized.ln_prior_1d(x, None),
                    epsilon = 1e-12
                );
            }
        }
    }
}
