use crate::calibration::SparseMatrix;
use crate::error::{LikelihoodError, ModelError};
use crate::model::{UvCoverage, VisModel, VisibilityModelTrait};

use enum_dispatch::enum_dispatch;
use ndarray::{Array1, ArrayView1, Zip};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Observed data with per-datum Gaussian-like noise
#[enum_dispatch]
pub trait DataProductTrait {
    /// Short human-readable name of the product kind
    fn kind(&self) -> &'static str;

    /// Number of observed values
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Noise standard deviation of every value
    fn sigma(&self) -> ArrayView1<'_, f64>;

    /// Number of measurement rows the product is computed from
    fn num_rows(&self) -> usize;

    /// Natural logarithm of the likelihood of the observed values given the model
    fn ln_likelihood(&self, model: &VisModel, uv: &UvCoverage) -> Result<f64, ModelError>;

    /// Copy of the product with values drawn from the noise distribution around the model
    fn simulate<R: Rng + ?Sized>(
        &self,
        model: &VisModel,
        uv: &UvCoverage,
        rng: &mut R,
    ) -> Result<DataProduct, ModelError>;

    /// Check noise levels and shapes against `num_rows` measurement rows
    fn validate(&self, index: usize, num_rows: usize) -> Result<(), LikelihoodError> {
        check_noise_and_rows(self, index, num_rows)
    }
}

/// A single data product of an observation
#[enum_dispatch(DataProductTrait)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DataProduct {
    ComplexVisibilities(ComplexVisibilities),
    Amplitudes(Amplitudes),
    ClosurePhases(ClosurePhases),
    LogClosureAmplitudes(LogClosureAmplitudes),
}

fn gaussian_ln_likelihood(
    observed: ArrayView1<f64>,
    predicted: ArrayView1<f64>,
    sigma: ArrayView1<f64>,
) -> f64 {
    let ln_norm = 0.5 * TAU.ln();
    Zip::from(observed)
        .and(predicted)
        .and(sigma)
        .fold(0.0, |acc, &obs, &pred, &s| {
            let residual = (obs - pred) / s;
            acc - 0.5 * residual * residual - s.ln() - ln_norm
        })
}

fn add_noise<R: Rng + ?Sized>(
    predicted: Array1<f64>,
    sigma: ArrayView1<f64>,
    rng: &mut R,
) -> Array1<f64> {
    Zip::from(&predicted)
        .and(sigma)
        .map_collect(|&pred, &s| pred + s * rng.sample::<f64, _>(StandardNormal))
}

fn validate_closure<P: DataProductTrait>(
    product: &P,
    design: &SparseMatrix<f64>,
    index: usize,
    num_rows: usize,
) -> Result<(), LikelihoodError> {
    if design.nrows() != product.len() {
        return Err(LikelihoodError::DesignRows {
            index,
            kind: product.kind(),
            actual: product.len(),
            expected: design.nrows(),
        });
    }
    check_noise_and_rows(product, index, num_rows)
}

/// Complex visibilities with circular complex Gaussian noise
///
/// `sigma` is the standard deviation of both the real and the imaginary part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplexVisibilities {
    pub values: Array1<Complex64>,
    pub sigma: Array1<f64>,
}

impl ComplexVisibilities {
    pub fn new(values: Array1<Complex64>, sigma: Array1<f64>) -> Self {
        Self { values, sigma }
    }
}

impl DataProductTrait for ComplexVisibilities {
    fn kind(&self) -> &'static str {
        "complex visibilities"
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn sigma(&self) -> ArrayView1<'_, f64> {
        self.sigma.view()
    }

    fn num_rows(&self) -> usize {
        self.values.len()
    }

    fn ln_likelihood(&self, model: &VisModel, uv: &UvCoverage) -> Result<f64, ModelError> {
        let predicted = model.visibilities(uv)?;
        Ok(Zip::from(&self.values)
            .and(&predicted)
            .and(&self.sigma)
            .fold(0.0, |acc, &obs, &pred, &s| {
                let variance = s * s;
                acc - (obs - pred).norm_sqr() / (2.0 * variance) - (TAU * variance).ln()
            }))
    }

    fn simulate<R: Rng + ?Sized>(
        &self,
        model: &VisModel,
        uv: &UvCoverage,
        rng: &mut R,
    ) -> Result<DataProduct, ModelError> {
        let predicted = model.visibilities(uv)?;
        let values = Zip::from(&predicted)
            .and(&self.sigma)
            .map_collect(|&pred, &s| {
                let re: f64 = rng.sample(StandardNormal);
                let im: f64 = rng.sample(StandardNormal);
                pred + s * Complex64::new(re, im)
            });
        Ok(Self::new(values, self.sigma.clone()).into())
    }
}

/// Visibility amplitudes with Gaussian noise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Amplitudes {
    pub values: Array1<f64>,
    pub sigma: Array1<f64>,
}

impl Amplitudes {
    pub fn new(values: Array1<f64>, sigma: Array1<f64>) -> Self {
        Self { values, sigma }
    }
}

impl DataProductTrait for Amplitudes {
    fn kind(&self) -> &'static str {
        "amplitudes"
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn sigma(&self) -> ArrayView1<'_, f64> {
        self.sigma.view()
    }

    fn num_rows(&self) -> usize {
        self.values.len()
    }

    fn ln_likelihood(&self, model: &VisModel, uv: &UvCoverage) -> Result<f64, ModelError> {
        let predicted = model.amplitudes(uv)?;
        Ok(gaussian_ln_likelihood(
            self.values.view(),
            predicted.view(),
            self.sigma.view(),
        ))
    }

    fn simulate<R: Rng + ?Sized>(
        &self,
        model: &VisModel,
        uv: &UvCoverage,
        rng: &mut R,
    ) -> Result<DataProduct, ModelError> {
        let values = add_noise(model.amplitudes(uv)?, self.sigma.view(), rng);
        Ok(Self::new(values, self.sigma.clone()).into())
    }
}

/// Closure phases (radians) with wrapped-normal-like noise
///
/// The log-likelihood of a residual `d` is `-(1 - cos d) / sigma^2`, periodic in `d` and equal to
/// the Gaussian one for small residuals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosurePhases {
    pub values: Array1<f64>,
    pub sigma: Array1<f64>,
    pub design: SparseMatrix<f64>,
}

impl ClosurePhases {
    pub fn new(values: Array1<f64>, sigma: Array1<f64>, design: SparseMatrix<f64>) -> Self {
        Self {
            values,
            sigma,
            design,
        }
    }
}

impl DataProductTrait for ClosurePhases {
    fn kind(&self) -> &'static str {
        "closure phases"
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn sigma(&self) -> ArrayView1<'_, f64> {
        self.sigma.view()
    }

    fn num_rows(&self) -> usize {
        self.design.ncols()
    }

    fn ln_likelihood(&self, model: &VisModel, uv: &UvCoverage) -> Result<f64, ModelError> {
        let predicted = model.closure_phases(uv, &self.design)?;
        let ln_norm = 0.5 * TAU.ln();
        Ok(Zip::from(&self.values)
            .and(&predicted)
            .and(&self.sigma)
            .fold(0.0, |acc, &obs, &pred, &s| {
                acc - 2.0 * (1.0 - (obs - pred).cos()) / (2.0 * s * s) - s.ln() - ln_norm
            }))
    }

    fn simulate<R: Rng + ?Sized>(
        &self,
        model: &VisModel,
        uv: &UvCoverage,
        rng: &mut R,
    ) -> Result<DataProduct, ModelError> {
        let values = add_noise(
            model.closure_phases(uv, &self.design)?,
            self.sigma.view(),
            rng,
        );
        Ok(Self::new(values, self.sigma.clone(), self.design.clone()).into())
    }

    fn validate(&self, index: usize, num_rows: usize) -> Result<(), LikelihoodError> {
        validate_closure(self, &self.design, index, num_rows)
    }
}

/// Log closure amplitudes with Gaussian noise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogClosureAmplitudes {
    pub values: Array1<f64>,
    pub sigma: Array1<f64>,
    pub design: SparseMatrix<f64>,
}

impl LogClosureAmplitudes {
    pub fn new(values: Array1<f64>, sigma: Array1<f64>, design: SparseMatrix<f64>) -> Self {
        Self {
            values,
            sigma,
            design,
        }
    }
}

impl DataProductTrait for LogClosureAmplitudes {
    fn kind(&self) -> &'static str {
        "log closure amplitudes"
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn sigma(&self) -> ArrayView1<'_, f64> {
        self.sigma.view()
    }

    fn num_rows(&self) -> usize {
        self.design.ncols()
    }

    fn ln_likelihood(&self, model: &VisModel, uv: &UvCoverage) -> Result<f64, ModelError> {
        let predicted = model.log_closure_amplitudes(uv, &self.design)?;
        Ok(gaussian_ln_likelihood(
            self.values.view(),
            predicted.view(),
            self.sigma.view(),
        ))
    }

    fn simulate<R: Rng + ?Sized>(
        &self,
        model: &VisModel,
        uv: &UvCoverage,
        rng: &mut R,
    ) -> Result<DataProduct, ModelError> {
        let values = add_noise(
            model.log_closure_amplitudes(uv, &self.design)?,
            self.sigma.view(),
            rng,
        );
        Ok(Self::new(values, self.sigma.clone(), self.design.clone()).into())
    }

    fn validate(&self, index: usize, num_rows: usize) -> Result<(), LikelihoodError> {
        validate_closure(self, &self.design, index, num_rows)
    }
}

fn check_noise_and_rows<P: DataProductTrait + ?Sized>(
    product: &P,
    index: usize,
    num_rows: usize,
) -> Result<(), LikelihoodError> {
    let kind = product.kind();
    let sigma = product.sigma();
    if sigma.len() != product.len() {
        return Err(LikelihoodError::SigmaLength {
            index,
            kind,
            actual: product.len(),
            expected: sigma.len(),
        });
    }
    if sigma.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
        return Err(LikelihoodError::InvalidSigma { index, kind });
    }
    if product.num_rows() != num_rows {
        return Err(LikelihoodError::RowMismatch {
            index,
            kind,
            actual: num_rows,
            expected: product.num_rows(),
        });
    }
    Ok(())
}
