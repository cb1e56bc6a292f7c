use crate::calibration::{GainCache, SparseMatrix, corrupt};
use crate::error::{CorruptionError, ModelError};
use crate::model::uv::UvCoverage;

use enum_dispatch::enum_dispatch;
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use std::fmt;
use std::sync::Arc;

/// Queries every visibility model answers for a set of measurement rows
#[enum_dispatch]
pub trait VisibilityModelTrait: Clone + fmt::Debug + Send + Sync {
    /// Complex visibility of every uv point
    fn visibilities(&self, uv: &UvCoverage) -> Result<Array1<Complex64>, ModelError>;

    /// Visibility amplitude of every uv point
    fn amplitudes(&self, uv: &UvCoverage) -> Result<Array1<f64>, ModelError> {
        Ok(self.visibilities(uv)?.mapv(|v| v.norm()))
    }

    /// Closure phases `design · arg(V)`, `design` maps measurement rows onto triangles
    fn closure_phases(
        &self,
        uv: &UvCoverage,
        design: &SparseMatrix<f64>,
    ) -> Result<Array1<f64>, ModelError> {
        let phases = self.visibilities(uv)?.mapv(|v| v.arg());
        Ok(design.mul_vec(phases.view())?)
    }

    /// Log closure amplitudes `design · ln|V|`, `design` maps measurement rows onto quadrangles
    fn log_closure_amplitudes(
        &self,
        uv: &UvCoverage,
        design: &SparseMatrix<f64>,
    ) -> Result<Array1<f64>, ModelError> {
        let ln_amplitudes = self.visibilities(uv)?.mapv(|v| v.norm().ln());
        Ok(design.mul_vec(ln_amplitudes.view())?)
    }
}

/// Visibility model
#[enum_dispatch(VisibilityModelTrait)]
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum VisModel {
    Sky(SkyModel),
    Corrupted(CorruptedModel),
}

type VisibilityFn = dyn Fn(f64, f64) -> Complex64 + Send + Sync;

/// Sky brightness model given by its Fourier transform
///
/// The function maps a baseline coordinate `(u, v)` to the complex visibility of the source.
#[derive(Clone)]
pub struct SkyModel {
    visibility: Arc<VisibilityFn>,
}

impl SkyModel {
    pub fn new<F>(visibility: F) -> Self
    where
        F: Fn(f64, f64) -> Complex64 + Send + Sync + 'static,
    {
        Self {
            visibility: Arc::new(visibility),
        }
    }

    /// Unresolved source of the given flux density
    pub fn point(flux: f64) -> Self {
        Self::new(move |_, _| Complex64::new(flux, 0.0))
    }

    /// Circular Gaussian of the given flux and standard deviation (radians) at the phase center
    pub fn gaussian(flux: f64, sigma: f64) -> Self {
        let factor = -2.0 * std::f64::consts::PI.powi(2) * sigma.powi(2);
        Self::new(move |u, v| Complex64::new(flux * (factor * (u * u + v * v)).exp(), 0.0))
    }

    /// The same model displaced to `(x, y)` radians on the sky
    pub fn shifted(self, x: f64, y: f64) -> Self {
        let base = self.visibility;
        Self::new(move |u, v| {
            base(u, v) * Complex64::from_polar(1.0, -std::f64::consts::TAU * (u * x + v * y))
        })
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Complex64 {
        (self.visibility)(u, v)
    }
}

impl fmt::Debug for SkyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkyModel").finish_non_exhaustive()
    }
}

impl VisibilityModelTrait for SkyModel {
    fn visibilities(&self, uv: &UvCoverage) -> Result<Array1<Complex64>, ModelError> {
        Ok(uv.points().map(|(u, v)| self.evaluate(u, v)).collect())
    }
}

/// Base model seen through station gains
///
/// Visibilities and amplitudes are corrupted as `g1 · V · conj(g2)`. Closure quantities do not
/// depend on station gains and are answered by the base model directly.
#[derive(Clone, Debug)]
pub struct CorruptedModel {
    base: Box<VisModel>,
    cache: Arc<GainCache>,
    gains: Array1<Complex64>,
}

impl CorruptedModel {
    pub fn new(
        base: impl Into<VisModel>,
        cache: Arc<GainCache>,
        gains: Array1<Complex64>,
    ) -> Result<Self, CorruptionError> {
        if gains.len() != cache.num_gains() {
            return Err(CorruptionError::LengthMismatch {
                what: "gains",
                actual: gains.len(),
                expected: cache.num_gains(),
            });
        }
        Ok(Self {
            base: Box::new(base.into()),
            cache,
            gains,
        })
    }

    pub fn base(&self) -> &VisModel {
        &self.base
    }

    pub fn cache(&self) -> &Arc<GainCache> {
        &self.cache
    }

    pub fn gains(&self) -> ArrayView1<'_, Complex64> {
        self.gains.view()
    }
}

impl VisibilityModelTrait for CorruptedModel {
    fn visibilities(&self, uv: &UvCoverage) -> Result<Array1<Complex64>, ModelError> {
        let vis = self.base.visibilities(uv)?;
        Ok(corrupt(vis.view(), &self.cache, self.gains.view())?)
    }

    fn closure_phases(
        &self,
        uv: &UvCoverage,
        design: &SparseMatrix<f64>,
    ) -> Result<Array1<f64>, ModelError> {
        self.base.closure_phases(uv, design)
    }

    fn log_closure_amplitudes(
        &self,
        uv: &UvCoverage,
        design: &SparseMatrix<f64>,
    ) -> Result<Array1<f64>, ModelError> {
        self.base.log_closure_amplitudes(uv, design)
    }
}
