use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Baseline coordinates `(u, v)` of every measurement row, in wavelengths
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UvCoverage {
    u: Array1<f64>,
    v: Array1<f64>,
}

impl UvCoverage {
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (u, v): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        Self {
            u: u.into(),
            v: v.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    pub fn u(&self) -> &Array1<f64> {
        &self.u
    }

    pub fn v(&self) -> &Array1<f64> {
        &self.v
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.u.iter().copied().zip(self.v.iter().copied())
    }
}

impl FromIterator<(f64, f64)> for UvCoverage {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        Self::new(iter)
    }
}
