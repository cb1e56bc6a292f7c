use crate::error::SparseError;

use ndarray::{Array1, Array2, ArrayView1};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, Mul};

/// Sparse matrix in compressed sparse row storage
///
/// Construction from `(row, column, value)` triplets and queries (row access, products with
/// dense vectors) are separate operations. The matrix never pretends to be a dense array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix<T> {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Copy> SparseMatrix<T> {
    /// Build from triplets
    ///
    /// Entries of the same row keep their input order. Repeated `(row, column)` entries are kept
    /// as separate non-zeros and add up in products.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[T],
    ) -> Result<Self, SparseError> {
        if rows.len() != cols.len() || rows.len() != values.len() {
            return Err(SparseError::TripletLengthMismatch {
                rows: rows.len(),
                cols: cols.len(),
                values: values.len(),
            });
        }
        if let Some((&row, &col)) = rows
            .iter()
            .zip(cols)
            .find(|&(&r, &c)| r >= nrows || c >= ncols)
        {
            return Err(SparseError::OutOfBounds {
                row,
                col,
                nrows,
                ncols,
            });
        }

        let mut indptr = vec![0; nrows + 1];
        for &r in rows {
            indptr[r + 1] += 1;
        }
        for i in 0..nrows {
            indptr[i + 1] += indptr[i];
        }

        let mut next = indptr[..nrows].to_vec();
        let mut order = vec![0; rows.len()];
        for (k, &r) in rows.iter().enumerate() {
            order[next[r]] = k;
            next[r] += 1;
        }
        let indices = order.iter().map(|&k| cols[k]).collect();
        let values = order.iter().map(|&k| values[k]).collect();

        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of the stored entries of row `i`
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let range = self.indptr[i]..self.indptr[i + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    /// Iterate over stored entries as `(row, column, value)` in row-major order
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.nrows).flat_map(move |i| {
            let (cols, values) = self.row(i);
            cols.iter().zip(values).map(move |(&j, &v)| (i, j, v))
        })
    }

    /// Product with a dense vector: `A x`
    pub fn mul_vec<V>(&self, x: ArrayView1<V>) -> Result<Array1<V>, SparseError>
    where
        V: Copy + Zero + AddAssign + Mul<T, Output = V>,
    {
        if x.len() != self.ncols {
            return Err(SparseError::VectorLength {
                actual: x.len(),
                expected: self.ncols,
            });
        }
        Ok((0..self.nrows)
            .map(|i| {
                let (cols, values) = self.row(i);
                let mut acc = V::zero();
                for (&j, &a) in cols.iter().zip(values) {
                    acc += x[j] * a;
                }
                acc
            })
            .collect())
    }

    /// Product of the transposed matrix with a dense vector: `A^T y`
    pub fn transpose_mul_vec<V>(&self, y: ArrayView1<V>) -> Result<Array1<V>, SparseError>
    where
        V: Copy + Zero + AddAssign + Mul<T, Output = V>,
    {
        if y.len() != self.nrows {
            return Err(SparseError::VectorLength {
                actual: y.len(),
                expected: self.nrows,
            });
        }
        let mut result = Array1::from_elem(self.ncols, V::zero());
        for (i, j, a) in self.triplets() {
            result[j] += y[i] * a;
        }
        Ok(result)
    }

    pub fn to_dense(&self) -> Array2<T>
    where
        T: Zero + AddAssign,
    {
        let mut dense = Array2::from_elem((self.nrows, self.ncols), T::zero());
        for (i, j, v) in self.triplets() {
            dense[(i, j)] += v;
        }
        dense
    }
}
