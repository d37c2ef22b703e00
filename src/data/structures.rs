use num_traits::Float;
use std::ops::{Index, IndexMut};

use crate::error::{Result, TsneError};

/////////////////////
// Data structures //
/////////////////////

///////////
// Dense //
///////////

/// Dense matrix
///
/// Row-major storage in a single contiguous buffer. Used for the pairwise
/// distance matrix D, the joint probability matrix P and the low-dimensional
/// similarity matrices Q.
///
/// ### Fields
///
/// * `values` - The flattened values (row-major)
/// * `n_rows` - Number of rows
/// * `n_cols` - Number of columns
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix<T> {
    pub values: Vec<T>,
    pub n_rows: usize,
    pub n_cols: usize,
}

impl<T> DenseMatrix<T>
where
    T: Float,
{
    /// Generate a matrix filled with zeros
    ///
    /// ### Params
    ///
    /// * `n_rows` - Number of rows
    /// * `n_cols` - Number of columns
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self::filled(n_rows, n_cols, T::zero())
    }

    /// Generate a matrix filled with a constant
    pub fn filled(n_rows: usize, n_cols: usize, val: T) -> Self {
        Self {
            values: vec![val; n_rows * n_cols],
            n_rows,
            n_cols,
        }
    }

    /// Generate a square matrix from nested rows
    ///
    /// ### Params
    ///
    /// * `rows` - One vector per row. Every row needs as many entries as
    ///   there are rows.
    ///
    /// ### Returns
    ///
    /// The matrix or a `TsneError::NonSquareMatrix` if the input is ragged or
    /// not square.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|row| row.len() != n) {
            return Err(TsneError::NonSquareMatrix {
                n_rows: n,
                n_cols: bad.len(),
            });
        }

        Ok(Self {
            values: rows.into_iter().flatten().collect(),
            n_rows: n,
            n_cols: n,
        })
    }

    /// Is the matrix square
    pub fn is_square(&self) -> bool {
        self.n_rows == self.n_cols
    }

    /// Immutable view of a row
    ///
    /// ### Params
    ///
    /// * `i` - Row index
    ///
    /// ### Returns
    ///
    /// Slice of length `n_cols`
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.values[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Mutable view of a row
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        let n_cols = self.n_cols;
        &mut self.values[i * n_cols..(i + 1) * n_cols]
    }

    /// Sum over all entries
    ///
    /// Summed per row first, then across rows in order, matching the
    /// reduction order of the optimiser.
    pub fn sum(&self) -> T {
        if self.n_cols == 0 {
            return T::zero();
        }
        self.values
            .chunks(self.n_cols)
            .map(|row| row.iter().fold(T::zero(), |acc, &v| acc + v))
            .fold(T::zero(), |acc, v| acc + v)
    }

    /// Checks the matrix for symmetry
    ///
    /// ### Params
    ///
    /// * `tol` - Absolute tolerance
    ///
    /// ### Returns
    ///
    /// `true` if square and `|m_ij - m_ji| <= tol` everywhere
    pub fn is_symmetric(&self, tol: T) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.n_rows;
        (0..n).all(|i| (i + 1..n).all(|j| (self[(i, j)] - self[(j, i)]).abs() <= tol))
    }
}

impl<T> Index<(usize, usize)> for DenseMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.values[i * self.n_cols + j]
    }
}

impl<T> IndexMut<(usize, usize)> for DenseMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.values[i * self.n_cols + j]
    }
}

///////////
// Tests //
///////////
