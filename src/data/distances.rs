use faer::MatRef;
use num_traits::{Float, FromPrimitive, ToPrimitive};

use crate::data::structures::*;
use crate::error::{Result, TsneError};
use crate::utils::math::squared_euclidean;

///////////
// Trait //
///////////

/// Anything that can report pairwise distances between a fixed set of items
///
/// Implementations must be symmetric (`distance(i, j) == distance(j, i)`) and
/// return zero on the diagonal; `pairwise_distances` rejects sources that
/// are not. The triangle inequality is not required;
/// squared Euclidean distances are the typical input.
pub trait DistanceSource<T> {
    /// Number of items
    fn n_items(&self) -> usize;

    /// Distance between items `i` and `j`, with `0 <= i, j < n_items()`
    fn distance(&self, i: usize, j: usize) -> T;
}

/////////////////////
// Implementations //
/////////////////////

/// Squared Euclidean distances between equal-length vectors
///
/// ### Fields
///
/// * `vectors` - One feature vector per item
#[derive(Clone, Debug)]
pub struct VectorDistances<T> {
    vectors: Vec<Vec<T>>,
}

impl<T> VectorDistances<T>
where
    T: Float,
{
    /// Generate a new instance
    ///
    /// ### Params
    ///
    /// * `vectors` - One feature vector per item
    ///
    /// ### Returns
    ///
    /// Initialised self or `TsneError::RaggedInput` if the vectors differ in
    /// length.
    pub fn new(vectors: Vec<Vec<T>>) -> Result<Self> {
        if let Some(first) = vectors.first() {
            let expected = first.len();
            if let Some((index, v)) = vectors
                .iter()
                .enumerate()
                .find(|(_, v)| v.len() != expected)
            {
                return Err(TsneError::RaggedInput {
                    index,
                    expected,
                    got: v.len(),
                });
            }
        }

        Ok(Self { vectors })
    }

    /// The wrapped vectors
    pub fn vectors(&self) -> &[Vec<T>] {
        &self.vectors
    }
}

impl<T> DistanceSource<T> for VectorDistances<T>
where
    T: Float,
{
    fn n_items(&self) -> usize {
        self.vectors.len()
    }

    fn distance(&self, i: usize, j: usize) -> T {
        squared_euclidean(&self.vectors[i], &self.vectors[j])
    }
}

/// Rows of a faer matrix are items; squared Euclidean between rows
impl<T> DistanceSource<T> for MatRef<'_, T>
where
    T: Float,
{
    fn n_items(&self) -> usize {
        self.nrows()
    }

    fn distance(&self, i: usize, j: usize) -> T {
        (0..self.ncols()).fold(T::zero(), |acc, k| {
            let diff = self[(i, k)] - self[(j, k)];
            acc + diff * diff
        })
    }
}

/// A precomputed square distance matrix
impl<T> DistanceSource<T> for DenseMatrix<T>
where
    T: Float,
{
    fn n_items(&self) -> usize {
        self.n_rows
    }

    fn distance(&self, i: usize, j: usize) -> T {
        self[(i, j)]
    }
}

/////////////
// Globals //
/////////////

/// Relative tolerance for `|d_ij - d_ji|` and absolute tolerance for `d_ii`
pub const DISTANCE_SYMMETRY_TOL: f64 = 1e-6;

/////////////
// Helpers //
/////////////

/// Query one distance and reject negative or non-finite values
#[inline]
fn checked_distance<T, S>(source: &S, i: usize, j: usize) -> Result<T>
where
    T: Float + ToPrimitive,
    S: DistanceSource<T> + ?Sized,
{
    let d = source.distance(i, j);
    if !d.is_finite() || d < T::zero() {
        return Err(TsneError::InvalidDistance {
            i,
            j,
            value: d.to_f64().unwrap_or(f64::NAN),
        });
    }
    Ok(d)
}

/// Evaluate all pairwise distances of a source
///
/// Every entry is queried, including the diagonal and both orders of each
/// pair. Self-distances must be zero and `d(i, j)` must agree with
/// `d(j, i)` to within `DISTANCE_SYMMETRY_TOL` (relative); the upper
/// triangle is then mirrored so the result is exactly symmetric with an
/// exactly zero diagonal.
///
/// ### Params
///
/// * `source` - The distance source
///
/// ### Returns
///
/// The N×N distance matrix, or for the first offending entry
/// `TsneError::InvalidDistance` (negative or non-finite),
/// `TsneError::NonZeroSelfDistance` or `TsneError::AsymmetricDistance`.
pub fn pairwise_distances<T, S>(source: &S) -> Result<DenseMatrix<T>>
where
    T: Float + FromPrimitive + ToPrimitive,
    S: DistanceSource<T> + ?Sized,
{
    let n = source.n_items();
    let tol = T::from_f64(DISTANCE_SYMMETRY_TOL).unwrap();
    let mut dists = DenseMatrix::zeros(n, n);

    for i in 0..n {
        let d_ii = checked_distance(source, i, i)?;
        if d_ii > tol {
            return Err(TsneError::NonZeroSelfDistance {
                i,
                value: d_ii.to_f64().unwrap_or(f64::NAN),
            });
        }

        for j in (i + 1)..n {
            let d_ij = checked_distance(source, i, j)?;
            let d_ji = checked_distance(source, j, i)?;
            if (d_ij - d_ji).abs() > tol * d_ij.max(d_ji).max(T::one()) {
                return Err(TsneError::AsymmetricDistance {
                    i,
                    j,
                    forward: d_ij.to_f64().unwrap_or(f64::NAN),
                    backward: d_ji.to_f64().unwrap_or(f64::NAN),
                });
            }
            dists[(i, j)] = d_ij;
            dists[(j, i)] = d_ij;
        }
    }

    Ok(dists)
}

///////////
// Tests //
///////////
