use num_traits::{Float, FromPrimitive};
use rayon::prelude::*;
use std::time::Instant;
use thousands::*;

use crate::data::structures::*;
use crate::training::TsneExecution;
use crate::utils::math::*;

/////////////////
// Calibration //
/////////////////

/// Result of the bandwidth search for a single row
///
/// ### Fields
///
/// * `probs` - Conditional probabilities p_{j|i}; the entry for `i` itself
///   is zero
/// * `beta` - Kernel precision (inverse variance) that produced `probs`
/// * `entropy` - Shannon entropy (natural log) of `probs`
/// * `converged` - Whether the entropy got within `tol` of `ln(perplexity)`
#[derive(Clone, Debug)]
pub struct RowCalibration<T> {
    pub probs: Vec<T>,
    pub beta: T,
    pub entropy: T,
    pub converged: bool,
}

/// Gaussian kernel row for a given precision
///
/// Writes `exp(-(d_ij - d_min) * beta)` into `out` (zero for `j == i`) and
/// returns the total kernel mass. `d_min` is the smallest off-diagonal
/// distance of the row; the shift cancels out after normalisation but keeps
/// the nearest neighbour at a kernel of one, so the mass never drops below
/// one however large `beta` gets. Ties with `d_min` also give one
/// irrespective of `beta`, so an infinite precision never produces `0 * inf`.
#[inline]
fn kernel_row<T>(dists: &[T], i: usize, beta: T, out: &mut [T]) -> T
where
    T: Float,
{
    let d_min = dists
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .fold(T::infinity(), |acc, (_, &d)| acc.min(d));

    let mut sum = T::zero();
    for (j, (&d, p)) in dists.iter().zip(out.iter_mut()).enumerate() {
        *p = if j == i {
            T::zero()
        } else if d <= d_min {
            T::one()
        } else {
            (-(d - d_min) * beta).exp()
        };
        sum = sum + *p;
    }
    sum
}

/// Binary search for the kernel precision of one row
///
/// Finds `beta` such that the entropy of the row's Gaussian kernel
/// distribution matches `ln(perplexity)`. The search starts at `beta = 1`
/// with open bounds; the precision doubles (or halves) until a bound on
/// the other side is known, then bisects.
///
/// ### Params
///
/// * `dists` - Row `i` of the distance matrix
/// * `i` - Index of the row (its own entry is excluded)
/// * `perplexity` - Target perplexity (effective number of neighbours)
/// * `tol` - Convergence tolerance on the entropy
/// * `max_tries` - Maximum number of search iterations
///
/// ### Returns
///
/// The calibrated row. If `max_tries` is exhausted the closest row seen so
/// far is returned with `converged = false`.
pub fn calibrate_row<T>(
    dists: &[T],
    i: usize,
    perplexity: T,
    tol: T,
    max_tries: usize,
) -> RowCalibration<T>
where
    T: Float + FromPrimitive,
{
    let n = dists.len();
    let two = T::from_f64(2.0).unwrap();
    let target_entropy = perplexity.ln();

    let mut beta = T::one();
    let mut beta_min = T::neg_infinity();
    let mut beta_max = T::infinity();

    let mut current = vec![T::zero(); n];
    let mut best = RowCalibration {
        probs: vec![T::zero(); n],
        beta,
        entropy: T::zero(),
        converged: false,
    };
    let mut best_diff = T::infinity();

    for _ in 0..max_tries {
        // only a row without neighbours has zero mass
        let sum_p = kernel_row(dists, i, beta, &mut current).max(T::min_positive_value());
        for p in current.iter_mut() {
            *p = *p / sum_p;
        }
        let entropy = shannon_entropy(&current);
        let entropy_diff = entropy - target_entropy;

        if entropy_diff.abs() < best_diff {
            best_diff = entropy_diff.abs();
            best.probs.copy_from_slice(&current);
            best.beta = beta;
            best.entropy = entropy;
        }

        if entropy_diff.abs() < tol {
            best.converged = true;
            break;
        }

        if entropy_diff > T::zero() {
            // too diffuse -> sharpen the kernel
            beta_min = beta;
            beta = if beta_max == T::infinity() {
                beta * two
            } else {
                (beta + beta_max) / two
            };
        } else {
            // too peaked -> widen the kernel
            beta_max = beta;
            beta = if beta_min == T::neg_infinity() {
                beta / two
            } else {
                (beta + beta_min) / two
            };
        }
    }

    best
}

/// Calibrate every row of the distance matrix
///
/// ### Params
///
/// * `dists` - N×N distance matrix
/// * `perplexity` - Target perplexity
/// * `tol` - Entropy tolerance for the binary search
/// * `max_tries` - Maximum binary search iterations per row
/// * `execution` - Run the rows sequentially or in parallel
///
/// ### Returns
///
/// Tuple of `(conditional probabilities p_{j|i} stored in row i, precision
/// per row, number of rows that converged)`
pub fn conditional_probabilities<T>(
    dists: &DenseMatrix<T>,
    perplexity: T,
    tol: T,
    max_tries: usize,
    execution: &TsneExecution,
) -> (DenseMatrix<T>, Vec<T>, usize)
where
    T: Float + FromPrimitive + Send + Sync,
{
    let n = dists.n_rows;
    let calibrate_one = |i: usize| calibrate_row(dists.row(i), i, perplexity, tol, max_tries);

    let rows: Vec<RowCalibration<T>> = match execution {
        TsneExecution::Sequential => (0..n).map(calibrate_one).collect(),
        TsneExecution::Parallel => (0..n).into_par_iter().map(calibrate_one).collect(),
    };

    let mut cond = DenseMatrix::zeros(n, n);
    let mut betas = Vec::with_capacity(n);
    let mut n_converged = 0;
    for (i, row) in rows.into_iter().enumerate() {
        cond.row_mut(i).copy_from_slice(&row.probs);
        betas.push(row.beta);
        if row.converged {
            n_converged += 1;
        }
    }

    (cond, betas, n_converged)
}

/// Symmetrise conditional probabilities into a joint distribution
///
/// P_ij = max((p_{j|i} + p_{i|j}) / 2N, floor). The result is symmetric,
/// strictly positive and sums to ~1.
///
/// ### Params
///
/// * `cond` - Conditional probabilities (row i holds p_{.|i})
/// * `execution` - Fill the rows sequentially or in parallel
///
/// ### Returns
///
/// The joint probability matrix P
pub fn symmetrise_joint<T>(cond: &DenseMatrix<T>, execution: &TsneExecution) -> DenseMatrix<T>
where
    T: Float + FromPrimitive + Send + Sync,
{
    let n = cond.n_rows;
    let floor = prob_floor::<T>();
    let normalisation = T::from_usize(2 * n).unwrap().max(T::one());

    let mut joint = DenseMatrix::zeros(n, n);
    if n == 0 {
        return joint;
    }

    let fill_row = |(i, row): (usize, &mut [T])| {
        for (j, p) in row.iter_mut().enumerate() {
            *p = ((cond[(i, j)] + cond[(j, i)]) / normalisation).max(floor);
        }
    };

    match execution {
        TsneExecution::Sequential => joint.values.chunks_mut(n).enumerate().for_each(fill_row),
        TsneExecution::Parallel => joint
            .values
            .par_chunks_mut(n)
            .enumerate()
            .for_each(fill_row),
    }

    joint
}

/// Turn a distance matrix into the joint probability matrix P
///
/// ### Params
///
/// * `dists` - N×N distance matrix (symmetric, zero diagonal)
/// * `perplexity` - Target perplexity
/// * `tol` - Entropy tolerance for the binary search
/// * `max_tries` - Maximum binary search iterations per row
/// * `execution` - Run the rows sequentially or in parallel
/// * `verbose` - Controls verbosity
///
/// ### Returns
///
/// The joint probability matrix P
pub fn calibrate<T>(
    dists: &DenseMatrix<T>,
    perplexity: T,
    tol: T,
    max_tries: usize,
    execution: &TsneExecution,
    verbose: bool,
) -> DenseMatrix<T>
where
    T: Float + FromPrimitive + Send + Sync,
{
    let start = Instant::now();

    let (cond, _, n_converged) =
        conditional_probabilities(dists, perplexity, tol, max_tries, execution);
    let joint = symmetrise_joint(&cond, execution);

    if verbose {
        let n = dists.n_rows;
        println!(
            "Calibrated {} rows to the target perplexity in {:.2?}.",
            n.separate_with_underscores(),
            start.elapsed()
        );
        if n_converged < n {
            println!(
                "{} rows hit the iteration cap of {} and use the closest bandwidth found.",
                (n - n_converged).separate_with_underscores(),
                max_tries
            );
        }
    }

    joint
}

///////////
// Tests //
///////////
