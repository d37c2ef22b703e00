use num_traits::{Float, FromPrimitive};
use rayon::prelude::*;

use crate::data::structures::*;
use crate::training::{TsneExecution, TsneOptimParams};
use crate::utils::math::*;
use crate::{assert_matrix_shape, assert_same_len};

//////////
// tSNE //
//////////

////////////////
// Structures //
////////////////

/// Mutable optimisation state of an embedding
///
/// `embd`, `update` and `gains` always share the shape N×d.
///
/// ### Fields
///
/// * `embd` - Current coordinates (samples × components)
/// * `update` - Last step applied to each coordinate (momentum buffer)
/// * `gains` - Adaptive per-coordinate step multipliers
/// * `iter` - Number of optimisation steps taken so far
#[derive(Clone, Debug)]
pub struct EmbeddingState<T> {
    pub embd: Vec<Vec<T>>,
    pub update: Vec<Vec<T>>,
    pub gains: Vec<Vec<T>>,
    pub iter: usize,
}

impl<T> EmbeddingState<T>
where
    T: Float,
{
    /// Generate a fresh state from initial coordinates
    ///
    /// ### Params
    ///
    /// * `embd` - Initial coordinates (samples × components). All rows need
    ///   the same length.
    ///
    /// ### Returns
    ///
    /// State with zero momentum, unit gains and the iteration counter at 0
    pub fn new(embd: Vec<Vec<T>>) -> Self {
        let n = embd.len();
        let n_dim = embd.first().map_or(0, |pt| pt.len());
        assert_matrix_shape!(embd, n, n_dim);

        Self {
            update: vec![vec![T::zero(); n_dim]; n],
            gains: vec![vec![T::one(); n_dim]; n],
            embd,
            iter: 0,
        }
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.embd.len()
    }

    /// Number of embedding dimensions
    pub fn n_dim(&self) -> usize {
        self.embd.first().map_or(0, |pt| pt.len())
    }
}

/////////////
// Helpers //
/////////////

/// Adaptive gain update for t-SNE gradient descent
///
/// A gain shrinks (`* gain_decay`) when the gradient has the same sign as
/// the last step and grows (`+ gain_increase`) otherwise. Zero counts as its
/// own sign, so the very first step (no previous update) always grows the
/// gain.
///
/// ### Params
///
/// * `val` - Current parameter value to update
/// * `update` - Last step for this parameter; overwritten with the new step
/// * `gain` - Adaptive gain for this parameter
/// * `grad` - Current gradient for this parameter
/// * `lr` - Base learning rate
/// * `momentum` - Momentum coefficient
/// * `gain_increase` - Additive gain increase
/// * `gain_decay` - Multiplicative gain decay
#[allow(clippy::too_many_arguments)]
#[inline(always)]
fn update_parameter<T>(
    val: &mut T,
    update: &mut T,
    gain: &mut T,
    grad: T,
    lr: T,
    momentum: T,
    gain_increase: T,
    gain_decay: T,
) where
    T: Float,
{
    if sign(grad) == sign(*update) {
        *gain = *gain * gain_decay;
    } else {
        *gain = *gain + gain_increase;
    }

    *update = momentum * *update - lr * *gain * grad;
    *val = *val + *update;
}

/// Unnormalised Student-t similarities of an embedding
///
/// Qu_ij = 1 / (1 + ||y_i - y_j||^2), with a zero diagonal.
///
/// ### Params
///
/// * `embd` - Current coordinates
/// * `execution` - Sequential or parallel over rows
///
/// ### Returns
///
/// Tuple of `(Qu, sum(Qu))`
pub fn student_t_similarities<T>(
    embd: &[Vec<T>],
    execution: &TsneExecution,
) -> (DenseMatrix<T>, T)
where
    T: Float + Send + Sync,
{
    let n = embd.len();
    let mut qu = DenseMatrix::zeros(n, n);
    if n == 0 {
        return (qu, T::zero());
    }

    let fill_row = |(i, row): (usize, &mut [T])| -> T {
        let mut row_sum = T::zero();
        for (j, q) in row.iter_mut().enumerate() {
            if j != i {
                *q = T::one() / (T::one() + squared_euclidean(&embd[i], &embd[j]));
                row_sum = row_sum + *q;
            }
        }
        row_sum
    };

    let row_sums: Vec<T> = match execution {
        TsneExecution::Sequential => qu.values.chunks_mut(n).enumerate().map(fill_row).collect(),
        TsneExecution::Parallel => qu
            .values
            .par_chunks_mut(n)
            .enumerate()
            .map(fill_row)
            .collect(),
    };
    let q_sum = row_sums.into_iter().fold(T::zero(), |acc, s| acc + s);

    (qu, q_sum)
}

/// Normalised low-dimensional similarities
///
/// Q_ij = max(Qu_ij / sum(Qu), floor)
///
/// ### Params
///
/// * `qu` - Unnormalised similarities
/// * `q_sum` - Their total
///
/// ### Returns
///
/// The normalised matrix Q. The diagonal only holds the floor.
pub fn normalise_similarities<T>(qu: &DenseMatrix<T>, q_sum: T) -> DenseMatrix<T>
where
    T: Float + FromPrimitive,
{
    let floor = prob_floor::<T>();
    let q_sum = q_sum.max(T::min_positive_value());
    DenseMatrix {
        values: qu.values.iter().map(|&q| (q / q_sum).max(floor)).collect(),
        n_rows: qu.n_rows,
        n_cols: qu.n_cols,
    }
}

///////////////////////
// Cost and gradient //
///////////////////////

/// KL divergence cost and its gradient for the current embedding
///
/// cost = -sum_{i != j} P_ij * ln(Q_ij)
/// grad_i = 4 * sum_j (pmul * P_ij - Q_ij) * Qu_ij * (y_i - y_j)
///
/// The cost is the part of KL(P || Q) that depends on the embedding; it
/// always uses the plain P, whereas the gradient uses the exaggerated one.
///
/// ### Params
///
/// * `embd` - Current coordinates (samples × components)
/// * `p` - Joint probability matrix
/// * `pmul` - Early exaggeration multiplier for P
/// * `execution` - Sequential or parallel over samples
///
/// ### Returns
///
/// Tuple of `(cost, gradient)` where the gradient has the shape of `embd`
pub fn cost_gradient<T>(
    embd: &[Vec<T>],
    p: &DenseMatrix<T>,
    pmul: T,
    execution: &TsneExecution,
) -> (T, Vec<Vec<T>>)
where
    T: Float + FromPrimitive + Send + Sync,
{
    let n = embd.len();
    let n_dim = embd.first().map_or(0, |pt| pt.len());
    debug_assert_eq!(p.n_rows, n);

    let (qu, q_sum) = student_t_similarities(embd, execution);
    let q = normalise_similarities(&qu, q_sum);
    let four = T::from_f64(4.0).unwrap();

    let per_sample = |i: usize| -> (T, Vec<T>) {
        let mut cost = T::zero();
        let mut grad = vec![T::zero(); n_dim];
        let p_row = p.row(i);
        let q_row = q.row(i);
        let qu_row = qu.row(i);

        for j in 0..n {
            if j == i {
                continue;
            }
            cost = cost - p_row[j] * q_row[j].ln();
            let premult = four * (pmul * p_row[j] - q_row[j]) * qu_row[j];
            for d in 0..n_dim {
                grad[d] = grad[d] + premult * (embd[i][d] - embd[j][d]);
            }
        }
        (cost, grad)
    };

    let results: Vec<(T, Vec<T>)> = match execution {
        TsneExecution::Sequential => (0..n).map(per_sample).collect(),
        TsneExecution::Parallel => (0..n).into_par_iter().map(per_sample).collect(),
    };

    let mut cost = T::zero();
    let mut grad = Vec::with_capacity(n);
    for (c, g) in results {
        cost = cost + c;
        grad.push(g);
    }

    (cost, grad)
}

//////////
// Step //
//////////

/// Subtract the per-axis mean from every point
///
/// ### Params
///
/// * `embd` - Mutable embedding to recentre in place
/// * `execution` - Sequential or parallel subtraction
pub fn recentre_embedding<T>(embd: &mut [Vec<T>], execution: &TsneExecution)
where
    T: Float + FromPrimitive + Send + Sync,
{
    let n = embd.len();
    if n == 0 {
        return;
    }
    let n_dim = embd[0].len();

    // serial sum, so the mean does not depend on the thread count
    let mut mean = vec![T::zero(); n_dim];
    for point in embd.iter() {
        for d in 0..n_dim {
            mean[d] = mean[d] + point[d];
        }
    }
    let n_float = T::from_usize(n).unwrap();
    for m in mean.iter_mut() {
        *m = *m / n_float;
    }

    let centre = |point: &mut Vec<T>| {
        for d in 0..n_dim {
            point[d] = point[d] - mean[d];
        }
    };

    match execution {
        TsneExecution::Sequential => embd.iter_mut().for_each(centre),
        TsneExecution::Parallel => embd.par_iter_mut().for_each(centre),
    }
}

/// Perform a single t-SNE optimisation step
///
/// Increments the iteration counter and uses the new value for both
/// schedules, i.e. the first call runs as iteration 1. Then:
///
/// 1. Compute cost and gradient (exaggerated P while `iter <
///    early_exag_iter`)
/// 2. Update gains, momentum buffer and coordinates for every (i, d)
/// 3. Recentre the embedding to zero mean on every axis
///
/// Each phase finishes completely before the next one reads its output.
///
/// ### Params
///
/// * `state` - The embedding state to advance
/// * `p` - Joint probability matrix
/// * `params` - Optimisation parameters
/// * `execution` - Sequential or parallel execution
///
/// ### Returns
///
/// The cost evaluated during this step
pub fn tsne_step<T>(
    state: &mut EmbeddingState<T>,
    p: &DenseMatrix<T>,
    params: &TsneOptimParams<T>,
    execution: &TsneExecution,
) -> T
where
    T: Float + FromPrimitive + Send + Sync,
{
    assert_same_len!(state.embd, state.update, state.gains);

    state.iter += 1;
    let pmul = params.exaggeration(state.iter);
    let momentum = params.momentum(state.iter);

    let (cost, grad) = cost_gradient(&state.embd, p, pmul, execution);

    let lr = params.lr;
    let gain_increase = params.gain_increase;
    let gain_decay = params.gain_decay;

    #[allow(clippy::type_complexity)]
    let update_point = |(((point, update), gains), grad): (
        ((&mut Vec<T>, &mut Vec<T>), &mut Vec<T>),
        &Vec<T>,
    )| {
        for d in 0..point.len() {
            update_parameter(
                &mut point[d],
                &mut update[d],
                &mut gains[d],
                grad[d],
                lr,
                momentum,
                gain_increase,
                gain_decay,
            );
        }
    };

    match execution {
        TsneExecution::Sequential => state
            .embd
            .iter_mut()
            .zip(state.update.iter_mut())
            .zip(state.gains.iter_mut())
            .zip(grad.iter())
            .for_each(update_point),
        TsneExecution::Parallel => state
            .embd
            .par_iter_mut()
            .zip(state.update.par_iter_mut())
            .zip(state.gains.par_iter_mut())
            .zip(grad.par_iter())
            .for_each(update_point),
    }

    recentre_embedding(&mut state.embd, execution);

    cost
}

///////////
// Tests //
///////////
