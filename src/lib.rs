#![allow(clippy::needless_range_loop)] // I like loops ... !

pub mod data;
pub mod error;
pub mod prelude;
pub mod training;
pub mod utils;

use faer::MatRef;
use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::time::Instant;
use thousands::*;

use crate::data::affinities::*;
use crate::data::distances::*;
use crate::data::init::*;
use crate::data::structures::*;
use crate::error::{Result, TsneError};
use crate::training::tsne_optimiser::*;
use crate::training::*;
use crate::utils::normalise::*;

/////////////
// Globals //
/////////////

const TSNE_PERPLEXITY: f64 = 30.0;
const TSNE_TOL: f64 = 1e-4;
const TSNE_MAX_TRIES: usize = 500;
const TSNE_N_DIM: usize = 2;

////////////
// Params //
////////////

/// Main config structure for exact t-SNE
///
/// ### Fields
///
/// * `n_dim` - How many dimensions to return
/// * `perplexity` - Target perplexity (effective number of neighbours)
/// * `tol` - Entropy tolerance of the per-row bandwidth search
/// * `max_tries` - Iteration cap of the per-row bandwidth search
/// * `execution` - Sequential or rayon-parallel execution
/// * `optim_params` - The optimiser parameters
#[derive(Debug, Clone)]
pub struct TsneParams<T> {
    pub n_dim: usize,
    pub perplexity: T,
    pub tol: T,
    pub max_tries: usize,
    pub execution: TsneExecution,
    pub optim_params: TsneOptimParams<T>,
}

impl<T> TsneParams<T>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    /// Generate new t-SNE parameters
    ///
    /// If everything is set to `None`, the classic defaults are used.
    ///
    /// ### Params
    ///
    /// * `n_dim` - How many dimensions to return. Default `2`.
    /// * `perplexity` - Target perplexity. Default `30.0`.
    /// * `tol` - Entropy tolerance of the bandwidth search. Default `1e-4`.
    /// * `max_tries` - Bandwidth search iteration cap. Default `500`.
    /// * `execution` - `"parallel"` or `"sequential"`. Unknown strings fall
    ///   back to `"parallel"`.
    /// * `optim_params` - Further optimiser parameters.
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(
        n_dim: Option<usize>,
        perplexity: Option<T>,
        tol: Option<T>,
        max_tries: Option<usize>,
        execution: Option<String>,
        optim_params: Option<TsneOptimParams<T>>,
    ) -> Self {
        let n_dim = n_dim.unwrap_or(TSNE_N_DIM);
        let perplexity = perplexity.unwrap_or(T::from_f64(TSNE_PERPLEXITY).unwrap());
        let tol = tol.unwrap_or(T::from_f64(TSNE_TOL).unwrap());
        let max_tries = max_tries.unwrap_or(TSNE_MAX_TRIES);
        let execution = execution
            .as_deref()
            .and_then(parse_tsne_execution)
            .unwrap_or_default();
        let optim_params = optim_params.unwrap_or_default();

        Self {
            n_dim,
            perplexity,
            tol,
            max_tries,
            execution,
            optim_params,
        }
    }

    /// Check that all hyperparameters are usable
    ///
    /// ### Returns
    ///
    /// `TsneError::InvalidParameter` for the first offending value
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &'static str, value: T| -> Result<()> {
            if value.is_finite() && value > T::zero() {
                Ok(())
            } else {
                Err(TsneError::InvalidParameter {
                    name,
                    value: value.to_f64().unwrap_or(f64::NAN),
                })
            }
        };

        if self.n_dim == 0 {
            return Err(TsneError::InvalidParameter {
                name: "n_dim",
                value: 0.0,
            });
        }
        if self.max_tries == 0 {
            return Err(TsneError::InvalidParameter {
                name: "max_tries",
                value: 0.0,
            });
        }
        // ln(perplexity) < 0 is not a reachable row entropy
        if !(self.perplexity.is_finite() && self.perplexity >= T::one()) {
            return Err(TsneError::InvalidParameter {
                name: "perplexity",
                value: self.perplexity.to_f64().unwrap_or(f64::NAN),
            });
        }
        positive("tol", self.tol)?;
        positive("lr", self.optim_params.lr)?;
        positive("init_std", self.optim_params.init_std)?;

        Ok(())
    }
}

impl<T> Default for TsneParams<T>
where
    T: Float + FromPrimitive + ToPrimitive,
{
    fn default() -> Self {
        Self::new(None, None, None, None, None, None)
    }
}

////////////
// Handle //
////////////

/// An exact t-SNE embedding under optimisation
///
/// Owns the joint probability matrix P (fixed after construction) and the
/// mutable optimisation state. Every call to [`Tsne::step`] performs one
/// gradient descent iteration; the caller decides when to stop.
///
/// `M` is an opaque per-item payload (labels, ids, ...) that is stored and
/// handed back but never inspected.
#[derive(Clone, Debug)]
pub struct Tsne<T, M = ()> {
    params: TsneParams<T>,
    probs: DenseMatrix<T>,
    state: EmbeddingState<T>,
    meta: Option<Vec<M>>,
}

impl<T, M> Tsne<T, M>
where
    T: Float + FromPrimitive + ToPrimitive + Send + Sync,
    StandardNormal: Distribution<T>,
{
    /// Build the embedding from a distance source
    ///
    /// Evaluates all pairwise distances once, calibrates P to the target
    /// perplexity and draws the initial coordinates from a generator seeded
    /// with `seed`.
    ///
    /// ### Params
    ///
    /// * `source` - Supplies the number of items and their distances
    /// * `meta` - Optional per-item payload; needs one entry per item
    /// * `params` - The t-SNE parameters
    /// * `seed` - Seed for the initial coordinates
    /// * `verbose` - Controls verbosity
    ///
    /// ### Returns
    ///
    /// The embedding, or an error for invalid parameters or input shapes
    pub fn new<S>(
        source: &S,
        meta: Option<Vec<M>>,
        params: TsneParams<T>,
        seed: u64,
        verbose: bool,
    ) -> Result<Self>
    where
        S: DistanceSource<T> + ?Sized,
    {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(source, meta, params, &mut rng, verbose)
    }

    /// Build the embedding from a distance source with a caller-supplied
    /// random number generator
    ///
    /// See [`Tsne::new`].
    pub fn with_rng<S, R>(
        source: &S,
        meta: Option<Vec<M>>,
        params: TsneParams<T>,
        rng: &mut R,
        verbose: bool,
    ) -> Result<Self>
    where
        S: DistanceSource<T> + ?Sized,
        R: Rng + ?Sized,
    {
        params.validate()?;

        let n = source.n_items();
        if n < 2 {
            return Err(TsneError::TooFewItems { n });
        }
        if let Some(meta) = &meta {
            if meta.len() != n {
                return Err(TsneError::MetaLengthMismatch {
                    expected: n,
                    got: meta.len(),
                });
            }
        }

        if verbose {
            println!(
                "Computing {} pairwise distances...",
                (n * (n - 1) / 2).separate_with_underscores()
            );
        }

        let start_dist = Instant::now();
        let dists = pairwise_distances(source)?;

        if verbose {
            println!("Distances done in: {:.2?}.", start_dist.elapsed());
            if params.perplexity >= T::from_usize(n).unwrap() {
                println!(
                    "Perplexity {:.2} is not below the number of items ({}); the bandwidth search will stop at its iteration cap.",
                    params.perplexity.to_f64().unwrap_or(f64::NAN),
                    n
                );
            }
        }

        let probs = calibrate(
            &dists,
            params.perplexity,
            params.tol,
            params.max_tries,
            &params.execution,
            verbose,
        );

        let embd = gaussian_layout(n, params.n_dim, params.optim_params.init_std, rng);

        Ok(Self {
            params,
            probs,
            state: EmbeddingState::new(embd),
            meta,
        })
    }

    /// Build the embedding from a precomputed distance matrix
    ///
    /// ### Params
    ///
    /// * `rows` - The N×N distance matrix as nested rows
    /// * `meta` - Optional per-item payload
    /// * `params` - The t-SNE parameters
    /// * `seed` - Seed for the initial coordinates
    /// * `verbose` - Controls verbosity
    ///
    /// ### Returns
    ///
    /// The embedding, or `TsneError::NonSquareMatrix` if `rows` is not square.
    /// A non-zero diagonal, an asymmetric pair or a negative entry anywhere
    /// in the matrix is rejected as for any other distance source.
    pub fn from_distance_rows(
        rows: Vec<Vec<T>>,
        meta: Option<Vec<M>>,
        params: TsneParams<T>,
        seed: u64,
        verbose: bool,
    ) -> Result<Self> {
        let dists = DenseMatrix::from_rows(rows)?;
        Self::new(&dists, meta, params, seed, verbose)
    }

    /// Start over from a fresh random configuration
    ///
    /// Coordinates are redrawn, gains reset to one, momentum to zero and the
    /// iteration counter to zero. P is kept.
    ///
    /// ### Params
    ///
    /// * `seed` - Seed for the new coordinates
    pub fn reinitialise(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.reinitialise_with_rng(&mut rng);
    }

    /// Start over from a fresh random configuration drawn from `rng`
    pub fn reinitialise_with_rng<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let embd = gaussian_layout(
            self.state.n_samples(),
            self.params.n_dim,
            self.params.optim_params.init_std,
            rng,
        );
        self.state = EmbeddingState::new(embd);
    }
}

impl<T, M> Tsne<T, M>
where
    T: Float + FromPrimitive + ToPrimitive + Send + Sync,
{
    /// Perform exactly one optimisation step
    ///
    /// ### Returns
    ///
    /// The KL cost evaluated during the step
    pub fn step(&mut self) -> T {
        tsne_step(
            &mut self.state,
            &self.probs,
            &self.params.optim_params,
            &self.params.execution,
        )
    }

    /// Perform a fixed number of optimisation steps
    ///
    /// ### Params
    ///
    /// * `n_epochs` - Number of steps
    /// * `verbose` - Report progress every 50 steps and after the last one
    ///
    /// ### Returns
    ///
    /// The cost of every step
    pub fn run(&mut self, n_epochs: usize, verbose: bool) -> Vec<T> {
        let start = Instant::now();
        let mut costs = Vec::with_capacity(n_epochs);

        for epoch in 0..n_epochs {
            let cost = self.step();
            costs.push(cost);

            if verbose && (epoch % 50 == 0 || epoch == n_epochs - 1) {
                println!(
                    "Completed iteration {} ({} of {}) | KL cost = {:.6}",
                    self.state.iter.separate_with_underscores(),
                    epoch + 1,
                    n_epochs,
                    cost.to_f64().unwrap_or(f64::NAN)
                );
            }
        }

        if verbose {
            println!("Optimised embedding in: {:.2?}.", start.elapsed());
        }

        costs
    }

    /// Rescale every axis of the current embedding into [0, 1]
    ///
    /// Axes without any spread are mapped to 0.5.
    pub fn normalise(&mut self) {
        normalise_embedding(&mut self.state.embd);
    }

    /// Current coordinates (samples × components)
    pub fn solution(&self) -> &[Vec<T>] {
        &self.state.embd
    }

    /// Consume self and return the coordinates (samples × components)
    pub fn into_solution(self) -> Vec<Vec<T>> {
        self.state.embd
    }

    /// Current coordinates transposed to `[n_dim][n_samples]`
    pub fn transposed_solution(&self) -> Vec<Vec<T>> {
        let n_samples = self.state.n_samples();
        let n_dim = self.state.n_dim();
        let mut transposed = vec![vec![T::zero(); n_samples]; n_dim];

        for sample_idx in 0..n_samples {
            for dim_idx in 0..n_dim {
                transposed[dim_idx][sample_idx] = self.state.embd[sample_idx][dim_idx];
            }
        }

        transposed
    }

    /// Per-item payload handed in at construction
    pub fn meta(&self) -> Option<&[M]> {
        self.meta.as_deref()
    }

    /// The joint probability matrix P
    pub fn probabilities(&self) -> &DenseMatrix<T> {
        &self.probs
    }

    /// The adaptive gains (samples × components)
    pub fn gains(&self) -> &[Vec<T>] {
        &self.state.gains
    }

    /// Number of steps taken since construction or the last reinitialisation
    pub fn iteration(&self) -> usize {
        self.state.iter
    }

    /// Number of items
    pub fn n_items(&self) -> usize {
        self.state.n_samples()
    }

    /// Embedding dimensionality
    pub fn n_dim(&self) -> usize {
        self.params.n_dim
    }

    /// The parameters the embedding was built with
    pub fn params(&self) -> &TsneParams<T> {
        &self.params
    }
}

/////////////////
// Exact t-SNE //
/////////////////

/// Run exact t-SNE dimensionality reduction
///
/// Squared Euclidean distances between the rows of `data` are converted to
/// perplexity-calibrated joint probabilities, and the embedding is optimised
/// for a fixed number of steps:
///
/// 1. Compute all pairwise distances
/// 2. Binary search a Gaussian bandwidth per row to hit the perplexity
/// 3. Symmetrise into the joint probability matrix P
/// 4. Initialise the embedding with tiny Gaussian noise
/// 5. Optimise the KL divergence with momentum and adaptive gains
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features)
/// * `params` - The t-SNE parameters
/// * `n_epochs` - Number of optimisation steps
/// * `seed` - Seed for reproducibility
/// * `verbose` - Controls verbosity of the function
///
/// ### Returns
///
/// Embedding coordinates as `Vec<Vec<T>>` where outer vector has length
/// `n_dim` and inner vectors have length `n_samples`.
///
/// ### Example
///
/// ```ignore
/// use faer::Mat;
/// let data = Mat::from_fn(200, 16, |_, _| rand::random::<f64>());
/// let embedding = tsne(data.as_ref(), &TsneParams::default(), 500, 42, false)?;
/// // embedding[0] contains x-coordinates for all points
/// // embedding[1] contains y-coordinates for all points
/// ```
pub fn tsne<T>(
    data: MatRef<T>,
    params: &TsneParams<T>,
    n_epochs: usize,
    seed: u64,
    verbose: bool,
) -> Result<Vec<Vec<T>>>
where
    T: Float + FromPrimitive + ToPrimitive + Send + Sync,
    StandardNormal: Distribution<T>,
{
    if verbose {
        println!(
            "Running exact t-SNE on {} samples x {} features with perplexity {:.2}...",
            data.nrows().separate_with_underscores(),
            data.ncols(),
            params.perplexity.to_f64().unwrap_or(f64::NAN)
        );
    }

    let mut model: Tsne<T> = Tsne::new(&data, None, params.clone(), seed, verbose)?;
    model.run(n_epochs, verbose);

    if verbose {
        println!("t-SNE complete!");
    }

    Ok(model.transposed_solution())
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_tsne {
    use super::*;
    use approx::assert_relative_eq;

    fn four_points() -> VectorDistances<f64> {
        VectorDistances::new(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![100.0, 100.0],
            vec![100.0, 101.0],
        ])
        .unwrap()
    }

    fn small_params() -> TsneParams<f64> {
        TsneParams {
            perplexity: 2.0,
            ..TsneParams::default()
        }
    }

    #[test]
    fn test_params_defaults() {
        let params = TsneParams::<f64>::default();
        assert_eq!(params.n_dim, 2);
        assert_relative_eq!(params.perplexity, 30.0);
        assert_relative_eq!(params.tol, 1e-4);
        assert_eq!(params.max_tries, 500);
        assert_eq!(params.execution, TsneExecution::Parallel);
        assert_relative_eq!(params.optim_params.lr, 10.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_new_parses_execution() {
        let params =
            TsneParams::<f64>::new(Some(3), Some(5.0), None, None, Some("serial".into()), None);
        assert_eq!(params.n_dim, 3);
        assert_eq!(params.execution, TsneExecution::Sequential);

        let fallback =
            TsneParams::<f64>::new(None, None, None, None, Some("quantum".into()), None);
        assert_eq!(fallback.execution, TsneExecution::Parallel);
    }

    #[test]
    fn test_params_validation() {
        let bad_perplexity = TsneParams {
            perplexity: -1.0,
            ..TsneParams::<f64>::default()
        };
        assert!(matches!(
            bad_perplexity.validate(),
            Err(TsneError::InvalidParameter {
                name: "perplexity",
                ..
            })
        ));

        for perplexity in [0.5, 0.0, f64::INFINITY] {
            let params = TsneParams {
                perplexity,
                ..TsneParams::<f64>::default()
            };
            assert!(params.validate().is_err(), "perplexity {} should be rejected", perplexity);
        }
        let lowest = TsneParams {
            perplexity: 1.0,
            ..TsneParams::<f64>::default()
        };
        assert!(lowest.validate().is_ok());

        let bad_dim = TsneParams {
            n_dim: 0,
            ..TsneParams::<f64>::default()
        };
        assert!(bad_dim.validate().is_err());

        let mut bad_lr = TsneParams::<f64>::default();
        bad_lr.optim_params.lr = f64::NAN;
        assert!(bad_lr.validate().is_err());
    }

    #[test]
    fn test_new_rejects_too_few_items() {
        let empty = VectorDistances::<f64>::new(vec![]).unwrap();
        let res: Result<Tsne<f64>> = Tsne::new(&empty, None, small_params(), 42, false);
        assert_eq!(res.unwrap_err(), TsneError::TooFewItems { n: 0 });

        let single = VectorDistances::new(vec![vec![1.0, 2.0]]).unwrap();
        let res: Result<Tsne<f64>> = Tsne::new(&single, None, small_params(), 42, false);
        assert_eq!(res.unwrap_err(), TsneError::TooFewItems { n: 1 });
    }

    #[test]
    fn test_new_rejects_meta_mismatch() {
        let res = Tsne::new(
            &four_points(),
            Some(vec!["a", "b"]),
            small_params(),
            42,
            false,
        );
        assert!(matches!(
            res,
            Err(TsneError::MetaLengthMismatch {
                expected: 4,
                got: 2
            })
        ));
    }

    #[test]
    fn test_from_distance_rows_rejects_non_square() {
        let res: Result<Tsne<f64>> = Tsne::from_distance_rows(
            vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 1.0]],
            None,
            small_params(),
            42,
            false,
        );
        assert!(matches!(res, Err(TsneError::NonSquareMatrix { .. })));
    }

    #[test]
    fn test_from_distance_rows_rejects_malformed() {
        let res: Result<Tsne<f64>> = Tsne::from_distance_rows(
            vec![
                vec![5.0, 1.0, 4.0],
                vec![900.0, 0.0, 2.0],
                vec![-7.0, 3.0, 0.0],
            ],
            None,
            small_params(),
            42,
            false,
        );
        assert_eq!(res.unwrap_err(), TsneError::NonZeroSelfDistance { i: 0, value: 5.0 });

        let res: Result<Tsne<f64>> = Tsne::from_distance_rows(
            vec![
                vec![0.0, 1.0, 4.0],
                vec![900.0, 0.0, 2.0],
                vec![4.0, 2.0, 0.0],
            ],
            None,
            small_params(),
            42,
            false,
        );
        assert!(matches!(res, Err(TsneError::AsymmetricDistance { i: 0, j: 1, .. })));

        let res: Result<Tsne<f64>> = Tsne::from_distance_rows(
            vec![
                vec![0.0, 1.0, 4.0],
                vec![1.0, 0.0, 3.0],
                vec![-7.0, 3.0, 0.0],
            ],
            None,
            small_params(),
            42,
            false,
        );
        assert!(matches!(res, Err(TsneError::InvalidDistance { i: 2, j: 0, .. })));
    }

    #[test]
    fn test_meta_is_passed_through() {
        let labels = vec!["a0", "a1", "b0", "b1"];
        let mut model = Tsne::new(
            &four_points(),
            Some(labels.clone()),
            small_params(),
            42,
            false,
        )
        .unwrap();
        model.run(10, false);
        assert_eq!(model.meta(), Some(labels.as_slice()));
    }

    #[test]
    fn test_step_counts_and_shapes() {
        let mut model: Tsne<f64> =
            Tsne::new(&four_points(), None, small_params(), 1, false).unwrap();
        assert_eq!(model.iteration(), 0);
        assert_eq!(model.n_items(), 4);
        assert_eq!(model.n_dim(), 2);

        let costs = model.run(25, false);
        assert_eq!(costs.len(), 25);
        assert_eq!(model.iteration(), 25);
        assert_eq!(model.solution().len(), 4);
        assert_eq!(model.gains().len(), 4);

        let transposed = model.transposed_solution();
        assert_eq!(transposed.len(), 2);
        assert_eq!(transposed[0].len(), 4);
        assert_relative_eq!(transposed[1][2], model.solution()[2][1]);
    }

    #[test]
    fn test_reinitialise_resets_state() {
        let mut model: Tsne<f64> =
            Tsne::new(&four_points(), None, small_params(), 3, false).unwrap();
        let initial = model.solution().to_vec();
        let probs = model.probabilities().clone();

        model.run(10, false);
        model.reinitialise(3);

        assert_eq!(model.iteration(), 0);
        assert_eq!(model.solution(), initial.as_slice());
        assert!(model.gains().iter().flatten().all(|&g| g == 1.0));
        assert_eq!(model.probabilities(), &probs);
    }

    #[test]
    fn test_normalise_bounds() {
        let mut model: Tsne<f64> =
            Tsne::new(&four_points(), None, small_params(), 5, false).unwrap();
        model.run(50, false);
        model.normalise();

        for d in 0..2 {
            let vals: Vec<f64> = model.solution().iter().map(|p| p[d]).collect();
            let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
            let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(min, 0.0);
            assert_eq!(max, 1.0);
        }
    }

    #[test]
    fn test_tsne_driver_shape() {
        let data = faer::Mat::from_fn(12, 4, |i, j| (i * 4 + j) as f64 * 0.1);
        let params = TsneParams {
            perplexity: 3.0,
            ..TsneParams::default()
        };
        let embd = tsne(data.as_ref(), &params, 20, 42, false).unwrap();
        assert_eq!(embd.len(), 2);
        assert!(embd.iter().all(|axis| axis.len() == 12));
        assert!(embd.iter().flatten().all(|v| v.is_finite()));
    }
}
