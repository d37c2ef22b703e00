pub mod tsne_optimiser;

use num_traits::{Float, FromPrimitive};

/////////////
// Globals //
/////////////

const TSNE_LR: f64 = 10.0;
const TSNE_EARLY_EXAG_ITER: usize = 100;
const TSNE_EARLY_EXAG_FACTOR: f64 = 4.0;
const TSNE_MOMENTUM_SWITCH_ITER: usize = 250;
const TSNE_INITIAL_MOMENTUM: f64 = 0.5;
const TSNE_FINAL_MOMENTUM: f64 = 0.8;
const TSNE_GAIN_INCREASE: f64 = 0.2;
const TSNE_GAIN_DECAY: f64 = 0.8;
const TSNE_INIT_STD: f64 = 1e-4;

///////////////
// Execution //
///////////////

/// How the per-step work is scheduled
///
/// Both variants produce bit-identical results: every reduction is done per
/// item first and then summed in item order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TsneExecution {
    /// Single-threaded
    Sequential,
    /// Rayon thread pool, one task per item
    #[default]
    Parallel,
}

/// Parse the execution strategy
///
/// ### Params
///
/// * `s` - String defining the strategy. Choice of
///   `"sequential" | "serial" | "single"` or `"parallel" | "rayon" | "multi"`.
///
/// ### Return
///
/// Option of TsneExecution
pub fn parse_tsne_execution(s: &str) -> Option<TsneExecution> {
    match s.to_lowercase().as_str() {
        "sequential" | "serial" | "single" => Some(TsneExecution::Sequential),
        "parallel" | "rayon" | "multi" => Some(TsneExecution::Parallel),
        _ => None,
    }
}

////////////
// Params //
////////////

/// t-SNE optimisation parameters
///
/// The defaults are the empirically tuned constants of the exact t-SNE
/// formulation. Changing them changes convergence behaviour materially.
///
/// ### Fields
///
/// * `lr` - Learning rate (epsilon)
/// * `early_exag_iter` - Iterations during which P is exaggerated
/// * `early_exag_factor` - Multiplier applied to P during early exaggeration
/// * `momentum_switch_iter` - Iteration from which `final_momentum` is used
/// * `initial_momentum` - Momentum before the switch
/// * `final_momentum` - Momentum after the switch
/// * `gain_increase` - Added to a gain when gradient and last step disagree in
///   sign
/// * `gain_decay` - Multiplies a gain when gradient and last step agree in
///   sign
/// * `init_std` - Standard deviation of the Gaussian initialisation
#[derive(Clone, Debug)]
pub struct TsneOptimParams<T> {
    pub lr: T,
    pub early_exag_iter: usize,
    pub early_exag_factor: T,
    pub momentum_switch_iter: usize,
    pub initial_momentum: T,
    pub final_momentum: T,
    pub gain_increase: T,
    pub gain_decay: T,
    pub init_std: T,
}

impl<T> TsneOptimParams<T>
where
    T: Float + FromPrimitive,
{
    /// Generate a new instance
    ///
    /// Anything left as `None` falls back to the default.
    ///
    /// ### Params
    ///
    /// * `lr` - Learning rate. Default `10.0`.
    /// * `early_exag_iter` - Early exaggeration iterations. Default `100`.
    /// * `early_exag_factor` - Early exaggeration factor. Default `4.0`.
    /// * `momentum_switch_iter` - Momentum switch. Default `250`.
    /// * `initial_momentum` - Default `0.5`.
    /// * `final_momentum` - Default `0.8`.
    ///
    /// ### Returns
    ///
    /// Initialised self
    pub fn new(
        lr: Option<T>,
        early_exag_iter: Option<usize>,
        early_exag_factor: Option<T>,
        momentum_switch_iter: Option<usize>,
        initial_momentum: Option<T>,
        final_momentum: Option<T>,
    ) -> Self {
        let defaults = Self::default();

        Self {
            lr: lr.unwrap_or(defaults.lr),
            early_exag_iter: early_exag_iter.unwrap_or(defaults.early_exag_iter),
            early_exag_factor: early_exag_factor.unwrap_or(defaults.early_exag_factor),
            momentum_switch_iter: momentum_switch_iter.unwrap_or(defaults.momentum_switch_iter),
            initial_momentum: initial_momentum.unwrap_or(defaults.initial_momentum),
            final_momentum: final_momentum.unwrap_or(defaults.final_momentum),
            ..defaults
        }
    }

    /// Early exaggeration multiplier for a given iteration
    #[inline]
    pub fn exaggeration(&self, iter: usize) -> T {
        if iter < self.early_exag_iter {
            self.early_exag_factor
        } else {
            T::one()
        }
    }

    /// Momentum coefficient for a given iteration
    #[inline]
    pub fn momentum(&self, iter: usize) -> T {
        if iter < self.momentum_switch_iter {
            self.initial_momentum
        } else {
            self.final_momentum
        }
    }
}

impl<T: Float + FromPrimitive> Default for TsneOptimParams<T> {
    fn default() -> Self {
        Self {
            lr: T::from_f64(TSNE_LR).unwrap(),
            early_exag_iter: TSNE_EARLY_EXAG_ITER,
            early_exag_factor: T::from_f64(TSNE_EARLY_EXAG_FACTOR).unwrap(),
            momentum_switch_iter: TSNE_MOMENTUM_SWITCH_ITER,
            initial_momentum: T::from_f64(TSNE_INITIAL_MOMENTUM).unwrap(),
            final_momentum: T::from_f64(TSNE_FINAL_MOMENTUM).unwrap(),
            gain_increase: T::from_f64(TSNE_GAIN_INCREASE).unwrap(),
            gain_decay: T::from_f64(TSNE_GAIN_DECAY).unwrap(),
            init_std: T::from_f64(TSNE_INIT_STD).unwrap(),
        }
    }
}

///////////
// Tests //
///////////
