use num_traits::Float;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

////////////
// Random //
////////////

/// Gaussian embedding initialisation
///
/// Draws every coordinate from `N(0, std^2)`. With the tiny default standard
/// deviation all points start close to the origin without any symmetric
/// configuration that the optimiser could get stuck in.
///
/// ### Params
///
/// * `n_samples` - Number of samples to initialise
/// * `n_comp` - Dimensionality of the embedding
/// * `std` - Standard deviation of the coordinates
/// * `rng` - The random number generator to draw from
///
/// ### Returns
///
/// Embedding coordinates as `Vec<Vec<T>>` where the outer vector is samples
/// and the inner vector is components
pub fn gaussian_layout<T, R>(n_samples: usize, n_comp: usize, std: T, rng: &mut R) -> Vec<Vec<T>>
where
    T: Float,
    R: Rng + ?Sized,
    StandardNormal: Distribution<T>,
{
    let mut embedding = vec![vec![T::zero(); n_comp]; n_samples];

    for i in 0..n_samples {
        for j in 0..n_comp {
            let z: T = StandardNormal.sample(&mut *rng);
            embedding[i][j] = z * std;
        }
    }

    embedding
}

/// Seeded version of [`gaussian_layout`]
///
/// ### Params
///
/// * `n_samples` - Number of samples to initialise
/// * `n_comp` - Dimensionality of the embedding
/// * `std` - Standard deviation of the coordinates
/// * `seed` - Random seed
///
/// ### Returns
///
/// Embedding coordinates
pub fn gaussian_layout_seeded<T>(n_samples: usize, n_comp: usize, std: T, seed: u64) -> Vec<Vec<T>>
where
    T: Float,
    StandardNormal: Distribution<T>,
{
    let mut rng = StdRng::seed_from_u64(seed);
    gaussian_layout(n_samples, n_comp, std, &mut rng)
}

///////////
// Tests //
///////////
