use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate well-separated Gaussian clusters
///
/// Cluster `c` is centred at `c * separation` on every axis, so neighbouring
/// clusters are `separation * sqrt(dim)` apart. Samples are ordered by
/// cluster.
///
/// ### Params
///
/// * `n_per_cluster` - Number of samples per cluster
/// * `n_clusters` - Number of clusters
/// * `dim` - Dimensionality of the ambient space
/// * `separation` - Offset between consecutive cluster centres per axis
/// * `cluster_std` - Standard deviation within each cluster
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// Tuple of (matrix of shape (n_per_cluster * n_clusters, dim), labels)
pub fn generate_gaussian_clusters(
    n_per_cluster: usize,
    n_clusters: usize,
    dim: usize,
    separation: f64,
    cluster_std: f64,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_samples = n_per_cluster * n_clusters;
    let mut data = Mat::<f64>::zeros(n_samples, dim);
    let mut labels = Vec::with_capacity(n_samples);

    for cluster_idx in 0..n_clusters {
        let centre = cluster_idx as f64 * separation;
        for k in 0..n_per_cluster {
            let i = cluster_idx * n_per_cluster + k;
            for j in 0..dim {
                // Box-Muller; 1 - u keeps the log argument in (0, 1]
                let u1: f64 = 1.0 - rng.random::<f64>();
                let u2: f64 = rng.random();
                let noise = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                data[(i, j)] = centre + noise * cluster_std;
            }
            labels.push(cluster_idx);
        }
    }

    (data, labels)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_synthetic {
    use super::*;

    #[test]
    fn test_gaussian_clusters_shape_and_labels() {
        let (data, labels) = generate_gaussian_clusters(20, 2, 5, 100.0, 0.5, 42);
        assert_eq!(data.nrows(), 40);
        assert_eq!(data.ncols(), 5);
        assert_eq!(labels.len(), 40);
        assert_eq!(labels.iter().filter(|&&l| l == 1).count(), 20);

        // second cluster sits around 100 on every axis
        for i in 20..40 {
            for j in 0..5 {
                assert!((data[(i, j)] - 100.0).abs() < 5.0);
            }
        }
    }
}
