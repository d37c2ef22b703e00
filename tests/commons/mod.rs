#![allow(dead_code)]

use faer::Mat;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Create a synthetic dataset with well-separated clusters
///
/// Cluster `c` is centred at `20 * c` on the first axis; every coordinate
/// gets uniform noise in [-0.25, 0.25].
pub fn create_diagnostic_data(
    n_per_cluster: usize,
    n_clusters: usize,
    n_dim: usize,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_total = n_per_cluster * n_clusters;

    let mut data_vec = Vec::with_capacity(n_total * n_dim);
    let mut labels = Vec::with_capacity(n_total);

    for cluster_id in 0..n_clusters {
        for _ in 0..n_per_cluster {
            for dim in 0..n_dim {
                let centre = if dim == 0 { 20.0 * cluster_id as f64 } else { 0.0 };
                let noise: f64 = rng.random::<f64>() * 0.5 - 0.25;
                data_vec.push(centre + noise);
            }
            labels.push(cluster_id);
        }
    }

    let data = Mat::from_fn(n_total, n_dim, |i, j| data_vec[i * n_dim + j]);
    (data, labels)
}

/// Euclidean distance between two embedded points
pub fn embd_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Mean intra- and inter-cluster distance in an embedding
///
/// ### Returns
///
/// Tuple of `(mean intra-cluster distance, mean inter-cluster distance)`
pub fn intra_inter_distances(embd: &[Vec<f64>], labels: &[usize]) -> (f64, f64) {
    let mut intra = (0.0, 0usize);
    let mut inter = (0.0, 0usize);

    for i in 0..embd.len() {
        for j in (i + 1)..embd.len() {
            let d = embd_dist(&embd[i], &embd[j]);
            if labels[i] == labels[j] {
                intra.0 += d;
                intra.1 += 1;
            } else {
                inter.0 += d;
                inter.1 += 1;
            }
        }
    }

    (intra.0 / intra.1 as f64, inter.0 / inter.1 as f64)
}

/// Per-axis mean of an embedding
pub fn axis_means(embd: &[Vec<f64>]) -> Vec<f64> {
    let n_dim = embd[0].len();
    (0..n_dim)
        .map(|d| embd.iter().map(|p| p[d]).sum::<f64>() / embd.len() as f64)
        .collect()
}
