use num_traits::{Float, FromPrimitive};

/// Rescale every axis of an embedding into [0, 1]
///
/// Each axis is mapped linearly using its own min and max, so the smallest
/// value becomes exactly 0 and the largest exactly 1. An axis without spread
/// (min == max) has no meaningful scale and is mapped to 0.5 everywhere.
///
/// ### Params
///
/// * `embd` - Mutable embedding (samples × components) to rescale in place
pub fn normalise_embedding<T>(embd: &mut [Vec<T>])
where
    T: Float + FromPrimitive,
{
    let Some(first) = embd.first() else {
        return;
    };
    let n_dim = first.len();
    let half = T::from_f64(0.5).unwrap();

    let mut mins = first.clone();
    let mut maxs = first.clone();
    for point in embd.iter().skip(1) {
        for d in 0..n_dim {
            mins[d] = mins[d].min(point[d]);
            maxs[d] = maxs[d].max(point[d]);
        }
    }

    for point in embd.iter_mut() {
        for d in 0..n_dim {
            let range = maxs[d] - mins[d];
            point[d] = if range > T::zero() {
                (point[d] - mins[d]) / range
            } else {
                half
            };
        }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_normalise {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalise_unit_range() {
        let mut embd = vec![vec![-3.0, 10.0], vec![1.0, 20.0], vec![5.0, 15.0]];
        normalise_embedding(&mut embd);

        assert_relative_eq!(embd[0][0], 0.0);
        assert_relative_eq!(embd[1][0], 0.5);
        assert_relative_eq!(embd[2][0], 1.0);
        assert_relative_eq!(embd[0][1], 0.0);
        assert_relative_eq!(embd[1][1], 1.0);
        assert_relative_eq!(embd[2][1], 0.5);
    }

    #[test]
    fn test_normalise_degenerate_axis() {
        let mut embd = vec![vec![2.0, 1.0], vec![2.0, 3.0]];
        normalise_embedding(&mut embd);

        assert_relative_eq!(embd[0][0], 0.5);
        assert_relative_eq!(embd[1][0], 0.5);
        assert_relative_eq!(embd[0][1], 0.0);
        assert_relative_eq!(embd[1][1], 1.0);
    }

    #[test]
    fn test_normalise_empty_and_single() {
        let mut empty: Vec<Vec<f64>> = Vec::new();
        normalise_embedding(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![vec![4.0_f64, -1.0]];
        normalise_embedding(&mut single);
        assert_eq!(single, vec![vec![0.5, 0.5]]);
    }
}
