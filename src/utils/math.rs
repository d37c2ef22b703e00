use num_traits::{Float, FromPrimitive};

/////////////
// Globals //
/////////////

/// Smallest value a probability in P or Q may take
pub const PROB_FLOOR: f64 = 1e-100;

/// Probabilities below this cut-off do not contribute to the row entropy
pub const ENTROPY_CUTOFF: f64 = 1e-7;

/////////////
// Helpers //
/////////////

/// Returns the probability floor in the working precision
///
/// `1e-100` underflows for `f32`, so the floor falls back to the smallest
/// positive normal value of `T` in that case. The result is always strictly
/// positive.
///
/// ### Returns
///
/// The floor used for the P and Q matrices
#[inline]
pub fn prob_floor<T>() -> T
where
    T: Float + FromPrimitive,
{
    T::from_f64(PROB_FLOOR)
        .unwrap_or_else(T::min_positive_value)
        .max(T::min_positive_value())
}

/// Squared Euclidean distance between two vectors
///
/// ### Params
///
/// * `a` - Vector a
/// * `b` - Vector b
///
/// ### Returns
///
/// Sum of the squared element-wise differences
#[inline]
pub fn squared_euclidean<T>(a: &[T], b: &[T]) -> T
where
    T: Float,
{
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| {
        let diff = x - y;
        acc + diff * diff
    })
}

/// Three-valued sign
///
/// Unlike `Float::signum()`, zero (of either sign) maps to `0`.
#[inline(always)]
pub fn sign<T>(x: T) -> i8
where
    T: Float,
{
    if x > T::zero() {
        1
    } else if x < T::zero() {
        -1
    } else {
        0
    }
}

/// Shannon entropy (natural log) of a normalised distribution
///
/// Entries at or below `ENTROPY_CUTOFF` are skipped.
///
/// ### Params
///
/// * `probs` - Probabilities that sum to one
///
/// ### Returns
///
/// `-sum(p * ln(p))`
pub fn shannon_entropy<T>(probs: &[T]) -> T
where
    T: Float + FromPrimitive,
{
    let cutoff = T::from_f64(ENTROPY_CUTOFF).unwrap();
    probs
        .iter()
        .filter(|&&p| p > cutoff)
        .fold(T::zero(), |acc, &p| acc - p * p.ln())
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_math {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prob_floor_is_positive() {
        assert_relative_eq!(prob_floor::<f64>(), 1e-100);
        assert!(prob_floor::<f32>() > 0.0);
        assert_eq!(prob_floor::<f32>(), f32::MIN_POSITIVE);
    }

    #[test]
    fn test_squared_euclidean() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 2.0, 2.0];
        assert_relative_eq!(squared_euclidean(&a, &b), 9.0);
        assert_relative_eq!(squared_euclidean(&b, &a), 9.0);
        assert_relative_eq!(squared_euclidean(&b, &b), 0.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(2.5_f64), 1);
        assert_eq!(sign(-0.1_f64), -1);
        assert_eq!(sign(0.0_f64), 0);
        assert_eq!(sign(-0.0_f64), 0);
    }

    #[test]
    fn test_shannon_entropy() {
        // uniform over four entries -> ln(4)
        let uniform = [0.25_f64; 4];
        assert_relative_eq!(shannon_entropy(&uniform), 4.0_f64.ln(), epsilon = 1e-12);

        // point mass -> 0
        let peaked = [0.0_f64, 1.0, 0.0];
        assert_relative_eq!(shannon_entropy(&peaked), 0.0);
    }
}
