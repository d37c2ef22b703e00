///////////////////
// Vector macros //
///////////////////

/// Assertion that all vectors have the same length.
#[macro_export]
macro_rules! assert_same_len {
    ($($vec:expr),+ $(,)?) => {
        {
            let lengths: Vec<usize> = vec![$($vec.len()),+];
            let first_len = lengths[0];

            if !lengths.iter().all(|&len| len == first_len) {
                panic!(
                    "Vectors have different lengths: {:?}",
                    lengths
                );
            }
        }
    };
}

/// Assertion that a nested matrix (`Vec<Vec<T>>`) has the expected shape.
#[macro_export]
macro_rules! assert_matrix_shape {
    ($mat:expr, $n_rows:expr, $n_cols:expr) => {
        {
            if $mat.len() != $n_rows || $mat.iter().any(|row| row.len() != $n_cols) {
                panic!(
                    "Matrix does not have the expected shape {} x {}",
                    $n_rows, $n_cols
                );
            }
        }
    };
}
