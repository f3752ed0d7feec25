//! Conversions between ndarray and nalgebra containers.
//!
//! Feature matrices and response vectors are built with ndarray; the
//! least-squares solve runs on nalgebra's SVD. These helpers move data across
//! that boundary.

use crate::error::{CalphadError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView2};

/// Convert an ndarray matrix view to a nalgebra DMatrix.
///
/// # Errors
///
/// * `CalphadError::DimensionMismatch` if the matrix has no rows or no columns
pub fn ndarray_to_nalgebra(arr: ArrayView2<'_, f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = arr.dim();
    if rows == 0 || cols == 0 {
        return Err(CalphadError::DimensionMismatch(format!(
            "cannot convert an empty {}x{} matrix",
            rows, cols
        )));
    }
    Ok(DMatrix::from_fn(rows, cols, |i, j| arr[[i, j]]))
}

/// Convert a nalgebra DMatrix to an ndarray Array2.
pub fn nalgebra_to_ndarray(mat: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Convert an ndarray vector to a nalgebra DVector.
///
/// # Errors
///
/// * `CalphadError::DimensionMismatch` if the vector is empty
pub fn ndarray_vec_to_nalgebra(arr: &Array1<f64>) -> Result<DVector<f64>> {
    if arr.is_empty() {
        return Err(CalphadError::DimensionMismatch(
            "cannot convert an empty vector".to_string(),
        ));
    }
    Ok(DVector::from_iterator(arr.len(), arr.iter().copied()))
}

/// Convert a nalgebra DVector to an ndarray Array1.
pub fn nalgebra_vec_to_ndarray(vec: &DVector<f64>) -> Array1<f64> {
    vec.iter().copied().collect()
}
