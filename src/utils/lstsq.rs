//! Ordinary least squares without intercept.
//!
//! The design matrices seen here mix columns of very different magnitude
//! (`T³` next to `1/T`), so each column is scaled to unit L2 norm before the
//! SVD solve and the coefficients are rescaled afterwards. No centering is
//! applied since the model has no intercept.

use super::matrix_convert::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra};
use crate::error::{CalphadError, Result};
use ndarray::{Array1, ArrayView2, Axis};

/// Solution of a least-squares problem
#[derive(Debug, Clone, PartialEq)]
pub struct LstsqSolution {
    /// Coefficients in the original (unscaled) column units
    pub coefficients: Array1<f64>,
    /// Residual sum of squares
    pub rss: f64,
}

/// Solve `min ||x·β - y||²` by SVD on norm-scaled columns.
///
/// Singular values below `rel_tolerance` times the largest one are treated as
/// zero, which yields the minimum-norm solution for rank-deficient inputs.
///
/// # Errors
///
/// * `CalphadError::DimensionMismatch` if `x` and `y` disagree in length or
///   either is empty
/// * `CalphadError::LinearAlgebra` if the solve fails or produces non-finite
///   coefficients
pub fn lstsq(x: ArrayView2<'_, f64>, y: &Array1<f64>, rel_tolerance: f64) -> Result<LstsqSolution> {
    if x.nrows() != y.len() {
        return Err(CalphadError::DimensionMismatch(format!(
            "design matrix has {} rows but response has {} values",
            x.nrows(),
            y.len()
        )));
    }

    let scales: Array1<f64> = x
        .axis_iter(Axis(1))
        .map(|col| {
            let norm = col.dot(&col).sqrt();
            if norm > 0.0 && norm.is_finite() {
                norm
            } else {
                1.0
            }
        })
        .collect();
    let scaled = &x / &scales;

    let a = ndarray_to_nalgebra(scaled.view())?;
    let b = ndarray_vec_to_nalgebra(y)?;

    let svd = a.svd(true, true);
    let threshold = rel_tolerance * svd.singular_values.max();
    let beta = svd
        .solve(&b, threshold)
        .map_err(|e| CalphadError::LinearAlgebra(e.to_string()))?;

    let coefficients = nalgebra_vec_to_ndarray(&beta) / &scales;
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(CalphadError::LinearAlgebra(
            "least-squares solution is not finite".to_string(),
        ));
    }

    let residuals = x.dot(&coefficients) - y;
    let rss = residuals.dot(&residuals);
    Ok(LstsqSolution { coefficients, rss })
}
