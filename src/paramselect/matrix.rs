//! Numeric design matrices built from candidate features and dataset
//! temperature points.

use super::features::Property;
use super::selection::ParameterMapping;
use crate::datasets::Dataset;
use crate::error::{CalphadError, Result};
use crate::symbolic::{Expression, SimpleContext};
use ndarray::{Array1, Array2};

/// Design matrix for one property
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// One row per retained observation, one column per feature
    pub matrix: Array2<f64>,
    /// Temperatures of the retained observations, in row order
    pub temperatures: Array1<f64>,
    /// The features after the property transform
    pub transformed: Vec<Expression>,
}

impl FeatureMatrix {
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }
}

/// Apply the property transform to each feature
pub fn transform_features(property: Property, features: &[Expression]) -> Result<Vec<Expression>> {
    features.iter().map(|f| property.transform(f)).collect()
}

/// Evaluate each expression at each temperature: rows are temperatures,
/// columns are expressions.
pub fn evaluate_features(
    expressions: &[Expression],
    temperatures: &Array1<f64>,
) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((temperatures.len(), expressions.len()));
    for (i, &t) in temperatures.iter().enumerate() {
        let ctx = SimpleContext::temperature(t);
        for (j, expr) in expressions.iter().enumerate() {
            matrix[[i, j]] = expr.evaluate(&ctx)?;
        }
    }
    Ok(matrix)
}

/// Temperatures of all records concatenated in record order, keeping only
/// those at or above `min_temperature`.
pub fn filtered_temperatures(data: &[&Dataset], min_temperature: f64) -> Array1<f64> {
    data.iter()
        .flat_map(|d| d.temperatures().iter().copied())
        .filter(|&t| t >= min_temperature)
        .collect()
}

/// Build the feature matrix of `property` for the records in `data`.
pub fn build_feature_matrix(
    property: Property,
    features: &[Expression],
    data: &[&Dataset],
    min_temperature: f64,
) -> Result<FeatureMatrix> {
    let transformed = transform_features(property, features)?;
    let temperatures = filtered_temperatures(data, min_temperature);
    let matrix = evaluate_features(&transformed, &temperatures)?;
    Ok(FeatureMatrix {
        matrix,
        temperatures,
        transformed,
    })
}

/// Response vector aligned with the rows of a feature matrix.
///
/// When every record has one value per temperature, values are filtered with
/// the same temperature mask. Otherwise the concatenated values are trimmed
/// from the front (the low-temperature end) down to `rows`.
///
/// # Errors
///
/// * `CalphadError::DimensionMismatch` if fewer values than `rows` remain
pub fn response_vector(
    data: &[&Dataset],
    rows: usize,
    min_temperature: f64,
) -> Result<Array1<f64>> {
    let elementwise = data.iter().all(|d| d.values.len() == d.temperatures().len());
    let values: Vec<f64> = if elementwise {
        data.iter()
            .flat_map(|d| {
                d.temperatures()
                    .iter()
                    .zip(&d.values)
                    .filter(|&(&t, _)| t >= min_temperature)
                    .map(|(_, &v)| v)
            })
            .collect()
    } else {
        data.iter().flat_map(|d| d.values.iter().copied()).collect()
    };

    if values.len() < rows {
        return Err(CalphadError::DimensionMismatch(format!(
            "{} values for {} observations",
            values.len(),
            rows
        )));
    }
    Ok(Array1::from(values[values.len() - rows..].to_vec()))
}

/// Contribution of already fitted features to `property` at each temperature:
/// the property transform of every feature in `fitted`, dotted with its
/// coefficient.
pub fn fixed_portion(
    property: Property,
    fitted: &ParameterMapping,
    temperatures: &Array1<f64>,
) -> Result<Array1<f64>> {
    if fitted.is_empty() {
        return Ok(Array1::zeros(temperatures.len()));
    }
    let features: Vec<Expression> = fitted.features().cloned().collect();
    let transformed = transform_features(property, &features)?;
    let matrix = evaluate_features(&transformed, temperatures)?;
    Ok(matrix.dot(&fitted.coefficients()))
}
