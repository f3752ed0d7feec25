//! Incremental model selection by information criterion.
//!
//! For a feature matrix with N candidate columns, models using the first
//! 1, 2, ..., N columns are fitted by ordinary least squares and scored with
//!
//! ```text
//! AIC = 2k + M ln(RSS)
//! ```
//!
//! where k is the number of columns used and M the number of observations.
//! The lowest score wins; on exact ties the smaller model is kept.

use crate::error::{CalphadError, Result};
use crate::symbolic::Expression;
use crate::utils::lstsq;
use ndarray::{s, Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Numerical settings of the selector and feature matrix builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    /// Observations below this temperature (K) are dropped
    pub min_temperature: f64,

    /// Singular values below this fraction of the largest are treated as zero
    pub svd_tolerance: f64,

    /// Relative floor on the RSS before taking its logarithm, so that exact
    /// fits score finitely. Scaled by `max(y·y, 1)`.
    pub rss_floor: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_temperature: 298.15,
            svd_tolerance: 1e-12,
            rss_floor: f64::EPSILON,
        }
    }
}

/// Score of one candidate model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelScore {
    pub num_params: usize,
    pub rss: f64,
    pub aic: f64,
}

/// Ordered mapping from feature to fitted coefficient.
///
/// Keys are unique; inserting an existing feature overwrites its value in
/// place. Serializes as a list of `[feature, value]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMapping {
    entries: Vec<(Expression, f64)>,
}

impl ParameterMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the coefficient of `feature`
    pub fn insert(&mut self, feature: Expression, value: f64) {
        match self.entries.iter_mut().find(|(k, _)| *k == feature) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((feature, value)),
        }
    }

    pub fn get(&self, feature: &Expression) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == feature)
            .map(|(_, v)| *v)
    }

    /// Insert every entry of `other`, in its order
    pub fn merge(&mut self, other: ParameterMapping) {
        for (feature, value) in other.entries {
            self.insert(feature, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Expression, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    pub fn features(&self) -> impl Iterator<Item = &Expression> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn coefficients(&self) -> Array1<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Expression, f64)> for ParameterMapping {
    fn from_iter<I: IntoIterator<Item = (Expression, f64)>>(iter: I) -> Self {
        let mut mapping = ParameterMapping::new();
        for (feature, value) in iter {
            mapping.insert(feature, value);
        }
        mapping
    }
}

/// Outcome of a model selection: all candidate scores and the winner
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Every feature mapped to its coefficient in the winning model
    pub parameters: ParameterMapping,
    /// One score per candidate, ordered by model size
    pub scores: Vec<ModelScore>,
    /// Number of features used by the winning model
    pub selected: usize,
}

/// Fit every prefix model of `feature_matrix` and keep the one with the
/// lowest AIC.
///
/// # Errors
///
/// * `CalphadError::DimensionMismatch` if the matrix, response and feature
///   list disagree in shape, or no features are given
/// * `CalphadError::InsufficientObservations` if there are fewer rows than
///   features
/// * `CalphadError::LinearAlgebra` if a least-squares solve fails
pub fn select_model(
    feature_matrix: ArrayView2<'_, f64>,
    data_quantities: &Array1<f64>,
    features: &[Expression],
    config: &SelectionConfig,
) -> Result<Selection> {
    let (m, n) = feature_matrix.dim();
    if n == 0 || n != features.len() {
        return Err(CalphadError::DimensionMismatch(format!(
            "feature matrix has {} columns for {} features",
            n,
            features.len()
        )));
    }
    if m != data_quantities.len() {
        return Err(CalphadError::DimensionMismatch(format!(
            "feature matrix has {} rows but response has {} values",
            m,
            data_quantities.len()
        )));
    }
    if m < n {
        return Err(CalphadError::InsufficientObservations {
            observations: m,
            features: n,
        });
    }

    let floor = config.rss_floor * data_quantities.dot(data_quantities).max(1.0);
    let mut scores = Vec::with_capacity(n);
    let mut results = Vec::with_capacity(n);

    for num_params in 1..=n {
        let current = feature_matrix.slice(s![.., ..num_params]);
        let solution = lstsq(current, data_quantities, config.svd_tolerance)?;
        let aic = 2.0 * num_params as f64 + m as f64 * solution.rss.max(floor).ln();
        debug!(
            features = %display_features(&features[..num_params]),
            rss = solution.rss,
            aic,
            "candidate model"
        );
        scores.push(ModelScore {
            num_params,
            rss: solution.rss,
            aic,
        });
        results.push(solution.coefficients);
    }

    // first minimum wins
    let mut best = 0;
    for (idx, score) in scores.iter().enumerate() {
        if score.aic < scores[best].aic {
            best = idx;
        }
    }

    let winner = &results[best];
    let parameters = features
        .iter()
        .enumerate()
        .map(|(j, f)| (f.clone(), winner.get(j).copied().unwrap_or(0.0)))
        .collect();

    Ok(Selection {
        parameters,
        scores,
        selected: best + 1,
    })
}

/// Coefficients of the best prefix model; features beyond the selected
/// order map to exactly zero. See [`select_model`].
pub fn fit_parameters(
    feature_matrix: ArrayView2<'_, f64>,
    data_quantities: &Array1<f64>,
    features: &[Expression],
    config: &SelectionConfig,
) -> Result<ParameterMapping> {
    select_model(feature_matrix, data_quantities, features, config).map(|s| s.parameters)
}

fn display_features(features: &[Expression]) -> String {
    let names: Vec<String> = features.iter().map(|f| f.to_string()).collect();
    format!("({})", names.join(", "))
}
