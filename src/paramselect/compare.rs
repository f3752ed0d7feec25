//! Comparison of fitted parameters against the data they were fitted to.
//!
//! Produces numeric series (the fitted curve on a grid plus the data points)
//! that a plotting front end can draw directly.

use super::features::{axis_label, Property};
use super::selection::ParameterMapping;
use crate::datasets::{get_data, normalize_configuration, Dataset, Datasets, SublatticeEntry};
use crate::error::{CalphadError, Result};
use crate::symbolic::{Expression, SimpleContext, TEMPERATURE};
use ndarray::Array1;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of grid points of the fitted curve
pub const GRID_POINTS: usize = 100;

/// Reference temperature for shifting enthalpy data
pub const REFERENCE_TEMPERATURE: f64 = 298.15;

/// Observed values of one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSeries {
    pub reference: Option<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Fitted curve and data for one (x, y) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterComparison {
    pub x: String,
    pub y: Property,
    pub x_label: String,
    pub y_label: String,
    pub x_min: f64,
    pub x_max: f64,
    pub predicted_x: Vec<f64>,
    pub predicted_y: Vec<f64>,
    pub data: Vec<DataSeries>,
}

/// The default comparisons: every heat capacity, entropy and enthalpy
/// property against temperature
pub fn default_plots() -> Vec<(String, Property)> {
    [
        Property::Cpm,
        Property::CpmForm,
        Property::Sm,
        Property::SmForm,
        Property::Hm,
        Property::HmForm,
    ]
    .into_iter()
    .map(|p| (TEMPERATURE.to_string(), p))
    .collect()
}

/// `y` as a function of the fitted features plus `refdata`
pub fn fitted_expression(
    parameters: &ParameterMapping,
    y: Property,
    refdata: &Expression,
) -> Result<Expression> {
    let mut fit_eq = refdata.clone();
    for (feature, value) in parameters.iter() {
        fit_eq = fit_eq + y.transform(feature)? * Expression::Number(value);
    }
    Ok(fit_eq.simplify())
}

fn evaluate_at(expr: &Expression, variable: &str, value: f64) -> Result<f64> {
    let mut ctx = SimpleContext::new();
    ctx.set_variable(variable, value);
    Ok(expr.evaluate(&ctx)?)
}

fn data_series(data: &Dataset, x: &str) -> (Vec<f64>, Vec<f64>) {
    let indep = data.conditions.get(x).cloned().unwrap_or_default();
    let response = data.values.clone();
    if x != TEMPERATURE {
        return (indep, response);
    }
    if indep.len() == response.len() {
        indep
            .iter()
            .zip(&response)
            .filter(|&(&t, _)| t >= REFERENCE_TEMPERATURE)
            .map(|(&t, &v)| (t, v))
            .unzip()
    } else {
        let kept: Vec<f64> = indep.into_iter().filter(|&t| t >= REFERENCE_TEMPERATURE).collect();
        let start = response.len().saturating_sub(kept.len());
        (kept, response[start..].to_vec())
    }
}

/// Evaluate the fitted property `y` on a grid over `x` and collect the data
/// series of `desired_data`.
///
/// The grid spans the data range widened to include `[0, 1]`. For
/// temperature it starts at 300 K, reaches at least 1000 K, and data below
/// 298.15 K are dropped. Enthalpy (`HM`) and Gibbs energy (`GM`) data are
/// assumed zeroed at 298.15 K and are shifted by the fitted value there.
pub fn compare_data_to_parameters(
    desired_data: &[&Dataset],
    parameters: &ParameterMapping,
    x: &str,
    y: Property,
    refdata: &Expression,
) -> Result<ParameterComparison> {
    let observed = desired_data
        .iter()
        .flat_map(|d| d.conditions.get(x).into_iter().flatten().copied());
    // the grid always covers [0, 1]; temperature grids start at 300 K
    let (mut x_min, mut x_max) =
        observed.fold((0.0_f64, 1.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if x == TEMPERATURE {
        x_min = x_min.max(300.0);
        x_max = x_max.max(1000.0);
    }

    let fit_eq = fitted_expression(parameters, y, refdata)?;
    let predicted_x = Array1::linspace(x_min, x_max, GRID_POINTS).to_vec();
    let predicted_y = predicted_x
        .iter()
        .map(|&v| evaluate_at(&fit_eq, x, v))
        .collect::<Result<Vec<f64>>>()?;

    let mut data = Vec::with_capacity(desired_data.len());
    for dataset in desired_data {
        let (xs, mut ys) = data_series(dataset, x);
        if dataset.output == "HM" || dataset.output == "GM" {
            let shift = evaluate_at(&fit_eq, x, REFERENCE_TEMPERATURE)?;
            ys.iter_mut().for_each(|v| *v += shift);
        }
        data.push(DataSeries {
            reference: dataset.reference.clone(),
            x: xs,
            y: ys,
        });
    }

    Ok(ParameterComparison {
        x: x.to_string(),
        y,
        x_label: axis_label(x).to_string(),
        y_label: y.label().to_string(),
        x_min,
        x_max,
        predicted_x,
        predicted_y,
        data,
    })
}

/// Compare `parameters` with the data of every `(x, y)` pair in `plots`
/// (default: [`default_plots`]).
///
/// Properties that are not of formation include the reference-state
/// contribution: for each sublattice, its site ratio times the property
/// transform of `refstate[species]`. Vacancies contribute nothing.
///
/// # Errors
///
/// * `CalphadError::NotImplemented` if `configuration` is not an end-member
/// * `CalphadError::DimensionMismatch` if `subl_ratios` does not have one
///   ratio per sublattice
/// * `CalphadError::SymbolNotFound` if a component has no reference state
#[allow(clippy::too_many_arguments)]
pub fn parameter_comparisons<S: AsRef<str>>(
    comps: &[S],
    phase_name: &str,
    configuration: &[SublatticeEntry],
    subl_ratios: &[f64],
    datasets: &Datasets,
    parameters: &ParameterMapping,
    plots: Option<&[(String, Property)]>,
    refstate: &BTreeMap<String, Expression>,
) -> Result<Vec<ParameterComparison>> {
    let configuration = normalize_configuration(configuration);
    if configuration.iter().any(|subl| subl.len() != 1) {
        return Err(CalphadError::NotImplemented(
            "comparison of non-endmember configurations".to_string(),
        ));
    }
    if subl_ratios.len() != configuration.len() {
        return Err(CalphadError::DimensionMismatch(format!(
            "{} site ratios for {} sublattices",
            subl_ratios.len(),
            configuration.len()
        )));
    }
    let mut comps: Vec<String> = comps.iter().map(|c| c.as_ref().to_uppercase()).collect();
    comps.sort();

    let default = default_plots();
    let plots = plots.unwrap_or(default.as_slice());
    let mut comparisons = Vec::with_capacity(plots.len());
    for (x, y) in plots {
        let mut refdata = Expression::Number(0.0);
        if !y.is_formation() {
            for (subl, ratio) in configuration.iter().zip(subl_ratios) {
                let species = &subl[0];
                if species == "VA" {
                    continue;
                }
                let reference = refstate
                    .get(species)
                    .ok_or_else(|| {
                        CalphadError::SymbolNotFound(format!("reference state of {}", species))
                    })?;
                refdata = refdata + Expression::Number(*ratio) * y.transform(reference)?;
            }
        }
        let desired_data = get_data(&comps, phase_name, &configuration, datasets, y.as_str());
        comparisons.push(compare_data_to_parameters(&desired_data, parameters, x, *y, &refdata)?);
    }
    Ok(comparisons)
}
