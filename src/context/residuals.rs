//! Built-in residual functions.

use super::registry::{register_residual_function, ResidualFunction, ResidualInputs};
use crate::database::{Database, DatabaseParameter};
use crate::datasets::{get_data, Dataset};
use crate::error::{CalphadError, Result};
use crate::paramselect::matrix::{filtered_temperatures, response_vector};
use crate::paramselect::Property;
use crate::symbolic::{Expression, TEMPERATURE};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use tracing::debug;

/// Registry name of [`FormationPropertyResidual`]
pub const FORMATION_PROPERTY_RESIDUAL: &str = "formation_property";

/// Observations at or above this temperature (K) are compared
const MIN_TEMPERATURE: f64 = 298.15;

/// Default standard deviation of each property, before weighting
pub fn default_property_std(property: Property) -> f64 {
    match property {
        Property::CpmForm | Property::Cpm => 0.2,
        Property::SmForm | Property::Sm => 0.2,
        Property::HmForm | Property::Hm => 500.0,
    }
}

/// Weight key of a property: its name without the `_FORM` suffix
fn weight_key(property: Property) -> &'static str {
    let name = property.as_str();
    name.strip_suffix("_FORM").unwrap_or(name)
}

/// Predictions of one dataset record
#[derive(Debug, Clone)]
struct ResidualTerm {
    property: Property,
    /// Property of formation per mole of atoms, in terms of `T` and the fit symbols
    expression: Expression,
    temperatures: Vec<f64>,
    values: Vec<f64>,
    std: f64,
    weight: f64,
}

/// Compares end-member formation heat capacity, entropy and enthalpy data
/// with the end-member `G` parameters of the database.
///
/// Each parameter expression has every symbol that is not being fitted
/// expanded. The lattice-stability references `GHSER<species>` are removed
/// per site when the database defines them, and the result is normalized per
/// mole of atoms (vacancies carry no atoms). Residuals are `data - model`;
/// the likelihood is Gaussian with the per-property standard deviation
/// divided by the property's data weight.
#[derive(Debug, Clone)]
pub struct FormationPropertyResidual {
    symbols_to_fit: Vec<String>,
    terms: Vec<ResidualTerm>,
}

impl FormationPropertyResidual {
    pub fn new(inputs: &ResidualInputs<'_>) -> Result<Self> {
        let dbf = inputs.database;
        let fit: BTreeSet<&str> = inputs.symbols_to_fit.iter().map(String::as_str).collect();
        let others: BTreeMap<String, Expression> = dbf
            .symbols()
            .iter()
            .filter(|(name, _)| !fit.contains(name.as_str()))
            .map(|(name, expr)| (name.clone(), expr.clone()))
            .collect();

        let mut terms = Vec::new();
        for param in dbf.search_parameters(|p| p.parameter_type == "G" && p.is_endmember()) {
            let Some(gibbs) = formation_gibbs_energy(dbf, param, &others)? else {
                continue;
            };

            let configuration = param.constituent_array.clone();
            let comps: Vec<String> = param
                .species()
                .map(|s| s.to_uppercase())
                .collect::<BTreeSet<String>>()
                .into_iter()
                .collect();

            for property in Property::FORMATION {
                let records = get_data(
                    &comps,
                    &param.phase_name,
                    &configuration,
                    inputs.datasets,
                    property.as_str(),
                );
                if records.is_empty() {
                    continue;
                }
                let expression = property.transform(&gibbs)?;
                let weight = inputs
                    .data_weights
                    .get(weight_key(property))
                    .copied()
                    .unwrap_or(1.0);
                for record in records {
                    terms.push(residual_term(record, property, expression.clone(), weight)?);
                }
            }
        }
        debug!(
            terms = terms.len(),
            "{} built from end-member parameters", FORMATION_PROPERTY_RESIDUAL
        );

        Ok(Self {
            symbols_to_fit: inputs.symbols_to_fit.to_vec(),
            terms,
        })
    }

    /// Number of compared observations
    pub fn num_observations(&self) -> usize {
        self.terms.iter().map(|t| t.values.len()).sum()
    }

    fn context(&self, parameters: &[f64]) -> Result<BTreeMap<String, f64>> {
        if parameters.len() != self.symbols_to_fit.len() {
            return Err(CalphadError::DimensionMismatch(format!(
                "{} parameters for {} fitted symbols",
                parameters.len(),
                self.symbols_to_fit.len()
            )));
        }
        Ok(self
            .symbols_to_fit
            .iter()
            .cloned()
            .zip(parameters.iter().copied())
            .collect())
    }

    fn for_each_residual<F>(&self, parameters: &[f64], mut visit: F) -> Result<()>
    where
        F: FnMut(&ResidualTerm, f64),
    {
        let mut ctx = self.context(parameters)?;
        for term in &self.terms {
            for (&t, &value) in term.temperatures.iter().zip(&term.values) {
                ctx.insert(TEMPERATURE.to_string(), t);
                let predicted = term.expression.evaluate(&ctx).map_err(|e| CalphadError::Residual {
                    name: FORMATION_PROPERTY_RESIDUAL.to_string(),
                    message: format!("{} at T={}: {}", term.property, t, e),
                })?;
                visit(term, value - predicted);
            }
        }
        Ok(())
    }
}

/// Gibbs energy of formation per mole of atoms, or `None` for parameters of
/// pure vacancies
fn formation_gibbs_energy(
    dbf: &Database,
    param: &DatabaseParameter,
    others: &BTreeMap<String, Expression>,
) -> Result<Option<Expression>> {
    let ratios = match dbf.phase(&param.phase_name) {
        Some(phase) if phase.sublattice_site_ratios.len() == param.constituent_array.len() => {
            phase.sublattice_site_ratios.clone()
        }
        _ => vec![1.0; param.constituent_array.len()],
    };

    let mut gibbs = param.parameter.expand(others)?;
    let mut atoms = 0.0;
    for (subl, ratio) in param.constituent_array.iter().zip(&ratios) {
        let species = subl[0].to_uppercase();
        if species == "VA" {
            continue;
        }
        atoms += ratio;
        if let Some(reference) = others.get(&format!("GHSER{}", species)) {
            gibbs = gibbs - Expression::Number(*ratio) * reference.expand(others)?;
        }
    }
    if atoms == 0.0 {
        return Ok(None);
    }
    Ok(Some((gibbs / Expression::Number(atoms)).simplify()))
}

fn residual_term(
    record: &Dataset,
    property: Property,
    expression: Expression,
    weight: f64,
) -> Result<ResidualTerm> {
    let temperatures = filtered_temperatures(&[record], MIN_TEMPERATURE);
    let values = response_vector(&[record], temperatures.len(), MIN_TEMPERATURE)?;
    Ok(ResidualTerm {
        property,
        expression,
        temperatures: temperatures.to_vec(),
        values: values.to_vec(),
        std: default_property_std(property),
        weight,
    })
}

impl ResidualFunction for FormationPropertyResidual {
    fn name(&self) -> &str {
        FORMATION_PROPERTY_RESIDUAL
    }

    fn residuals(&self, parameters: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut residuals = Vec::with_capacity(self.num_observations());
        let mut weights = Vec::with_capacity(self.num_observations());
        self.for_each_residual(parameters, |term, r| {
            residuals.push(r);
            weights.push(term.weight);
        })?;
        Ok((residuals, weights))
    }

    fn likelihood(&self, parameters: &[f64]) -> Result<f64> {
        let mut total = 0.0;
        self.for_each_residual(parameters, |term, r| {
            let sigma = term.std / term.weight;
            total += -0.5 * (2.0 * PI * sigma * sigma).ln() - r * r / (2.0 * sigma * sigma);
        })?;
        Ok(total)
    }
}

/// Register the built-in residual functions in the global registry.
///
/// Calling this more than once has no further effect.
pub fn register_builtin_residual_functions() {
    register_residual_function(FORMATION_PROPERTY_RESIDUAL, |inputs| {
        Ok(Box::new(FormationPropertyResidual::new(inputs)?) as Box<dyn ResidualFunction>)
    });
}
