//! # Error context assembly
//!
//! Prepares everything a likelihood-based calibration loop needs: an
//! exclusively owned copy of the database reduced to the system of interest,
//! the sorted list of symbols to fit, and one residual function per registered
//! factory.
//!
//! ```rust
//! use calphad_paramselect::context::{
//!     register_builtin_residual_functions, setup_context, ContextOptions,
//! };
//! use calphad_paramselect::database::Database;
//! use calphad_paramselect::datasets::Datasets;
//!
//! register_builtin_residual_functions();
//!
//! let dbf = Database::from_json(r#"{
//!   "elements": ["AL"],
//!   "parameters": [{"phase_name": "FCC_A1", "parameter_type": "G",
//!                   "constituent_array": [["AL"]], "parameter": "VV0000 + VV0001*T"}],
//!   "symbols": {"VV0000": "0", "VV0001": "0"}
//! }"#).unwrap();
//!
//! let ctx = setup_context(&dbf, &Datasets::new(), ContextOptions::default()).unwrap();
//! assert_eq!(ctx.symbols_to_fit(), &["VV0000", "VV0001"]);
//! ```

pub mod phase_models;
pub mod registry;
pub mod residuals;

pub use phase_models::{PhaseModel, PhaseModelSpecification};
pub use registry::{
    register_residual_function, RegisteredResidual, ResidualFactory, ResidualFunction,
    ResidualInputs, ResidualRegistry,
};
pub use residuals::{
    default_property_std, register_builtin_residual_functions, FormationPropertyResidual,
    FORMATION_PROPERTY_RESIDUAL,
};

use crate::database::{Database, WorkingDatabase};
use crate::datasets::Datasets;
use crate::error::{CalphadError, Result};
use crate::symbolic::SymbolPattern;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, trace};

/// Options of [`setup_context`]
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Symbols to fit; discovered with `symbol_pattern` when `None`
    pub symbols_to_fit: Option<Vec<String>>,
    /// Per-property data weights passed to the residual functions
    pub data_weights: BTreeMap<String, f64>,
    /// Phase model configuration mapping; its components scope the reduction
    pub phase_models: Option<serde_json::Value>,
    /// Extra arguments passed through to the residual functions
    pub additional_args: BTreeMap<String, serde_json::Value>,
    /// Naming convention of fittable symbols
    pub symbol_pattern: SymbolPattern,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols_to_fit<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols_to_fit = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    pub fn data_weight(mut self, property: &str, weight: f64) -> Self {
        self.data_weights.insert(property.to_string(), weight);
        self
    }

    pub fn phase_models(mut self, phase_models: serde_json::Value) -> Self {
        self.phase_models = Some(phase_models);
        self
    }

    pub fn additional_arg(mut self, key: &str, value: serde_json::Value) -> Self {
        self.additional_args.insert(key.to_string(), value);
        self
    }

    pub fn symbol_pattern(mut self, pattern: SymbolPattern) -> Self {
        self.symbol_pattern = pattern;
        self
    }
}

/// Calibration-ready bundle produced by [`setup_context`].
///
/// Immutable once built. The database is the reduced copy; to commit fitted
/// values back, update the caller's database symbols explicitly.
#[derive(Debug)]
pub struct ErrorContext {
    symbols_to_fit: Vec<String>,
    residual_objs: Vec<Box<dyn ResidualFunction>>,
    database: Database,
    phase_models: Option<PhaseModelSpecification>,
}

impl ErrorContext {
    /// Sorted names of the fitted symbols; parameter vectors follow this order
    pub fn symbols_to_fit(&self) -> &[String] {
        &self.symbols_to_fit
    }

    /// Residual functions in registration order
    pub fn residual_objs(&self) -> &[Box<dyn ResidualFunction>] {
        &self.residual_objs
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn phase_models(&self) -> Option<&PhaseModelSpecification> {
        self.phase_models.as_ref()
    }

    /// Total log-likelihood of `parameters` over all residual functions
    pub fn likelihood(&self, parameters: &[f64]) -> Result<f64> {
        self.residual_objs
            .iter()
            .map(|r| r.likelihood(parameters))
            .sum()
    }
}

/// Assemble an [`ErrorContext`] using the global residual registry.
///
/// See [`setup_context_with_registry`].
pub fn setup_context(
    dbf: &Database,
    datasets: &Datasets,
    options: ContextOptions,
) -> Result<ErrorContext> {
    setup_context_with_registry(dbf, datasets, options, ResidualRegistry::global())
}

/// Assemble an [`ErrorContext`] against `registry`.
///
/// 1. `dbf` is copied; the caller's database is never modified.
/// 2. If phase models are given they are validated and the copy is reduced to
///    their components.
/// 3. The symbols to fit are the sorted explicit list, or every symbol of the
///    reduced copy matching `options.symbol_pattern`.
/// 4. Piecewise fit symbols are replaced by their first branch.
/// 5. Every registered factory is instantiated, in registration order.
///
/// # Errors
///
/// * `CalphadError::InvalidPhaseModel` if the phase models fail validation
/// * `CalphadError::Configuration` if there are no symbols to fit
/// * `CalphadError::SymbolNotFound` if an explicit symbol is not defined
/// * any error raised by a residual factory
pub fn setup_context_with_registry(
    dbf: &Database,
    datasets: &Datasets,
    options: ContextOptions,
    registry: &ResidualRegistry,
) -> Result<ErrorContext> {
    let phase_models = options
        .phase_models
        .map(PhaseModelSpecification::from_value)
        .transpose()?;

    let mut working = WorkingDatabase::copy_of(dbf);
    let reduced_comps = phase_models.as_ref().map(|pm| pm.components());
    let summary = working.reduce(reduced_comps);
    info!(
        "Reduced database from {} to {} parameters",
        summary.parameters_before, summary.parameters_after
    );

    let symbols_to_fit = match options.symbols_to_fit {
        Some(mut symbols) => {
            symbols.sort();
            symbols.dedup();
            symbols
        }
        None => working.database().symbols_to_fit(&options.symbol_pattern),
    };
    if symbols_to_fit.is_empty() {
        return Err(CalphadError::Configuration(
            "No degrees of freedom. Database must contain symbols starting with 'V' or 'VV', followed by a number."
                .to_string(),
        ));
    }
    info!("Fitting {} degrees of freedom.", symbols_to_fit.len());

    working.collapse_piecewise(&symbols_to_fit)?;
    let database = working.into_database();

    let inputs = ResidualInputs {
        database: &database,
        datasets,
        phase_models: phase_models.as_ref(),
        symbols_to_fit: &symbols_to_fit,
        data_weights: &options.data_weights,
        additional_args: &options.additional_args,
    };
    let mut residual_objs = Vec::new();
    for entry in registry.registered() {
        trace!("Getting residual object for {}", entry.name);
        let start = Instant::now();
        residual_objs.push((entry.factory)(&inputs)?);
        trace!(
            "Finished getting residual object for {} in {:.2} s",
            entry.name,
            start.elapsed().as_secs_f64()
        );
    }

    Ok(ErrorContext {
        symbols_to_fit,
        residual_objs,
        database,
        phase_models,
    })
}
