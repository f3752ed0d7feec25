//! Residual functions and the registry of their factories.
//!
//! A residual function compares model predictions for a trial parameter vector
//! against one kind of data. Implementations are registered as factories;
//! context assembly instantiates every registered factory, in registration
//! order, against the reduced database and the datasets.

use super::phase_models::PhaseModelSpecification;
use crate::database::Database;
use crate::datasets::Datasets;
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

/// Everything a residual factory may use to build its residual function
#[derive(Debug, Clone, Copy)]
pub struct ResidualInputs<'a> {
    pub database: &'a Database,
    pub datasets: &'a Datasets,
    pub phase_models: Option<&'a PhaseModelSpecification>,
    /// Sorted names of the symbols being fitted; parameter vectors follow this order
    pub symbols_to_fit: &'a [String],
    /// Per-property weights, e.g. `{"HM": 0.5}`
    pub data_weights: &'a BTreeMap<String, f64>,
    pub additional_args: &'a BTreeMap<String, serde_json::Value>,
}

/// A residual computation for the calibration loop.
///
/// `parameters` holds one value per fitted symbol, in the order of
/// [`ResidualInputs::symbols_to_fit`].
pub trait ResidualFunction: Send + Sync + fmt::Debug {
    /// Registry name of the implementation
    fn name(&self) -> &str;

    /// Residuals and their weights
    fn residuals(&self, parameters: &[f64]) -> Result<(Vec<f64>, Vec<f64>)>;

    /// Log-likelihood of the data
    fn likelihood(&self, parameters: &[f64]) -> Result<f64>;
}

/// Constructor of a residual function
pub type ResidualFactory =
    Arc<dyn Fn(&ResidualInputs<'_>) -> Result<Box<dyn ResidualFunction>> + Send + Sync>;

/// A named factory
#[derive(Clone)]
pub struct RegisteredResidual {
    pub name: String,
    pub factory: ResidualFactory,
}

impl fmt::Debug for RegisteredResidual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredResidual")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Append-only, ordered collection of residual factories.
///
/// Safe to register into and read from concurrently.
#[derive(Debug, Default)]
pub struct ResidualRegistry {
    entries: RwLock<Vec<RegisteredResidual>>,
}

impl ResidualRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`setup_context`](super::setup_context)
    pub fn global() -> &'static ResidualRegistry {
        static GLOBAL: OnceLock<ResidualRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ResidualRegistry::new)
    }

    /// Append a factory. Returns `false` and leaves the registry unchanged
    /// if `name` is already registered.
    pub fn register<F>(&self, name: &str, factory: F) -> bool
    where
        F: Fn(&ResidualInputs<'_>) -> Result<Box<dyn ResidualFunction>> + Send + Sync + 'static,
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|e| e.name == name) {
            debug!("Residual function {} already registered", name);
            return false;
        }
        entries.push(RegisteredResidual {
            name: name.to_string(),
            factory: Arc::new(factory),
        });
        true
    }

    /// Snapshot of the registered factories in registration order
    pub fn registered(&self) -> Vec<RegisteredResidual> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.registered().into_iter().map(|e| e.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register a factory in the global registry
pub fn register_residual_function<F>(name: &str, factory: F) -> bool
where
    F: Fn(&ResidualInputs<'_>) -> Result<Box<dyn ResidualFunction>> + Send + Sync + 'static,
{
    ResidualRegistry::global().register(name, factory)
}
