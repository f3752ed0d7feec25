//! # calphad-paramselect
//!
//! `calphad-paramselect` selects polynomial-in-temperature parameters for
//! CALPHAD energy models from thermochemical data, and assembles the error
//! context used to calibrate those parameters against data.
//!
//! The library provides:
//! - An incremental least-squares model selector scored by AIC
//! - Sequential fitting of heat capacity, entropy and enthalpy of formation
//! - Reduction of a parameter database to a chemical subsystem
//! - Context assembly with pluggable residual functions
//!
//! ## Basic Usage
//!
//! ```
//! use calphad_paramselect::datasets::Datasets;
//! use calphad_paramselect::paramselect::fit_formation_energy;
//!
//! let mut datasets = Datasets::new();
//! for (output, values) in [
//!     ("CPM_FORM", "[-3, -3, -3, -3, -3]"),
//!     ("SM_FORM", "[1, 1, 1, 1, 1]"),
//!     ("HM_FORM", "[-5000, -5000, -5000, -5000, -5000]"),
//! ] {
//!     let json = format!(
//!         r#"{{"components": ["CU", "MG"], "phases": ["CUMG2"], "output": "{}",
//!             "solver": {{"mode": "manual", "sublattice_site_ratios": [1, 2],
//!                         "sublattice_configurations": [["CU", "MG"]]}},
//!             "conditions": {{"T": [300, 400, 500, 600, 700]}}, "values": {}}}"#,
//!         output, values
//!     );
//!     datasets.insert_json(&json).unwrap();
//! }
//!
//! let parameters =
//!     fit_formation_energy(&["CU", "MG"], "CUMG2", &["CU".into(), "MG".into()], &datasets)
//!         .unwrap();
//! assert_eq!(parameters.len(), 6);
//! ```

// Public modules
pub mod error;

// Symbolic expressions
pub mod symbolic;

// Data sources
pub mod database;
pub mod datasets;

// Fitting
pub mod paramselect;
pub mod utils;

// Calibration context
pub mod context;

// Re-exports for convenience
pub use context::{setup_context, ContextOptions, ErrorContext, ResidualFunction};
pub use database::Database;
pub use datasets::{load_datasets, Dataset, Datasets};
pub use error::{CalphadError, Result};
pub use paramselect::{fit_formation_energy, ParameterMapping, Property};
pub use symbolic::Expression;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
