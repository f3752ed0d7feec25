//! # Automated parameter selection
//!
//! Fits polynomial-in-temperature Gibbs energy coefficients for one sublattice
//! configuration of a phase from heat capacity, entropy and enthalpy of
//! formation data.
//!
//! Each candidate feature is a Gibbs energy term such as `T*ln(T)` or `T^2`.
//! The feature is mapped to its contribution to the measured property
//! ([`Property::transform`]), evaluated at every observed temperature at or
//! above 298.15 K, and the resulting design matrix is handed to an incremental
//! selector. The selector fits models over growing prefixes of the feature
//! list and keeps the one with the lowest AIC, so the order of a feature set
//! matters.
//!
//! Properties are fitted in sequence. Heat capacity comes first; entropy is
//! fitted after subtracting the entropy implied by the heat capacity terms;
//! enthalpy after subtracting the enthalpy implied by both.
//!
//! ```rust
//! use calphad_paramselect::paramselect::{FeatureSets, Property};
//!
//! let sets = FeatureSets::default();
//! assert_eq!(sets.get(Property::CpmForm).unwrap().len(), 4);
//! ```

pub mod compare;
pub mod features;
pub mod formation;
pub mod matrix;
pub mod selection;

pub use compare::{
    compare_data_to_parameters, default_plots, parameter_comparisons, DataSeries,
    ParameterComparison,
};
pub use features::{axis_label, FeatureSets, Property};
pub use formation::{available_properties, fit_formation_energy, fit_formation_energy_with};
pub use matrix::{build_feature_matrix, fixed_portion, response_vector, FeatureMatrix};
pub use selection::{
    fit_parameters, select_model, ModelScore, ParameterMapping, Selection, SelectionConfig,
};
