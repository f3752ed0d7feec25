//! Phase model specification: the components of the system and the sublattice
//! model of each phase to be calibrated.

use crate::error::{CalphadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sublattice model of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseModel {
    /// Species allowed on each sublattice
    pub sublattice_model: Vec<Vec<String>>,
    pub sublattice_site_ratios: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// Parsed and validated phase model configuration.
///
/// ```json
/// {
///   "components": ["CU", "MG", "VA"],
///   "phases": {
///     "LIQUID": {"sublattice_model": [["CU", "MG"]], "sublattice_site_ratios": [1]},
///     "CUMG2": {"sublattice_model": [["CU"], ["MG"]], "sublattice_site_ratios": [1, 2]}
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseModelSpecification {
    pub components: Vec<String>,
    #[serde(default)]
    pub phases: BTreeMap<String, PhaseModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refdata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_model: Option<String>,
}

impl PhaseModelSpecification {
    /// Parse a configuration mapping and validate it.
    ///
    /// Component and species names are upper-cased.
    ///
    /// # Errors
    ///
    /// * `CalphadError::InvalidPhaseModel` if the mapping does not describe a
    ///   phase model or fails [`validate`](Self::validate)
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let spec: PhaseModelSpecification = serde_json::from_value(value)
            .map_err(|e| CalphadError::InvalidPhaseModel(e.to_string()))?;
        let spec = spec.normalized();
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a JSON document, see [`from_value`](Self::from_value)
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    fn normalized(mut self) -> Self {
        self.components = self.components.iter().map(|c| c.to_uppercase()).collect();
        for model in self.phases.values_mut() {
            for subl in model.sublattice_model.iter_mut() {
                for species in subl.iter_mut() {
                    *species = species.to_uppercase();
                }
            }
        }
        self
    }

    /// Check the specification for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            return Err(CalphadError::InvalidPhaseModel(
                "no components given".to_string(),
            ));
        }
        let components: BTreeSet<&str> = self.components.iter().map(String::as_str).collect();

        for (name, model) in &self.phases {
            if model.sublattice_model.len() != model.sublattice_site_ratios.len() {
                return Err(CalphadError::InvalidPhaseModel(format!(
                    "phase {} has {} sublattices but {} site ratios",
                    name,
                    model.sublattice_model.len(),
                    model.sublattice_site_ratios.len()
                )));
            }
            if model.sublattice_site_ratios.iter().any(|r| !(*r > 0.0)) {
                return Err(CalphadError::InvalidPhaseModel(format!(
                    "phase {} has a non-positive site ratio",
                    name
                )));
            }
            for subl in &model.sublattice_model {
                if subl.is_empty() {
                    return Err(CalphadError::InvalidPhaseModel(format!(
                        "phase {} has an empty sublattice",
                        name
                    )));
                }
                if let Some(species) = subl.iter().find(|s| !components.contains(s.as_str())) {
                    return Err(CalphadError::InvalidPhaseModel(format!(
                        "phase {} uses {} which is not a component",
                        name, species
                    )));
                }
            }
        }
        Ok(())
    }

    /// Components in the order given
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseModel> {
        self.phases.get(name)
    }
}
