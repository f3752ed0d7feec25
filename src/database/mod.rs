//! # Thermodynamic database
//!
//! A minimal in-memory representation of a CALPHAD parameter database: the
//! elements and species it knows, the phases with their sublattice models, the
//! parameters (`G`, `L`, ...) attached to sublattice configurations, and the
//! symbol table of named functions and free parameters.
//!
//! Databases are loaded from and saved to JSON. Parameter and symbol
//! expressions are stored as strings in the usual infix notation.
//!
//! ```rust
//! use calphad_paramselect::database::Database;
//!
//! let json = r#"{
//!   "elements": ["AL", "NI", "VA"],
//!   "parameters": [
//!     {"phase_name": "FCC_A1", "parameter_type": "G",
//!      "constituent_array": [["AL"], ["VA"]], "parameter": "GHSERAL + VV0001"}
//!   ],
//!   "symbols": {"GHSERAL": "-7976.15 + 137.09*T", "VV0001": "0"}
//! }"#;
//! let dbf = Database::from_json(json).unwrap();
//! assert_eq!(dbf.parameters().len(), 1);
//! ```

pub mod reduce;

pub use reduce::{not_subsystem, reduce_database, ReductionSummary, WorkingDatabase};

use crate::error::Result;
use crate::symbolic::{Expression, SymbolPattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A named species made of one or more elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// Element name to stoichiometric amount
    pub constituents: BTreeMap<String, f64>,
}

/// Sublattice model of a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub sublattice_site_ratios: Vec<f64>,
    pub constituents: Vec<Vec<String>>,
}

/// One parameter of the energy model, e.g. `G(FCC_A1,AL:VA;0)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseParameter {
    pub phase_name: String,
    pub parameter_type: String,
    /// Species occupying each sublattice
    pub constituent_array: Vec<Vec<String>>,
    #[serde(default)]
    pub parameter_order: u32,
    pub parameter: Expression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl DatabaseParameter {
    /// Whether every sublattice holds exactly one species
    pub fn is_endmember(&self) -> bool {
        self.constituent_array.iter().all(|subl| subl.len() == 1)
    }

    /// Every species named in the constituent array
    pub fn species(&self) -> impl Iterator<Item = &String> {
        self.constituent_array.iter().flatten()
    }
}

/// A thermodynamic parameter database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    elements: BTreeSet<String>,

    #[serde(default)]
    species: BTreeMap<String, Species>,

    #[serde(default)]
    phases: BTreeMap<String, Phase>,

    #[serde(default)]
    parameters: Vec<DatabaseParameter>,

    #[serde(default)]
    symbols: BTreeMap<String, Expression>,
}

impl Database {
    /// Create a new empty database
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &BTreeSet<String> {
        &self.elements
    }

    pub fn add_element(&mut self, name: &str) {
        self.elements.insert(name.to_uppercase());
    }

    pub fn add_species(&mut self, name: &str, species: Species) {
        self.species.insert(name.to_uppercase(), species);
    }

    pub fn phases(&self) -> &BTreeMap<String, Phase> {
        &self.phases
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.get(name)
    }

    pub fn add_phase(&mut self, name: &str, phase: Phase) {
        self.phases.insert(name.to_string(), phase);
    }

    pub fn parameters(&self) -> &[DatabaseParameter] {
        &self.parameters
    }

    pub fn add_parameter(&mut self, parameter: DatabaseParameter) {
        self.parameters.push(parameter);
    }

    /// Parameters matching a predicate, in insertion order
    pub fn search_parameters<F>(&self, predicate: F) -> Vec<&DatabaseParameter>
    where
        F: Fn(&DatabaseParameter) -> bool,
    {
        self.parameters.iter().filter(|p| predicate(p)).collect()
    }

    pub fn symbols(&self) -> &BTreeMap<String, Expression> {
        &self.symbols
    }

    pub fn symbol(&self, name: &str) -> Option<&Expression> {
        self.symbols.get(name)
    }

    /// Define or redefine a symbol
    pub fn set_symbol(&mut self, name: &str, value: Expression) {
        self.symbols.insert(name.to_string(), value);
    }

    /// Elements making up a species. Names without a species definition are
    /// treated as pure elements.
    pub fn species_elements(&self, species: &str) -> BTreeSet<String> {
        let key = species.to_uppercase();
        match self.species.get(&key) {
            Some(definition) => definition
                .constituents
                .keys()
                .map(|el| el.to_uppercase())
                .collect(),
            None => BTreeSet::from([key]),
        }
    }

    /// Names of the symbols matching `pattern`, sorted
    pub fn symbols_to_fit(&self, pattern: &SymbolPattern) -> Vec<String> {
        // BTreeMap keys are already ordered
        self.symbols
            .keys()
            .filter(|name| pattern.matches(name))
            .cloned()
            .collect()
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut Vec<DatabaseParameter> {
        &mut self.parameters
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut BTreeMap<String, Expression> {
        &mut self.symbols
    }

    /// Load a database from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Load a database from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let mut dbf: Database = serde_json::from_str(json)?;
        dbf.elements = dbf.elements.iter().map(|e| e.to_uppercase()).collect();
        Ok(dbf)
    }

    /// Save the database to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Serialize the database to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Names of the database symbols matching the fitting convention, sorted
pub fn database_symbols_to_fit(dbf: &Database, pattern: &SymbolPattern) -> Vec<String> {
    dbf.symbols_to_fit(pattern)
}
