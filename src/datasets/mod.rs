//! # Datasets
//!
//! Experimental or computed property data, one JSON document per dataset:
//!
//! ```json
//! {
//!   "components": ["CU", "MG"], "phases": ["CUMG2"], "output": "CPM_FORM",
//!   "solver": {"mode": "manual", "sublattice_site_ratios": [1, 2],
//!              "sublattice_configurations": [["CU", "MG"]]},
//!   "conditions": {"P": 101325, "T": [300, 400, 500]},
//!   "values": [[[-0.5]], [[-0.4]], [[-0.3]]],
//!   "reference": "DFT phonons"
//! }
//! ```
//!
//! Value and condition arrays may be nested to any depth; they are flattened
//! in row-major order on load. Component and phase names are upper-cased and
//! components sorted on insertion so that queries can compare them exactly.

pub mod query;

pub use query::{get_data, symmetry_filter, DatasetQuery};

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Occupation of one sublattice: a single species or a mixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SublatticeEntry {
    Species(String),
    Mixing(Vec<String>),
}

impl SublatticeEntry {
    /// The occupying species as a list; single species become singleton lists
    pub fn to_species_list(&self) -> Vec<String> {
        match self {
            SublatticeEntry::Species(s) => vec![s.to_uppercase()],
            SublatticeEntry::Mixing(list) => list.iter().map(|s| s.to_uppercase()).collect(),
        }
    }
}

impl From<&str> for SublatticeEntry {
    fn from(value: &str) -> Self {
        SublatticeEntry::Species(value.to_string())
    }
}

impl From<Vec<&str>> for SublatticeEntry {
    fn from(value: Vec<&str>) -> Self {
        SublatticeEntry::Mixing(value.into_iter().map(String::from).collect())
    }
}

/// Wrap single-species sublattices as singleton lists
pub fn normalize_configuration(configuration: &[SublatticeEntry]) -> Vec<Vec<String>> {
    configuration
        .iter()
        .map(SublatticeEntry::to_species_list)
        .collect()
}

fn default_mode() -> String {
    "manual".to_string()
}

/// How a dataset's configurations were specified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solver {
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub sublattice_site_ratios: Vec<f64>,

    #[serde(alias = "sublattice_configuration")]
    pub sublattice_configurations: Vec<Vec<SublatticeEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublattice_occupancies: Option<serde_json::Value>,
}

/// A single immutable dataset record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub components: Vec<String>,
    pub phases: Vec<String>,
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<Solver>,

    #[serde(default, deserialize_with = "deserialize_conditions")]
    pub conditions: BTreeMap<String, Vec<f64>>,

    #[serde(deserialize_with = "deserialize_flat")]
    pub values: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Dataset {
    /// Temperature condition values, empty if the dataset has none
    pub fn temperatures(&self) -> &[f64] {
        self.conditions.get("T").map(Vec::as_slice).unwrap_or(&[])
    }

    fn normalize(mut self) -> Self {
        self.components = self.components.iter().map(|c| c.to_uppercase()).collect();
        self.components.sort();
        self.phases = self.phases.iter().map(|p| p.to_uppercase()).collect();
        self.output = self.output.to_uppercase();
        self
    }
}

fn flatten_into(value: &serde_json::Value, out: &mut Vec<f64>) -> std::result::Result<(), String> {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_into(item, out)?;
            }
            Ok(())
        }
        serde_json::Value::Number(n) => {
            out.push(n.as_f64().ok_or_else(|| format!("non-finite number {}", n))?);
            Ok(())
        }
        other => Err(format!("expected a number or array of numbers, got {}", other)),
    }
}

fn deserialize_flat<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<f64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let mut out = Vec::new();
    flatten_into(&value, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn deserialize_conditions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Vec<f64>>, D::Error> {
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let mut out = Vec::new();
            flatten_into(&value, &mut out)
                .map_err(|e| serde::de::Error::custom(format!("condition {}: {}", key, e)))?;
            Ok((key, out))
        })
        .collect()
}

/// In-memory dataset store
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    records: Vec<Dataset>,
}

impl Datasets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; component and phase names are normalized.
    pub fn insert(&mut self, dataset: Dataset) {
        self.records.push(dataset.normalize());
    }

    /// Parse and add one JSON document
    pub fn insert_json(&mut self, json: &str) -> Result<()> {
        let dataset: Dataset = serde_json::from_str(json)?;
        self.insert(dataset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.records.iter()
    }

    /// Records matching `query`, in insertion order
    pub fn search(&self, query: &DatasetQuery) -> Vec<&Dataset> {
        self.records.iter().filter(|d| query.matches(d)).collect()
    }
}

impl FromIterator<Dataset> for Datasets {
    fn from_iter<I: IntoIterator<Item = Dataset>>(iter: I) -> Self {
        let mut datasets = Datasets::new();
        for d in iter {
            datasets.insert(d);
        }
        datasets
    }
}

/// Load one dataset per JSON file
pub fn load_datasets<P: AsRef<Path>>(paths: &[P]) -> Result<Datasets> {
    let mut datasets = Datasets::new();
    for path in paths {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        datasets.insert_json(&contents)?;
    }
    Ok(datasets)
}
