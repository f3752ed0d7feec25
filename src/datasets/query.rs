//! Predicate queries over a [`Datasets`] store.

use super::{normalize_configuration, Dataset, Datasets, SublatticeEntry};

/// Builder for dataset lookups.
///
/// Every criterion left unset matches all records. Component and phase lists
/// are compared exactly after upper-casing; components are sorted first.
///
/// # Examples
///
/// ```rust
/// use calphad_paramselect::datasets::{DatasetQuery, Datasets};
///
/// let datasets = Datasets::new();
/// let query = DatasetQuery::new()
///     .output("CPM_FORM")
///     .components(&["MG", "CU"])
///     .phases(&["CUMG2"]);
/// assert!(datasets.search(&query).is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetQuery {
    output: Option<String>,
    components: Option<Vec<String>>,
    phases: Option<Vec<String>>,
    configuration: Option<Vec<Vec<String>>>,
}

impl DatasetQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, output: &str) -> Self {
        self.output = Some(output.to_uppercase());
        self
    }

    pub fn components<S: AsRef<str>>(mut self, components: &[S]) -> Self {
        let mut comps: Vec<String> = components
            .iter()
            .map(|c| c.as_ref().to_uppercase())
            .collect();
        comps.sort();
        self.components = Some(comps);
        self
    }

    pub fn phases<S: AsRef<str>>(mut self, phases: &[S]) -> Self {
        self.phases = Some(phases.iter().map(|p| p.as_ref().to_uppercase()).collect());
        self
    }

    /// Only records whose solver passes [`symmetry_filter`] for `configuration`
    pub fn configuration(mut self, configuration: Vec<Vec<String>>) -> Self {
        let normalized = configuration
            .into_iter()
            .map(|subl| subl.into_iter().map(|s| s.to_uppercase()).collect())
            .collect();
        self.configuration = Some(normalized);
        self
    }

    pub(crate) fn matches(&self, dataset: &Dataset) -> bool {
        if let Some(output) = &self.output {
            if &dataset.output != output {
                return false;
            }
        }
        if let Some(components) = &self.components {
            if &dataset.components != components {
                return false;
            }
        }
        if let Some(phases) = &self.phases {
            if &dataset.phases != phases {
                return false;
            }
        }
        match &self.configuration {
            Some(configuration) => symmetry_filter(dataset, configuration),
            None => true,
        }
    }
}

fn sorted(mut list: Vec<String>) -> Vec<String> {
    list.sort();
    list
}

/// Whether one data sublattice entry is compatible with a target sublattice.
///
/// Mixtures match when they hold the same species in any order. A single
/// species in the data matches any target sublattice that contains it.
fn sublattice_matches(data: &SublatticeEntry, target: &[String]) -> bool {
    match data {
        SublatticeEntry::Species(s) => {
            let s = s.to_uppercase();
            target.iter().any(|t| *t == s)
        }
        SublatticeEntry::Mixing(_) => {
            sorted(data.to_species_list()) == sorted(target.to_vec())
        }
    }
}

/// Whether a dataset holds data for `configuration`.
///
/// Only manually specified solvers qualify, and the sublattice count must
/// agree. A data configuration qualifies if it equals `configuration` or if
/// every sublattice matches entry by entry.
pub fn symmetry_filter(dataset: &Dataset, configuration: &[Vec<String>]) -> bool {
    let solver = match &dataset.solver {
        Some(solver) => solver,
        None => return false,
    };
    if solver.mode != "manual" {
        return false;
    }
    let first = match solver.sublattice_configurations.first() {
        Some(first) => first,
        None => return false,
    };
    if first.len() != configuration.len() {
        return false;
    }

    solver.sublattice_configurations.iter().any(|data_config| {
        if data_config.len() != configuration.len() {
            return false;
        }
        if normalize_configuration(data_config) == configuration {
            return true;
        }
        data_config
            .iter()
            .zip(configuration)
            .all(|(entry, target)| sublattice_matches(entry, target))
    })
}

/// Records of property `prop` for `phase_name` and `configuration` in the
/// system made of `comps`, in store order.
pub fn get_data<'a, S: AsRef<str>>(
    comps: &[S],
    phase_name: &str,
    configuration: &[Vec<String>],
    datasets: &'a Datasets,
    prop: &str,
) -> Vec<&'a Dataset> {
    let query = DatasetQuery::new()
        .output(prop)
        .components(comps)
        .phases(&[phase_name])
        .configuration(configuration.to_vec());
    datasets.search(&query)
}
