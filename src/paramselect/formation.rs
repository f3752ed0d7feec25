//! Sequential fitting of formation properties for one sublattice configuration.

use super::features::{FeatureSets, Property};
use super::matrix::{build_feature_matrix, fixed_portion, response_vector};
use super::selection::{fit_parameters, ParameterMapping, SelectionConfig};
use crate::datasets::{get_data, normalize_configuration, Datasets, SublatticeEntry};
use crate::error::{CalphadError, Result};
use tracing::{debug, info};

/// Fit the default formation feature sets for `configuration` of `phase_name`.
///
/// Heat capacity is fitted first, then entropy with the heat capacity
/// contribution subtracted, then enthalpy with both earlier contributions
/// subtracted. See [`fit_formation_energy_with`].
///
/// # Examples
///
/// ```rust,no_run
/// use calphad_paramselect::datasets::load_datasets;
/// use calphad_paramselect::paramselect::fit_formation_energy;
///
/// let datasets = load_datasets(&["cpm.json", "sm.json", "hm.json"]).unwrap();
/// let parameters = fit_formation_energy(
///     &["CU", "MG"],
///     "CUMG2",
///     &["CU".into(), "MG".into()],
///     &datasets,
/// )
/// .unwrap();
/// for (feature, value) in parameters.iter() {
///     println!("{} = {}", feature, value);
/// }
/// ```
pub fn fit_formation_energy<S: AsRef<str>>(
    comps: &[S],
    phase_name: &str,
    configuration: &[SublatticeEntry],
    datasets: &Datasets,
) -> Result<ParameterMapping> {
    fit_formation_energy_with(
        comps,
        phase_name,
        configuration,
        datasets,
        &FeatureSets::default(),
        &SelectionConfig::default(),
    )
}

/// Fit each property of `features` in order.
///
/// For every property the matching datasets are queried, the contribution of
/// all previously fitted features (under this property's transform) is
/// subtracted from the data, and the remaining response is passed to the
/// incremental selector. The returned mapping merges all properties in order.
///
/// # Errors
///
/// * `CalphadError::NoData` if no dataset matches one of the properties
/// * any error of the feature matrix builder or the selector
pub fn fit_formation_energy_with<S: AsRef<str>>(
    comps: &[S],
    phase_name: &str,
    configuration: &[SublatticeEntry],
    datasets: &Datasets,
    features: &FeatureSets,
    config: &SelectionConfig,
) -> Result<ParameterMapping> {
    let configuration = normalize_configuration(configuration);
    let mut comps: Vec<String> = comps.iter().map(|c| c.as_ref().to_uppercase()).collect();
    comps.sort();

    let mut parameters = ParameterMapping::new();
    for (property, candidates) in features.iter() {
        let desired_data =
            get_data(&comps, phase_name, &configuration, datasets, property.as_str());
        if desired_data.is_empty() {
            return Err(CalphadError::NoData {
                property: property.to_string(),
                phase: phase_name.to_string(),
                components: comps,
            });
        }
        debug!(
            property = %property,
            records = desired_data.len(),
            "fitting {:?}",
            configuration
        );

        let fm = build_feature_matrix(property, candidates, &desired_data, config.min_temperature)?;
        let data_quantities = response_vector(&desired_data, fm.nrows(), config.min_temperature)?;
        let fixed = fixed_portion(property, &parameters, &fm.temperatures)?;

        let fitted =
            fit_parameters(fm.matrix.view(), &(data_quantities - fixed), candidates, config)?;
        parameters.merge(fitted);
    }

    info!(
        phase = phase_name,
        parameters = parameters.len(),
        "fitted formation energy for {:?}",
        configuration
    );
    Ok(parameters)
}

/// Property datasets present for a configuration, in the order of `features`
pub fn available_properties<S: AsRef<str>>(
    comps: &[S],
    phase_name: &str,
    configuration: &[SublatticeEntry],
    datasets: &Datasets,
    features: &FeatureSets,
) -> Vec<Property> {
    let configuration = normalize_configuration(configuration);
    features
        .iter()
        .map(|(p, _)| p)
        .filter(|p| !get_data(comps, phase_name, &configuration, datasets, p.as_str()).is_empty())
        .collect()
}
