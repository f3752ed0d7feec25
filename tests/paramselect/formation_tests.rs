//! Tests for sequential formation energy fitting

use approx::{assert_abs_diff_eq, assert_relative_eq};
use calphad_paramselect::datasets::{load_datasets, Datasets, SublatticeEntry};
use calphad_paramselect::error::CalphadError;
use calphad_paramselect::paramselect::{
    fit_formation_energy, fit_formation_energy_with, FeatureSets, Property, SelectionConfig,
};
use calphad_paramselect::symbolic::Expression;

use crate::test_helpers::{cumg2_record, formation_datasets, sample, temperature_grid};

fn cu_mg() -> Vec<SublatticeEntry> {
    vec!["CU".into(), "MG".into()]
}

fn coefficient(params: &calphad_paramselect::ParameterMapping, text: &str) -> f64 {
    params.get(&Expression::parse(text).unwrap().simplify()).unwrap()
}

#[test]
fn test_recovers_generating_coefficients() {
    let datasets = formation_datasets(-24.0, -0.003, 130.0, -8000.0, None);
    let params = fit_formation_energy(&["CU", "MG"], "CUMG2", &cu_mg(), &datasets).unwrap();

    assert_relative_eq!(coefficient(&params, "T*ln(T)"), -24.0, max_relative = 1e-8);
    assert_relative_eq!(coefficient(&params, "T^2"), -0.003, max_relative = 1e-6);
    assert_abs_diff_eq!(coefficient(&params, "T^-1"), 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(coefficient(&params, "T^3"), 0.0, epsilon = 1e-9);
    assert_relative_eq!(coefficient(&params, "T"), 130.0, max_relative = 1e-6);
    assert_relative_eq!(coefficient(&params, "1"), -8000.0, max_relative = 1e-6);
}

#[test]
fn test_merged_keys_are_unique() {
    let datasets = formation_datasets(-3.0, 0.0, 10.0, -100.0, None);
    let params = fit_formation_energy(&["MG", "CU"], "CUMG2", &cu_mg(), &datasets).unwrap();

    let keys: Vec<String> = params.features().map(|f| f.to_string()).collect();
    let expected: Vec<String> = ["T*ln(T)", "T^2", "T^-1", "T^3", "T", "1"]
        .iter()
        .map(|s| Expression::parse(s).unwrap().simplify().to_string())
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_noisy_data() {
    let datasets = formation_datasets(-24.0, -0.003, 130.0, -8000.0, Some((1e-4, 42)));
    let params = fit_formation_energy(&["CU", "MG"], "CUMG2", &cu_mg(), &datasets).unwrap();

    assert_abs_diff_eq!(coefficient(&params, "T*ln(T)"), -24.0, epsilon = 0.5);
    assert_abs_diff_eq!(coefficient(&params, "1"), -8000.0, epsilon = 50.0);
}

#[test]
fn test_custom_feature_order() {
    // G = 7 T - 2500: no heat capacity term at all
    let temps = temperature_grid();
    let datasets: Datasets = vec![
        cumg2_record("SM_FORM", &temps, &sample(&temps, |_| -7.0, None)),
        cumg2_record("HM_FORM", &temps, &sample(&temps, |_| -2500.0, None)),
    ]
    .into_iter()
    .collect();
    let features = FeatureSets::new()
        .with(Property::SmForm, vec![Expression::temperature()])
        .with(Property::HmForm, vec![Expression::Number(1.0)]);

    let params = fit_formation_energy_with(
        &["CU", "MG"],
        "CUMG2",
        &cu_mg(),
        &datasets,
        &features,
        &SelectionConfig::default(),
    )
    .unwrap();
    assert_eq!(params.len(), 2);
    assert_relative_eq!(coefficient(&params, "T"), 7.0, max_relative = 1e-10);
    assert_relative_eq!(coefficient(&params, "1"), -2500.0, max_relative = 1e-10);
}

#[test]
fn test_other_configurations_are_ignored() {
    let datasets = formation_datasets(-3.0, 0.0, 10.0, -100.0, None);
    let err = fit_formation_energy(&["CU", "MG"], "CUMG2", &["MG".into(), "CU".into()], &datasets);
    assert!(matches!(err, Err(CalphadError::NoData { .. })));

    let err = fit_formation_energy(&["CU", "MG"], "LAVES_C15", &cu_mg(), &datasets);
    assert!(matches!(err, Err(CalphadError::NoData { .. })));
}

#[test]
fn test_datasets_from_files() {
    let source = formation_datasets(-3.0, 0.0, 10.0, -100.0, None);
    let dir = std::env::temp_dir().join(format!("calphad_datasets_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let paths: Vec<_> = source
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let path = dir.join(format!("{}.json", i));
            std::fs::write(&path, serde_json::to_string(d).unwrap()).unwrap();
            path
        })
        .collect();

    let loaded = load_datasets(&paths).unwrap();
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(loaded.len(), 3);
    let params = fit_formation_energy(&["CU", "MG"], "CUMG2", &cu_mg(), &loaded).unwrap();
    assert_relative_eq!(coefficient(&params, "T*ln(T)"), -3.0, max_relative = 1e-8);
    assert_relative_eq!(coefficient(&params, "1"), -100.0, max_relative = 1e-8);
}
