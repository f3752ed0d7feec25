//! Tests for comparing fitted parameters with data

use approx::assert_relative_eq;
use calphad_paramselect::datasets::SublatticeEntry;
use calphad_paramselect::error::CalphadError;
use calphad_paramselect::paramselect::{
    fit_formation_energy, parameter_comparisons, ParameterMapping, Property,
};
use calphad_paramselect::symbolic::Expression;
use std::collections::BTreeMap;

use crate::test_helpers::{cumg2_record, formation_datasets};

// G_form = -3 T ln T + 10 T - 100
fn fitted() -> (calphad_paramselect::Datasets, ParameterMapping) {
    let mut datasets = formation_datasets(-3.0, 0.0, 10.0, -100.0, None);
    datasets.insert(cumg2_record("HM", &[300.0, 600.0], &[10.0, 20.0]));
    let params = fit_formation_energy(&["CU", "MG"], "CUMG2", &cu_mg(), &datasets).unwrap();
    (datasets, params)
}

fn cu_mg() -> Vec<SublatticeEntry> {
    vec!["CU".into(), "MG".into()]
}

fn refstate() -> BTreeMap<String, Expression> {
    [
        ("CU", "-7770 + 130*T - 24*T*ln(T)"),
        ("MG", "-8367 + 143*T - 22*T*ln(T)"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Expression::parse(v).unwrap()))
    .collect()
}

fn plots(ys: &[Property]) -> Vec<(String, Property)> {
    ys.iter().map(|&y| ("T".to_string(), y)).collect()
}

#[test]
fn test_formation_predictions_match_data() {
    let (datasets, params) = fitted();
    let plots = plots(&[Property::CpmForm, Property::HmForm]);
    let cmps = parameter_comparisons(
        &["CU", "MG"],
        "CUMG2",
        &cu_mg(),
        &[1.0, 2.0],
        &datasets,
        &params,
        Some(plots.as_slice()),
        &refstate(),
    )
    .unwrap();
    assert_eq!(cmps.len(), 2);

    let cp = &cmps[0];
    assert_eq!((cp.x_min, cp.x_max), (300.0, 1000.0));
    assert!(cp.predicted_y.iter().all(|v| (v - 3.0).abs() < 1e-8));
    assert_eq!(cp.data.len(), 1);
    assert_eq!(cp.data[0].x.len(), 15);

    let hm = &cmps[1];
    assert_eq!(hm.y_label, Property::HmForm.label());
    for (&t, &h) in hm.predicted_x.iter().zip(&hm.predicted_y) {
        assert_relative_eq!(h, 3.0 * t - 100.0, max_relative = 1e-8);
    }
    for (&t, &h) in hm.data[0].x.iter().zip(&hm.data[0].y) {
        assert_relative_eq!(h, 3.0 * t - 100.0, max_relative = 1e-8);
    }
}

#[test]
fn test_reference_state_contribution() {
    let (datasets, params) = fitted();
    let plots = plots(&[Property::Cpm, Property::Hm]);
    let cmps = parameter_comparisons(
        &["CU", "MG"],
        "CUMG2",
        &cu_mg(),
        &[1.0, 2.0],
        &datasets,
        &params,
        Some(plots.as_slice()),
        &refstate(),
    )
    .unwrap();

    // 1*24 + 2*22 from the references plus 3 of formation
    let cp = &cmps[0];
    assert!(cp.data.is_empty());
    assert!(cp.predicted_y.iter().all(|v| (v - 71.0).abs() < 1e-8));

    // H = (-7770 + 24 T) + 2 (-8367 + 22 T) + 3 T - 100
    let enthalpy = |t: f64| -24604.0 + 71.0 * t;
    let hm = &cmps[1];
    assert_relative_eq!(hm.predicted_y[0], enthalpy(300.0), max_relative = 1e-10);
    // HM data are relative to 298.15 K
    let shift = enthalpy(298.15);
    assert_relative_eq!(hm.data[0].y[0], 10.0 + shift, max_relative = 1e-10);
    assert_relative_eq!(hm.data[0].y[1], 20.0 + shift, max_relative = 1e-10);
}

#[test]
fn test_default_plots_need_reference_states() {
    let (datasets, params) = fitted();
    let cmps = parameter_comparisons(
        &["CU", "MG"], "CUMG2", &cu_mg(), &[1.0, 2.0], &datasets, &params, None, &refstate(),
    )
    .unwrap();
    assert_eq!(cmps.len(), 6);
    assert!(cmps.iter().all(|c| c.x == "T" && c.predicted_x.len() == 100));

    let err = parameter_comparisons(
        &["CU", "MG"], "CUMG2", &cu_mg(), &[1.0, 2.0], &datasets, &params, None, &BTreeMap::new(),
    );
    assert!(matches!(err, Err(CalphadError::SymbolNotFound(_))));
}

#[test]
fn test_mixing_configuration_not_supported() {
    let (datasets, params) = fitted();
    let mixing: Vec<SublatticeEntry> = vec![vec!["CU", "MG"].into(), "MG".into()];
    let err = parameter_comparisons(
        &["CU", "MG"], "CUMG2", &mixing, &[1.0, 2.0], &datasets, &params, None, &refstate(),
    );
    assert!(matches!(err, Err(CalphadError::NotImplemented(_))));
}

#[test]
fn test_site_ratios_must_cover_every_sublattice() {
    let (datasets, params) = fitted();
    let plots = plots(&[Property::HmForm]);
    let err = parameter_comparisons(
        &["CU", "MG"],
        "CUMG2",
        &cu_mg(),
        &[1.0],
        &datasets,
        &params,
        Some(plots.as_slice()),
        &refstate(),
    );
    assert!(matches!(err, Err(CalphadError::DimensionMismatch(_))));
}

#[test]
fn test_comparison_serializes() {
    let (datasets, params) = fitted();
    let plots = plots(&[Property::HmForm]);
    let cmps = parameter_comparisons(
        &["CU", "MG"],
        "CUMG2",
        &cu_mg(),
        &[1.0, 2.0],
        &datasets,
        &params,
        Some(plots.as_slice()),
        &refstate(),
    )
    .unwrap();
    let json = serde_json::to_value(&cmps[0]).unwrap();
    assert_eq!(json["y"], "HM_FORM");
    assert_eq!(json["x_label"], "Temperature (K)");
    assert_eq!(json["data"][0]["reference"], "synthetic");
}
