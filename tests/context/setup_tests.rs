//! Tests for setup_context against the global registry

use approx::assert_relative_eq;
use calphad_paramselect::context::{
    register_builtin_residual_functions, register_residual_function, setup_context,
    ContextOptions, ResidualFunction, ResidualInputs, ResidualRegistry, FORMATION_PROPERTY_RESIDUAL,
};
use calphad_paramselect::database::Database;
use calphad_paramselect::datasets::Datasets;
use calphad_paramselect::error::{CalphadError, Result};
use calphad_paramselect::symbolic::{Expression, SymbolPattern};
use serde_json::json;

use crate::test_helpers::formation_datasets;

const CUMG: &str = r#"{
    "elements": ["AL", "CU", "MG", "VA"],
    "phases": {"CUMG2": {"sublattice_site_ratios": [1, 2], "constituents": [["CU"], ["MG"]]}},
    "parameters": [
        {"phase_name": "CUMG2", "parameter_type": "G", "constituent_array": [["CU"], ["MG"]],
         "parameter": "GHSERCU + 2*GHSERMG + VV0000 + VV0001*T"},
        {"phase_name": "FCC_A1", "parameter_type": "G", "constituent_array": [["AL"], ["VA"]],
         "parameter": "GHSERAL + VV0002"}
    ],
    "symbols": {
        "GHSERAL": "-7976.15 + 137.09*T",
        "GHSERCU": "-7770.46 + 130.49*T",
        "GHSERMG": "-8367.34 + 143.68*T",
        "VV0000": "piecewise(T, 298.15, -30000, 6000)",
        "VV0001": "0",
        "VV0002": "0",
        "X": "5"
    }
}"#;

fn database() -> Database {
    Database::from_json(CUMG).unwrap()
}

#[test]
fn test_discovers_fit_symbols() {
    let dbf = database();
    let ctx = setup_context(&dbf, &Datasets::new(), ContextOptions::new()).unwrap();
    assert_eq!(ctx.symbols_to_fit(), &["VV0000", "VV0001", "VV0002"]);
    assert!(!ctx.symbols_to_fit().contains(&"X".to_string()));
}

#[test]
fn test_phase_models_scope_the_system() {
    let dbf = database();
    let options = ContextOptions::new().phase_models(json!({
        "components": ["CU", "MG"],
        "phases": {
            "CUMG2": {"sublattice_model": [["CU"], ["MG"]], "sublattice_site_ratios": [1, 2]}
        }
    }));
    let ctx = setup_context(&dbf, &Datasets::new(), options).unwrap();
    assert_eq!(ctx.symbols_to_fit(), &["VV0000", "VV0001"]);
    assert!(ctx.database().symbol("GHSERAL").is_none());

    // the first branch replaces the piecewise symbol in the copy only
    assert_eq!(ctx.database().symbol("VV0000"), Some(&Expression::parse("-30000").unwrap()));
    assert_eq!(dbf, database());
}

#[test]
fn test_invalid_phase_models() {
    let options = ContextOptions::new().phase_models(json!({
        "components": ["CU", "MG"],
        "phases": {"CUMG2": {"sublattice_model": [["CU"], ["MG"]], "sublattice_site_ratios": [1]}}
    }));
    let err = setup_context(&database(), &Datasets::new(), options);
    assert!(matches!(err, Err(CalphadError::InvalidPhaseModel(_))));
}

#[test]
fn test_no_degrees_of_freedom() {
    let dbf =
        Database::from_json(r#"{"symbols": {"X": "1", "GHSERAL": "2", "VV": "3", "V1A": "4"}}"#)
            .unwrap();
    let err = setup_context(&dbf, &Datasets::new(), ContextOptions::new());
    match err {
        Err(CalphadError::Configuration(message)) => {
            assert!(message.contains("No degrees of freedom"))
        }
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn test_custom_symbol_pattern() {
    let dbf = Database::from_json(r#"{"symbols": {"P1": "1", "P2": "2", "VV0000": "3"}}"#).unwrap();
    let options = ContextOptions::new().symbol_pattern(SymbolPattern::with_prefixes(["P"]));
    let ctx = setup_context(&dbf, &Datasets::new(), options).unwrap();
    assert_eq!(ctx.symbols_to_fit(), &["P1", "P2"]);
}

#[test]
fn test_builtin_residual_likelihood() {
    register_builtin_residual_functions();
    // idempotent
    register_builtin_residual_functions();
    let names = ResidualRegistry::global().names();
    assert_eq!(names.iter().filter(|n| *n == FORMATION_PROPERTY_RESIDUAL).count(), 1);

    // G_form per atom = (VV0000 + VV0001*T) / 3
    let datasets = formation_datasets(0.0, 0.0, 3.0, -9000.0, None);
    let options = ContextOptions::new().symbols_to_fit(["VV0001", "VV0000"]);
    let ctx = setup_context(&database(), &datasets, options).unwrap();
    assert_eq!(ctx.symbols_to_fit(), &["VV0000", "VV0001"]);

    let builtin = ctx
        .residual_objs()
        .iter()
        .find(|r| r.name() == FORMATION_PROPERTY_RESIDUAL)
        .unwrap();
    let (residuals, weights) = builtin.residuals(&[-27000.0, 9.0]).unwrap();
    assert_eq!(residuals.len(), 45);
    assert!(residuals.iter().all(|r| r.abs() < 1e-6));
    assert!(weights.iter().all(|&w| w == 1.0));

    let truth = builtin.likelihood(&[-27000.0, 9.0]).unwrap();
    let off = builtin.likelihood(&[-26000.0, 9.0]).unwrap();
    assert!(truth > off);
}

#[derive(Debug)]
struct SymbolCount(usize);

impl ResidualFunction for SymbolCount {
    fn name(&self) -> &str {
        "symbol_count"
    }

    fn residuals(&self, parameters: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        Ok((vec![(parameters.len() - self.0) as f64], vec![1.0]))
    }

    fn likelihood(&self, _parameters: &[f64]) -> Result<f64> {
        Ok(-(self.0 as f64))
    }
}

#[test]
fn test_user_registered_residual() {
    register_residual_function("symbol_count", |inputs: &ResidualInputs<'_>| {
        Ok(Box::new(SymbolCount(inputs.symbols_to_fit.len())) as Box<dyn ResidualFunction>)
    });

    let ctx = setup_context(&database(), &Datasets::new(), ContextOptions::new()).unwrap();
    let custom = ctx
        .residual_objs()
        .iter()
        .find(|r| r.name() == "symbol_count")
        .unwrap();
    assert_eq!(custom.residuals(&[0.0; 3]).unwrap().0, vec![0.0]);
    assert_relative_eq!(custom.likelihood(&[0.0; 3]).unwrap(), -3.0);
}
