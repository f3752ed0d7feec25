//! Tests for reducing a database to a subsystem

use calphad_paramselect::database::{reduce_database, Database, WorkingDatabase};
use calphad_paramselect::symbolic::{Expression, SymbolPattern};
use std::collections::BTreeSet;

const ALCUMG: &str = r#"{
    "elements": ["AL", "CU", "MG", "VA"],
    "species": {"CU2MG": {"constituents": {"CU": 2.0, "MG": 1.0}}},
    "phases": {
        "FCC_A1": {"sublattice_site_ratios": [1, 1], "constituents": [["AL", "CU", "MG"], ["VA"]]},
        "CUMG2": {"sublattice_site_ratios": [1, 2], "constituents": [["CU"], ["MG"]]},
        "LIQUID": {"sublattice_site_ratios": [1], "constituents": [["AL", "CU", "MG", "CU2MG"]]}
    },
    "parameters": [
        {"phase_name": "FCC_A1", "parameter_type": "G", "constituent_array": [["AL"], ["VA"]],
         "parameter": "GHSERAL"},
        {"phase_name": "FCC_A1", "parameter_type": "G", "constituent_array": [["CU"], ["VA"]],
         "parameter": "GHSERCU"},
        {"phase_name": "FCC_A1", "parameter_type": "L", "constituent_array": [["AL", "CU"], ["VA"]],
         "parameter": "VV0003 + VV0004*T"},
        {"phase_name": "CUMG2", "parameter_type": "G", "constituent_array": [["CU"], ["MG"]],
         "parameter": "GHSERCU + 2*GHSERMG + VV0000 + VV0001*T"},
        {"phase_name": "LIQUID", "parameter_type": "G", "constituent_array": [["CU2MG"]],
         "parameter": "VV0002"}
    ],
    "symbols": {
        "GHSERAL": "-7976.15 + 137.09*T + GALREF",
        "GALREF": "-24.37*T*ln(T)",
        "GHSERCU": "-7770.46 + 130.49*T",
        "GHSERMG": "-8367.34 + 143.68*T",
        "VV0000": "-30000", "VV0001": "0", "VV0002": "-5000",
        "VV0003": "-40000", "VV0004": "10"
    }
}"#;

fn database() -> Database {
    Database::from_json(ALCUMG).unwrap()
}

fn elements(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn names(dbf: &Database) -> BTreeSet<String> {
    dbf.symbols().keys().cloned().collect()
}

#[test]
fn test_reduce_to_binary() {
    let mut dbf = database();
    let summary = reduce_database(&mut dbf, Some(elements(&["CU", "MG", "VA"]).as_slice()));

    assert_eq!(summary.parameters_before, 5);
    assert_eq!(summary.parameters_after, 3);
    assert_eq!(summary.symbols_before, 9);
    assert_eq!(
        names(&dbf),
        ["GHSERCU", "GHSERMG", "VV0000", "VV0001", "VV0002"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    );
    assert!(dbf.search_parameters(|p| p.species().any(|s| s == "AL")).is_empty());
}

#[test]
fn test_species_elements_decide_membership() {
    // CU2MG is made of CU and MG, so it survives without being an element name
    let mut dbf = database();
    reduce_database(&mut dbf, Some(elements(&["CU", "MG"]).as_slice()));
    assert_eq!(dbf.search_parameters(|p| p.phase_name == "LIQUID").len(), 1);

    let mut dbf = database();
    reduce_database(&mut dbf, Some(elements(&["CU"]).as_slice()));
    assert!(dbf.search_parameters(|p| p.phase_name == "LIQUID").is_empty());
}

#[test]
fn test_nested_symbols_are_kept() {
    let mut dbf = database();
    reduce_database(&mut dbf, Some(elements(&["AL", "VA"]).as_slice()));
    assert_eq!(
        names(&dbf),
        ["GALREF", "GHSERAL"].iter().map(|s| s.to_string()).collect()
    );
}

#[test]
fn test_reduction_is_idempotent() {
    let elements = elements(&["CU", "MG", "VA"]);
    let mut once = database();
    reduce_database(&mut once, Some(elements.as_slice()));
    let mut twice = once.clone();
    let summary = reduce_database(&mut twice, Some(elements.as_slice()));
    assert_eq!(once, twice);
    assert_eq!(summary.parameters_before, summary.parameters_after);
}

#[test]
fn test_no_elements_is_a_no_op() {
    let mut dbf = database();
    reduce_database(&mut dbf, None);
    assert_eq!(dbf, database());
}

#[test]
fn test_working_copy_leaves_original() {
    let original = database();
    let mut working = WorkingDatabase::copy_of(&original);
    working.reduce(Some(elements(&["CU", "MG"]).as_slice()));
    let reduced = working.into_database();
    assert!(reduced.parameters().len() < original.parameters().len());
    assert_eq!(original, database());
}

#[test]
fn test_symbols_to_fit_after_reduction() {
    let mut dbf = database();
    let pattern = SymbolPattern::default();
    assert_eq!(dbf.symbols_to_fit(&pattern).len(), 5);

    reduce_database(&mut dbf, Some(elements(&["AL", "CU", "VA"]).as_slice()));
    assert_eq!(dbf.symbols_to_fit(&pattern), vec!["VV0003".to_string(), "VV0004".to_string()]);
}

#[test]
fn test_json_roundtrip_through_file() {
    let dbf = database();
    let path = std::env::temp_dir().join(format!("calphad_db_{}.json", std::process::id()));
    dbf.save_json(&path).unwrap();
    let loaded = Database::load_json(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, dbf);
    assert_eq!(
        loaded.symbol("GALREF"),
        Some(&Expression::parse("-24.37*T*ln(T)").unwrap())
    );
}
