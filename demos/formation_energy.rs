//! Example of fitting the formation energy of an end-member.
//!
//! This example generates heat capacity, entropy and enthalpy of formation
//! data for CUMG2 from a known Gibbs energy, selects the polynomial terms
//! that describe it, compares the fit with the data and finally assembles a
//! calibration context around a small database.
//!
//! Run with `RUST_LOG=debug` to see every candidate model considered.

use calphad_paramselect::context::{
    register_builtin_residual_functions, setup_context, ContextOptions,
};
use calphad_paramselect::database::Database;
use calphad_paramselect::datasets::{Dataset, Datasets, SublatticeEntry};
use calphad_paramselect::paramselect::{fit_formation_energy, parameter_comparisons};
use calphad_paramselect::symbolic::Expression;

use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

const DATABASE: &str = r#"{
    "elements": ["CU", "MG", "VA"],
    "phases": {"CUMG2": {"sublattice_site_ratios": [1, 2], "constituents": [["CU"], ["MG"]]}},
    "parameters": [
        {"phase_name": "CUMG2", "parameter_type": "G", "constituent_array": [["CU"], ["MG"]],
         "parameter": "GHSERCU + 2*GHSERMG + VV0000 + VV0001*T + VV0002*T*LN(T)"}
    ],
    "symbols": {
        "GHSERCU": "-7770.458 + 130.485*T - 24.112392*T*LN(T)",
        "GHSERMG": "-8367.34 + 143.675547*T - 26.1849782*T*LN(T)",
        "VV0000": "0", "VV0001": "0", "VV0002": "0"
    }
}"#;

fn record(output: &str, temps: &[f64], values: Vec<f64>) -> Result<Dataset, serde_json::Error> {
    serde_json::from_value(serde_json::json!({
        "components": ["CU", "MG"],
        "phases": ["CUMG2"],
        "output": output,
        "solver": {"mode": "manual", "sublattice_site_ratios": [1, 2],
                   "sublattice_configurations": [["CU", "MG"]]},
        "conditions": {"P": 101325, "T": temps},
        "values": values,
        "reference": "synthetic",
    }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Formation energy fitting example");
    println!("================================\n");

    // G_form = -1.5 T ln T + 8 T - 9500 per mole of atoms
    let (a, c, d) = (-1.5, 8.0, -9500.0);
    let temps = Array1::linspace(300.0, 1000.0, 30).to_vec();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 0.01)?;
    let mut noisy = |f: &dyn Fn(f64) -> f64| -> Vec<f64> {
        temps.iter().map(|&t| f(t) + noise.sample(&mut rng)).collect()
    };

    let cpm = noisy(&|_| -a);
    let sm = noisy(&|t| -(a * (t.ln() + 1.0) + c));
    let hm = noisy(&|t| -a * t + d);
    let datasets: Datasets = vec![
        record("CPM_FORM", &temps, cpm)?,
        record("SM_FORM", &temps, sm)?,
        record("HM_FORM", &temps, hm)?,
    ]
    .into_iter()
    .collect();

    // 1. Parameter selection
    println!("1. Selected parameters");
    println!("----------------------");
    let configuration: Vec<SublatticeEntry> = vec!["CU".into(), "MG".into()];
    let parameters = fit_formation_energy(&["CU", "MG"], "CUMG2", &configuration, &datasets)?;
    for (feature, value) in parameters.iter() {
        println!("  {:>10}  {:>14.6}", feature.to_string(), value);
    }

    // 2. Comparison with data
    println!("\n2. Fit against data");
    println!("-------------------");
    let dbf = Database::from_json(DATABASE)?;
    let mut refstate = BTreeMap::new();
    for species in ["CU", "MG"] {
        let name = format!("GHSER{}", species);
        if let Some(expr) = dbf.symbol(&name) {
            refstate.insert(species.to_string(), expr.clone());
        }
    }
    let comparisons = parameter_comparisons(
        &["CU", "MG"],
        "CUMG2",
        &configuration,
        &[1.0, 2.0],
        &datasets,
        &parameters,
        None,
        &refstate,
    )?;
    for cmp in &comparisons {
        let points: usize = cmp.data.iter().map(|d| d.x.len()).sum();
        println!(
            "  {:<9} {:>6.1}-{:<7.1} K  first {:>12.4}  last {:>12.4}  ({} data points)",
            cmp.y.as_str(),
            cmp.x_min,
            cmp.x_max,
            cmp.predicted_y.first().copied().unwrap_or(f64::NAN),
            cmp.predicted_y.last().copied().unwrap_or(f64::NAN),
            points
        );
    }

    // 3. Calibration context
    println!("\n3. Calibration context");
    println!("----------------------");
    register_builtin_residual_functions();
    let ctx = setup_context(&dbf, &datasets, ContextOptions::new().data_weight("HM", 0.1))?;
    println!("  Symbols to fit: {:?}", ctx.symbols_to_fit());

    // The selected terms map onto VV0000 (1), VV0001 (T) and VV0002 (T ln T),
    // scaled to the three atoms of the formula unit.
    let start: Vec<f64> = [
        Expression::Number(1.0),
        Expression::temperature(),
        Expression::parse("T*ln(T)")?,
    ]
    .iter()
    .map(|f| 3.0 * parameters.get(f).unwrap_or(0.0))
    .collect();
    println!("  Starting point: {:?}", start);
    println!("  Log-likelihood: {:.4}", ctx.likelihood(&start)?);
    println!("  Log-likelihood at zero: {:.4}", ctx.likelihood(&[0.0; 3])?);

    Ok(())
}
