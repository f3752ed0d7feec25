//! Tests for differentiation, expansion and the property transforms

use approx::assert_relative_eq;
use calphad_paramselect::paramselect::Property;
use calphad_paramselect::symbolic::{Expression, ExpressionError, SimpleContext, TEMPERATURE};
use std::collections::BTreeMap;

fn at(expr: &Expression, t: f64) -> f64 {
    expr.evaluate(&SimpleContext::temperature(t)).unwrap()
}

#[test]
fn test_derivatives_of_features() {
    let cases: [(&str, fn(f64) -> f64); 5] = [
        ("T*ln(T)", |t: f64| t.ln() + 1.0),
        ("T^2", |t: f64| 2.0 * t),
        ("T^-1", |t: f64| -1.0 / (t * t)),
        ("T^3", |t: f64| 3.0 * t * t),
        ("exp(T/1000)", |t: f64| (t / 1000.0).exp() / 1000.0),
    ];
    for (text, exact) in cases {
        let d = Expression::parse(text).unwrap().differentiate(TEMPERATURE).unwrap();
        for t in [300.0, 650.0, 1200.0] {
            assert_relative_eq!(at(&d, t), exact(t), max_relative = 1e-12);
        }
    }
}

#[test]
fn test_other_symbols_are_constants() {
    let expr = Expression::parse("VV0001*T + VV0002").unwrap();
    let d = expr.differentiate(TEMPERATURE).unwrap();
    assert_eq!(d, Expression::var("VV0001"));
    assert_eq!(expr.differentiate("VV0002").unwrap(), Expression::Number(1.0));
}

#[test]
fn test_property_transforms() {
    // G = a T lnT + b T^2 + c T + d
    let (a, b, c, d) = (-25.0, -0.002, 120.0, -8000.0);
    let g = Expression::parse(&format!("{}*T*ln(T) + {}*T^2 + {}*T + {}", a, b, c, d)).unwrap();
    let t: f64 = 700.0;

    let cp = Property::CpmForm.transform(&g).unwrap();
    assert_relative_eq!(at(&cp, t), -a - 2.0 * b * t, max_relative = 1e-10);

    let s = Property::SmForm.transform(&g).unwrap();
    assert_relative_eq!(at(&s, t), -(a * (t.ln() + 1.0) + 2.0 * b * t + c), max_relative = 1e-10);

    let h = Property::HmForm.transform(&g).unwrap();
    assert_relative_eq!(at(&h, t), -a * t - b * t * t + d, max_relative = 1e-10);

    // Non-formation properties share the transforms
    assert_eq!(Property::Hm.transform(&g).unwrap(), h);
}

#[test]
fn test_constant_enthalpy_feature() {
    let one = Expression::Number(1.0);
    assert_eq!(Property::HmForm.transform(&one).unwrap(), Expression::Number(1.0));
    assert_eq!(Property::SmForm.transform(&one).unwrap(), Expression::Number(0.0));
    assert_eq!(Property::CpmForm.transform(&one).unwrap(), Expression::Number(0.0));
}

#[test]
fn test_expand_nested_functions() {
    let defs: BTreeMap<String, Expression> = [
        ("GHSERAL", "-7976 + GAL0*T"),
        ("GAL0", "137 + VV0000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Expression::parse(v).unwrap()))
    .collect();

    let expanded = Expression::parse("2*GHSERAL").unwrap().expand(&defs).unwrap();
    assert_eq!(expanded.variables(), vec!["T".to_string(), "VV0000".to_string()]);

    let mut ctx = SimpleContext::temperature(300.0);
    ctx.set_variable("VV0000", 1.0);
    assert_relative_eq!(expanded.evaluate(&ctx).unwrap(), 2.0 * (-7976.0 + 138.0 * 300.0));
}

#[test]
fn test_circular_definition() {
    let defs: BTreeMap<String, Expression> = [("A", "B + 1"), ("B", "2*A")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Expression::parse(v).unwrap()))
        .collect();
    let err = Expression::parse("A").unwrap().expand(&defs);
    assert!(matches!(err, Err(ExpressionError::CircularDefinition { .. })));
}

#[test]
fn test_piecewise_derivative_keeps_ranges() {
    let expr = Expression::parse("piecewise(T, 298.15, T^2, 1000, 5*T, 3000)").unwrap();
    let d = expr.differentiate(TEMPERATURE).unwrap();
    assert_relative_eq!(at(&d, 500.0), 1000.0);
    assert_relative_eq!(at(&d, 1500.0), 5.0);
    assert_eq!(at(&d, 4000.0), 0.0);
}
