//! Tests for Expression parsing and evaluation

use approx::assert_relative_eq;
use calphad_paramselect::symbolic::{Expression, ExpressionError, SimpleContext, SymbolPattern};
use std::collections::BTreeMap;

#[test]
fn test_tdb_style_parameters() {
    let expr =
        Expression::parse("-7976.15+137.093038*T-24.3671976*T*LN(T)-0.001884662*T**2").unwrap();
    assert_eq!(expr.variables(), vec!["T".to_string()]);

    let t: f64 = 500.0;
    let expected = -7976.15 + 137.093038 * t - 24.3671976 * t * t.ln() - 0.001884662 * t * t;
    let value = expr.evaluate(&SimpleContext::temperature(t)).unwrap();
    assert_relative_eq!(value, expected, max_relative = 1e-12);
}

#[test]
fn test_subtraction_is_left_associative() {
    let expr = Expression::parse("10 - 4 - 3").unwrap();
    assert_eq!(expr.evaluate(&SimpleContext::new()).unwrap(), 3.0);

    let expr = Expression::parse("64 / 4 / 2").unwrap();
    assert_eq!(expr.evaluate(&SimpleContext::new()).unwrap(), 8.0);
}

#[test]
fn test_symbols_in_parameters() {
    let expr = Expression::parse("GHSERAL + VV0001 + VV0002*T").unwrap();
    assert_eq!(
        expr.variables(),
        vec!["GHSERAL".to_string(), "T".to_string(), "VV0001".to_string(), "VV0002".to_string()]
    );

    let ctx: BTreeMap<String, f64> = [
        ("GHSERAL".to_string(), -100.0),
        ("VV0001".to_string(), 5.0),
        ("VV0002".to_string(), 2.0),
        ("T".to_string(), 300.0),
    ]
    .into_iter()
    .collect();
    assert_eq!(expr.evaluate(&ctx).unwrap(), 505.0);

    let err = expr.evaluate(&SimpleContext::temperature(300.0));
    assert!(matches!(err, Err(ExpressionError::UndefinedVariable { .. })));
}

#[test]
fn test_piecewise_ranges() {
    let expr = Expression::parse("piecewise(T, 298.15, 2*T, 1000, 3000, 6000)").unwrap();
    let at = |t: f64| expr.evaluate(&SimpleContext::temperature(t)).unwrap();
    assert_eq!(at(500.0), 1000.0);
    assert_eq!(at(2000.0), 3000.0);
    assert_eq!(at(100.0), 0.0);
    assert_eq!(at(7000.0), 0.0);

    match &expr {
        Expression::Piecewise(pw) => {
            assert_eq!(pw.branches.len(), 2);
            assert_eq!(pw.first_branch(), Some(&Expression::parse("2*T").unwrap()));
        }
        other => panic!("expected a piecewise expression, got {}", other),
    }

    assert!(Expression::parse("piecewise(T, 1000, 1, 300)").is_err());
}

#[test]
fn test_display_roundtrip() {
    for text in ["T*ln(T)", "-(T + 1)*2", "T^-1", "2^3^2", "a - (b - c)"] {
        let expr = Expression::parse(text).unwrap();
        let reparsed = Expression::parse(&expr.to_string()).unwrap();
        assert_eq!(reparsed, expr, "{} printed as {}", text, expr);
    }
}

#[test]
fn test_serde_as_string_or_number() {
    let exprs: Vec<Expression> = serde_json::from_str(r#"["1 + T", 2.5]"#).unwrap();
    assert_eq!(exprs[1], Expression::Number(2.5));
    let json = serde_json::to_string(&exprs[0]).unwrap();
    assert_eq!(json, "\"1 + T\"");
}

#[test]
fn test_symbol_pattern() {
    let pattern = SymbolPattern::default();
    for name in ["V1", "VV0000", "V0123"] {
        assert!(pattern.matches(name), "{}", name);
    }
    for name in ["X", "VV", "VVV1", "V1A", "GHSERAL", "v1"] {
        assert!(!pattern.matches(name), "{}", name);
    }

    let custom = SymbolPattern::with_prefixes(["P"]);
    assert!(custom.matches("P12"));
    assert!(!custom.matches("VV0001"));
}
