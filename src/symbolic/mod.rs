//! # Symbolic expressions
//!
//! Energy parameters, database functions and candidate polynomial features are
//! symbolic expressions in temperature. This module provides:
//!
//! - [`Expression`]: parsing, evaluation and free-symbol collection
//! - differentiation, substitution and simplification (used by the property
//!   transforms and by database symbol expansion)
//! - [`SymbolPattern`]: the naming convention that identifies fittable symbols
//!
//! ```rust
//! use calphad_paramselect::symbolic::{Expression, SimpleContext};
//!
//! let g = Expression::parse("-24.3*T*LN(T) + 1E-3*T**2").unwrap();
//! let entropy = -g.differentiate("T").unwrap();
//! let s = entropy.evaluate(&SimpleContext::temperature(500.0)).unwrap();
//! assert!(s.is_finite());
//! ```

pub mod calculus;
pub mod expression;
pub mod pattern;

pub use calculus::TEMPERATURE;
pub use expression::{
    BinaryOp, EvaluationContext, Expression, ExpressionError, Piecewise, PiecewiseBranch,
    SimpleContext, UnaryOp,
};
pub use pattern::SymbolPattern;
