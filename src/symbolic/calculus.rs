//! Symbolic manipulation of expressions: differentiation, substitution and
//! simplification.
//!
//! Only what the property transforms and database expansion need is supported.
//! Simplification is local constant folding and identity removal; it does not
//! attempt to collect like terms.

use super::expression::{
    BinaryOp, ExprResult, Expression, ExpressionError, Piecewise, PiecewiseBranch, UnaryOp,
};
use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Name of the temperature variable
pub const TEMPERATURE: &str = "T";

impl Expression {
    /// The temperature variable `T`
    pub fn temperature() -> Self {
        Expression::Variable(TEMPERATURE.to_string())
    }

    /// Shorthand for a variable reference
    pub fn var(name: &str) -> Self {
        Expression::Variable(name.to_string())
    }

    /// `self ^ exponent`
    pub fn pow(self, exponent: f64) -> Self {
        Expression::Binary(
            BinaryOp::Pow,
            Box::new(self),
            Box::new(Expression::Number(exponent)),
        )
    }

    /// Natural logarithm
    pub fn ln(self) -> Self {
        Expression::Function("ln".to_string(), vec![self])
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Expression::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Partial derivative with respect to `var`; other symbols are treated as constants.
    pub fn differentiate(&self, var: &str) -> ExprResult<Expression> {
        let d = match self {
            Expression::Number(_) => Expression::Number(0.0),
            Expression::Variable(name) => {
                Expression::Number(if name == var { 1.0 } else { 0.0 })
            }
            Expression::Unary(UnaryOp::Neg, inner) => -inner.differentiate(var)?,
            Expression::Binary(op, u, v) => {
                let du = u.differentiate(var)?;
                let dv = v.differentiate(var)?;
                let (u, v) = ((**u).clone(), (**v).clone());
                match op {
                    BinaryOp::Add => du + dv,
                    BinaryOp::Sub => du - dv,
                    BinaryOp::Mul => du * v + u * dv,
                    BinaryOp::Div => (du * v.clone() - u * dv) / v.pow(2.0),
                    BinaryOp::Pow => {
                        if !v.contains_variable(var) {
                            // d(u^n) = n u^(n-1) du
                            let exponent = v.clone() - Expression::Number(1.0);
                            v * Expression::Binary(
                                BinaryOp::Pow,
                                Box::new(u),
                                Box::new(exponent.simplify()),
                            ) * du
                        } else {
                            // d(u^v) = u^v (dv ln u + v du / u)
                            let base = Expression::Binary(
                                BinaryOp::Pow,
                                Box::new(u.clone()),
                                Box::new(v.clone()),
                            );
                            base * (dv * u.clone().ln() + v * du / u)
                        }
                    }
                }
            }
            Expression::Function(name, args) => {
                if args.len() != 1 {
                    return Err(ExpressionError::NotDifferentiable {
                        message: format!("{}() with {} arguments", name, args.len()),
                    });
                }
                let u = args[0].clone();
                let du = u.differentiate(var)?;
                let call =
                    |f: &str, arg: Expression| Expression::Function(f.to_string(), vec![arg]);
                match name.to_ascii_lowercase().as_str() {
                    "ln" | "log" => du / u,
                    "log10" => du / (u * Expression::Number(std::f64::consts::LN_10)),
                    "exp" => call("exp", u) * du,
                    "sin" => call("cos", u) * du,
                    "cos" => -(call("sin", u) * du),
                    "tan" => du / call("cos", u).pow(2.0),
                    "sqrt" => du / (Expression::Number(2.0) * call("sqrt", u)),
                    _ => {
                        return Err(ExpressionError::NotDifferentiable {
                            message: format!("{}() has no derivative rule", name),
                        })
                    }
                }
            }
            Expression::Piecewise(pw) => Expression::Piecewise(Piecewise {
                variable: pw.variable.clone(),
                branches: pw
                    .branches
                    .iter()
                    .map(|b| {
                        Ok(PiecewiseBranch {
                            lower: b.lower,
                            upper: b.upper,
                            expr: b.expr.differentiate(var)?,
                        })
                    })
                    .collect::<ExprResult<Vec<_>>>()?,
            }),
        };
        Ok(d.simplify())
    }

    /// Replace every variable found in `replacements` by its expression (single pass).
    pub fn substitute(&self, replacements: &BTreeMap<String, Expression>) -> Expression {
        match self {
            Expression::Number(_) => self.clone(),
            Expression::Variable(name) => replacements
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Expression::Unary(op, inner) => {
                Expression::Unary(*op, Box::new(inner.substitute(replacements)))
            }
            Expression::Binary(op, left, right) => Expression::Binary(
                *op,
                Box::new(left.substitute(replacements)),
                Box::new(right.substitute(replacements)),
            ),
            Expression::Function(name, args) => Expression::Function(
                name.clone(),
                args.iter().map(|a| a.substitute(replacements)).collect(),
            ),
            Expression::Piecewise(pw) => Expression::Piecewise(Piecewise {
                variable: pw.variable.clone(),
                branches: pw
                    .branches
                    .iter()
                    .map(|b| PiecewiseBranch {
                        lower: b.lower,
                        upper: b.upper,
                        expr: b.expr.substitute(replacements),
                    })
                    .collect(),
            }),
        }
    }

    /// Substitute repeatedly until no variable from `replacements` remains.
    ///
    /// Fails with [`ExpressionError::CircularDefinition`] when the definitions refer
    /// back to themselves.
    pub fn expand(&self, replacements: &BTreeMap<String, Expression>) -> ExprResult<Expression> {
        let mut current = self.clone();
        for _ in 0..=replacements.len() {
            let pending = current
                .variables()
                .into_iter()
                .find(|v| replacements.contains_key(v));
            if pending.is_none() {
                return Ok(current);
            }
            current = current.substitute(replacements);
        }
        let name = current
            .variables()
            .into_iter()
            .find(|v| replacements.contains_key(v))
            .unwrap_or_default();
        Err(ExpressionError::CircularDefinition { name })
    }

    /// Constant folding and removal of additive/multiplicative identities.
    pub fn simplify(self) -> Expression {
        match self {
            Expression::Number(_) | Expression::Variable(_) => self,
            Expression::Unary(UnaryOp::Neg, inner) => match inner.simplify() {
                Expression::Number(n) => Expression::Number(-n),
                Expression::Unary(UnaryOp::Neg, x) => *x,
                other => Expression::Unary(UnaryOp::Neg, Box::new(other)),
            },
            Expression::Binary(op, left, right) => {
                simplify_binary(op, left.simplify(), right.simplify())
            }
            Expression::Function(name, args) => {
                let args: Vec<Expression> = args.into_iter().map(Expression::simplify).collect();
                let folded = Expression::Function(name, args);
                if folded.variables().is_empty() {
                    if let Ok(value) = folded.evaluate(&BTreeMap::<String, f64>::new()) {
                        if value.is_finite() {
                            return Expression::Number(value);
                        }
                    }
                }
                folded
            }
            Expression::Piecewise(pw) => Expression::Piecewise(Piecewise {
                variable: pw.variable,
                branches: pw
                    .branches
                    .into_iter()
                    .map(|b| PiecewiseBranch {
                        lower: b.lower,
                        upper: b.upper,
                        expr: b.expr.simplify(),
                    })
                    .collect(),
            }),
        }
    }
}

fn simplify_binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    let (l, r) = (left.as_number(), right.as_number());
    if let (Some(a), Some(b)) = (l, r) {
        let folded = match op {
            BinaryOp::Add => Some(a + b),
            BinaryOp::Sub => Some(a - b),
            BinaryOp::Mul => Some(a * b),
            BinaryOp::Div if b != 0.0 => Some(a / b),
            BinaryOp::Div => None,
            BinaryOp::Pow => Some(a.powf(b)),
        };
        if let Some(value) = folded.filter(|v| v.is_finite()) {
            return Expression::Number(value);
        }
    }

    match op {
        BinaryOp::Add if l == Some(0.0) => right,
        BinaryOp::Add | BinaryOp::Sub if r == Some(0.0) => left,
        BinaryOp::Sub if l == Some(0.0) => {
            Expression::Unary(UnaryOp::Neg, Box::new(right)).simplify()
        }
        BinaryOp::Mul if l == Some(0.0) || r == Some(0.0) => Expression::Number(0.0),
        BinaryOp::Mul if l == Some(1.0) => right,
        BinaryOp::Mul if r == Some(1.0) => left,
        BinaryOp::Mul if l == Some(-1.0) => {
            Expression::Unary(UnaryOp::Neg, Box::new(right)).simplify()
        }
        BinaryOp::Mul if r == Some(-1.0) => {
            Expression::Unary(UnaryOp::Neg, Box::new(left)).simplify()
        }
        BinaryOp::Div if l == Some(0.0) && r != Some(0.0) => Expression::Number(0.0),
        BinaryOp::Div if r == Some(1.0) => left,
        BinaryOp::Pow if r == Some(0.0) => Expression::Number(1.0),
        BinaryOp::Pow if r == Some(1.0) => left,
        BinaryOp::Pow if l == Some(1.0) => Expression::Number(1.0),
        _ => Expression::Binary(op, Box::new(left), Box::new(right)),
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::Binary(BinaryOp::Add, Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::Binary(BinaryOp::Sub, Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::Binary(BinaryOp::Mul, Box::new(self), Box::new(rhs))
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::Binary(BinaryOp::Div, Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::Unary(UnaryOp::Neg, Box::new(self))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Number(value)
    }
}
