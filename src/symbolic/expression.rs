//! Expression parsing and evaluation for energy-model terms
//!
//! Gibbs energy parameters, database functions and candidate polynomial features
//! are all represented as [`Expression`] trees. Expressions are parsed from the
//! usual infix notation (`^` and `**` both denote powers, so TDB-style strings
//! such as `-11.5*T + 2.1*T*LN(T) + 3E-5*T**2` parse directly) and serialize back
//! to that notation.
//!
//! Temperature-range functions are written as
//! `piecewise(T, 298.15, <expr>, 6000, <expr>, 10000)`: the first argument names
//! the range variable, followed by alternating breakpoints and branch expressions.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Error that can occur during expression parsing, transformation or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },

    #[error("Cannot differentiate: {message}")]
    NotDifferentiable { message: String },

    #[error("Circular symbol definition involving '{name}'")]
    CircularDefinition { name: String },
}

/// Result type for expression evaluation
pub(crate) type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable or symbol reference
    Variable(String),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),

    /// Range-dependent function of a single variable
    Piecewise(Piecewise),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Power (^ or **)
    Pow,
}

/// A function defined branch-wise over half-open ranges `[lower, upper)` of one variable.
///
/// Outside every range the function evaluates to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Piecewise {
    /// Name of the range variable, usually `T`
    pub variable: String,

    /// Branches in ascending range order
    pub branches: Vec<PiecewiseBranch>,
}

/// One branch of a [`Piecewise`] function
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseBranch {
    pub lower: f64,
    pub upper: f64,
    pub expr: Expression,
}

impl Piecewise {
    /// Expression of the first branch, if any
    pub fn first_branch(&self) -> Option<&Expression> {
        self.branches.first().map(|b| &b.expr)
    }

    fn branch_at(&self, value: f64) -> Option<&PiecewiseBranch> {
        self.branches
            .iter()
            .find(|b| value >= b.lower && value < b.upper)
    }
}

/// Context for expression evaluation, providing variable values
pub trait EvaluationContext {
    /// Get the value of a variable
    fn get_variable(&self, name: &str) -> ExprResult<f64>;

    /// Check if a variable exists
    fn has_variable(&self, name: &str) -> bool;
}

/// Simple implementation of EvaluationContext using a HashMap
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    variables: HashMap<String, f64>,
}

impl SimpleContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Context holding only the temperature `T`
    pub fn temperature(t: f64) -> Self {
        let mut ctx = Self::new();
        ctx.set_variable("T", t);
        ctx
    }

    /// Set a variable value
    pub fn set_variable(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_string(), value);
    }

    /// Remove a variable
    pub fn remove_variable(&mut self, name: &str) -> Option<f64> {
        self.variables.remove(name)
    }
}

impl EvaluationContext for SimpleContext {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.variables
            .get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl EvaluationContext for BTreeMap<String, f64> {
    fn get_variable(&self, name: &str) -> ExprResult<f64> {
        self.get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

fn unary_arg(name: &str, args: &[f64]) -> ExprResult<f64> {
    if args.len() != 1 {
        return Err(ExpressionError::InvalidOperation {
            message: format!("{}() requires 1 argument, got {}", name, args.len()),
        });
    }
    Ok(args[0])
}

impl Expression {
    /// Parse an expression from a string
    pub fn parse(input: &str) -> ExprResult<Self> {
        match expr_parser(input.trim()) {
            Ok((remainder, expr)) => {
                if remainder.trim().is_empty() {
                    expr.resolve_piecewise()
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Evaluate the expression with the given context
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),

            Self::Variable(name) => context.get_variable(name),

            Self::Unary(op, expr) => {
                let value = expr.evaluate(context)?;
                match op {
                    UnaryOp::Neg => Ok(-value),
                }
            }

            Self::Binary(op, left, right) => {
                let lhs = left.evaluate(context)?;
                let rhs = right.evaluate(context)?;

                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Sub => Ok(lhs - rhs),
                    BinaryOp::Mul => Ok(lhs * rhs),
                    BinaryOp::Div => {
                        if rhs == 0.0 {
                            Err(ExpressionError::DivisionByZero)
                        } else {
                            Ok(lhs / rhs)
                        }
                    }
                    BinaryOp::Pow => Ok(lhs.powf(rhs)),
                }
            }

            Self::Function(name, args) => {
                let mut evaluated_args = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated_args.push(arg.evaluate(context)?);
                }
                let lower = name.to_ascii_lowercase();

                match lower.as_str() {
                    "sin" => Ok(unary_arg(&lower, &evaluated_args)?.sin()),
                    "cos" => Ok(unary_arg(&lower, &evaluated_args)?.cos()),
                    "tan" => Ok(unary_arg(&lower, &evaluated_args)?.tan()),
                    "exp" => Ok(unary_arg(&lower, &evaluated_args)?.exp()),
                    "log" | "ln" => {
                        let x = unary_arg(&lower, &evaluated_args)?;
                        if x <= 0.0 {
                            return Err(ExpressionError::InvalidOperation {
                                message: format!("{}() of non-positive value {}", lower, x),
                            });
                        }
                        Ok(x.ln())
                    }
                    "log10" => Ok(unary_arg(&lower, &evaluated_args)?.log10()),
                    "sqrt" => Ok(unary_arg(&lower, &evaluated_args)?.sqrt()),
                    "abs" => Ok(unary_arg(&lower, &evaluated_args)?.abs()),
                    "max" | "min" => {
                        if evaluated_args.len() < 2 {
                            return Err(ExpressionError::InvalidOperation {
                                message: format!(
                                    "{}() requires at least 2 arguments, got {}",
                                    lower,
                                    evaluated_args.len()
                                ),
                            });
                        }
                        if lower == "max" {
                            Ok(evaluated_args
                                .iter()
                                .fold(f64::NEG_INFINITY, |a, &b| a.max(b)))
                        } else {
                            Ok(evaluated_args.iter().fold(f64::INFINITY, |a, &b| a.min(b)))
                        }
                    }
                    _ => Err(ExpressionError::UndefinedFunction {
                        name: name.to_string(),
                    }),
                }
            }

            Self::Piecewise(pw) => {
                let value = context.get_variable(&pw.variable)?;
                match pw.branch_at(value) {
                    Some(branch) => branch.expr.evaluate(context),
                    None => Ok(0.0),
                }
            }
        }
    }

    /// Find all variable names used in the expression (the free symbols)
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    /// Whether `name` appears anywhere in the expression
    pub fn contains_variable(&self, name: &str) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Variable(v) => v == name,
            Self::Unary(_, expr) => expr.contains_variable(name),
            Self::Binary(_, left, right) => {
                left.contains_variable(name) || right.contains_variable(name)
            }
            Self::Function(_, args) => args.iter().any(|a| a.contains_variable(name)),
            Self::Piecewise(pw) => {
                pw.variable == name || pw.branches.iter().any(|b| b.expr.contains_variable(name))
            }
        }
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}

            Self::Variable(name) => {
                vars.push(name.clone());
            }

            Self::Unary(_, expr) => {
                expr.collect_variables(vars);
            }

            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }

            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }

            Self::Piecewise(pw) => {
                vars.push(pw.variable.clone());
                for branch in &pw.branches {
                    branch.expr.collect_variables(vars);
                }
            }
        }
    }

    /// Turn `piecewise(...)` calls produced by the parser into [`Expression::Piecewise`] nodes.
    fn resolve_piecewise(self) -> ExprResult<Self> {
        match self {
            Self::Number(_) | Self::Variable(_) => Ok(self),
            Self::Unary(op, expr) => Ok(Self::Unary(op, Box::new(expr.resolve_piecewise()?))),
            Self::Binary(op, left, right) => Ok(Self::Binary(
                op,
                Box::new(left.resolve_piecewise()?),
                Box::new(right.resolve_piecewise()?),
            )),
            Self::Function(name, args) => {
                let args = args
                    .into_iter()
                    .map(Self::resolve_piecewise)
                    .collect::<ExprResult<Vec<_>>>()?;
                if name.eq_ignore_ascii_case("piecewise") {
                    piecewise_from_args(args).map(Self::Piecewise)
                } else {
                    Ok(Self::Function(name, args))
                }
            }
            Self::Piecewise(_) => Ok(self),
        }
    }
}

fn breakpoint(expr: &Expression) -> Option<f64> {
    match expr {
        Expression::Number(n) => Some(*n),
        Expression::Unary(UnaryOp::Neg, inner) => breakpoint(inner).map(|n| -n),
        _ => None,
    }
}

fn piecewise_from_args(args: Vec<Expression>) -> ExprResult<Piecewise> {
    let invalid = |message: &str| ExpressionError::ParseError {
        message: format!("piecewise(): {}", message),
    };
    if args.len() < 4 || args.len() % 2 != 0 {
        return Err(invalid(
            "expected a variable followed by alternating breakpoints and expressions",
        ));
    }
    let mut iter = args.into_iter();
    let variable = match iter.next() {
        Some(Expression::Variable(name)) => name,
        _ => return Err(invalid("first argument must be a variable")),
    };
    let rest: Vec<Expression> = iter.collect();
    let mut lower = breakpoint(&rest[0]).ok_or_else(|| invalid("breakpoints must be numbers"))?;
    let mut branches = Vec::with_capacity(rest.len() / 2);
    for chunk in rest[1..].chunks(2) {
        let upper = breakpoint(&chunk[1]).ok_or_else(|| invalid("breakpoints must be numbers"))?;
        if upper <= lower {
            return Err(invalid("breakpoints must be strictly increasing"));
        }
        branches.push(PiecewiseBranch {
            lower,
            upper,
            expr: chunk[0].clone(),
        });
        lower = upper;
    }
    Ok(Piecewise { variable, branches })
}

// Display

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

impl Expression {
    fn precedence(&self) -> u8 {
        match self {
            Self::Number(n) if *n < 0.0 => PREC_UNARY,
            Self::Number(_) | Self::Variable(_) | Self::Function(..) | Self::Piecewise(_) => {
                PREC_ATOM
            }
            Self::Unary(..) => PREC_UNARY,
            Self::Binary(BinaryOp::Add | BinaryOp::Sub, ..) => PREC_ADD,
            Self::Binary(BinaryOp::Mul | BinaryOp::Div, ..) => PREC_MUL,
            Self::Binary(BinaryOp::Pow, ..) => PREC_POW,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Variable(name) => write!(f, "{}", name),
            Self::Unary(UnaryOp::Neg, expr) => {
                write!(f, "-")?;
                expr.fmt_child(f, PREC_POW)
            }
            Self::Binary(op, left, right) => {
                let (symbol, prec) = match op {
                    BinaryOp::Add => (" + ", PREC_ADD),
                    BinaryOp::Sub => (" - ", PREC_ADD),
                    BinaryOp::Mul => ("*", PREC_MUL),
                    BinaryOp::Div => ("/", PREC_MUL),
                    BinaryOp::Pow => ("^", PREC_POW),
                };
                match op {
                    // right associative
                    BinaryOp::Pow => {
                        left.fmt_child(f, PREC_POW + 1)?;
                        write!(f, "{}", symbol)?;
                        right.fmt_child(f, PREC_POW)
                    }
                    BinaryOp::Add | BinaryOp::Mul => {
                        left.fmt_child(f, prec)?;
                        write!(f, "{}", symbol)?;
                        right.fmt_child(f, prec + 1)
                    }
                    BinaryOp::Sub | BinaryOp::Div => {
                        left.fmt_child(f, prec)?;
                        write!(f, "{}", symbol)?;
                        right.fmt_child(f, prec + 1)
                    }
                }
            }
            Self::Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Self::Piecewise(pw) => {
                write!(f, "piecewise({}", pw.variable)?;
                for (i, branch) in pw.branches.iter().enumerate() {
                    if i == 0 {
                        write!(f, ", {}", branch.lower)?;
                    }
                    write!(f, ", {}, {}", branch.expr, branch.upper)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Expression::Number(n)),
            Raw::Text(s) => Expression::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

impl std::str::FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

// Parser functions using nom

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    let mut parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));

    let (input, matched) = parser.parse(input)?;
    Ok((input, matched.to_string()))
}

/// Parse a comma-separated list of expressions (for function arguments)
fn args_list(input: &str) -> IResult<&str, Vec<Expression>> {
    let (input, first) = expr_parser(input)?;
    let mut res = vec![first];

    let mut remainder = input;
    loop {
        let mut comma_parser = delimited(
            multispace0::<&str, nom::error::Error<&str>>,
            char::<&str, nom::error::Error<&str>>(','),
            multispace0::<&str, nom::error::Error<&str>>,
        );

        match comma_parser.parse(remainder) {
            Ok((after_comma, _)) => match expr_parser(after_comma) {
                Ok((after_expr, expr)) => {
                    res.push(expr);
                    remainder = after_expr;
                }
                Err(_) => break,
            },
            Err(_) => break,
        }
    }

    Ok((remainder, res))
}

/// Parse a function call
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char::<&str, nom::error::Error<&str>>('(').parse(input)?;
    let (input, _) = multispace0.parse(input)?;

    if let Ok((input, _)) = char::<&str, nom::error::Error<&str>>(')').parse(input) {
        return Ok((input, Expression::Function(name, vec![])));
    }

    let (input, args) = args_list(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char::<&str, nom::error::Error<&str>>(')').parse(input)?;

    Ok((input, Expression::Function(name, args)))
}

/// Parse an unsigned number
fn number(input: &str) -> IResult<&str, Expression> {
    // Signs are handled by `unary` so that `T-1` is a subtraction.
    if !input.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    let (input, num) = double(input)?;
    Ok((input, Expression::Number(num)))
}

/// Parse a variable reference
fn variable(input: &str) -> IResult<&str, Expression> {
    let (input, var_name) = identifier(input)?;
    Ok((input, Expression::Variable(var_name)))
}

/// Parse a parenthesized expression
fn parens(input: &str) -> IResult<&str, Expression> {
    let (input, _) = char('(').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, expr) = expr_parser(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = char::<_, nom::error::Error<_>>(')').parse(input)?;
    Ok((input, expr))
}

/// Parse a primary expression (number, variable, function call, or parenthesized expression)
fn primary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0.parse(input)?;

    if let Ok(result) = number(input) {
        return Ok(result);
    }

    if let Ok(result) = function_call(input) {
        return Ok(result);
    }

    if let Ok(result) = variable(input) {
        return Ok(result);
    }

    parens(input)
}

/// Parse a power expression (`a ^ b` or `a ** b`, right associative)
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;
    let (after_space, _) = multispace0.parse(input)?;

    let mut op_parser = alt((
        tag::<_, _, nom::error::Error<_>>("**"),
        tag::<_, _, nom::error::Error<_>>("^"),
    ));
    match op_parser.parse(after_space) {
        Ok((after_op, _)) => {
            // The exponent may carry its own sign, e.g. `T**-1`.
            let (after_exp, exponent) = unary(after_op)?;
            Ok((
                after_exp,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
            ))
        }
        Err(_) => Ok((input, base)),
    }
}

/// Parse a unary expression (-expr); binds looser than powers so `-T^2` is `-(T^2)`
fn unary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0.parse(input)?;

    let mut neg_parser = preceded(char('-'), unary);
    match neg_parser.parse(input) {
        Ok((remaining, expr)) => Ok((remaining, Expression::Unary(UnaryOp::Neg, Box::new(expr)))),
        Err(_) => {
            let mut plus_parser = preceded(char('+'), unary);
            match plus_parser.parse(input) {
                Ok(result) => Ok(result),
                Err(_) => power(input),
            }
        }
    }
}

/// Parse a multiplicative expression (left associative)
fn term(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut left) = unary(input)?;

    loop {
        let (after_space, _) = multispace0.parse(input)?;
        // `**` is consumed by `power`, so a lone `*` here is always a product.
        let op = if after_space.starts_with("**") {
            None
        } else if let Some(rest) = after_space.strip_prefix('*') {
            Some((BinaryOp::Mul, rest))
        } else if let Some(rest) = after_space.strip_prefix('/') {
            Some((BinaryOp::Div, rest))
        } else {
            None
        };

        let Some((op, rest)) = op else {
            return Ok((input, left));
        };
        let (remaining, right) = unary(rest)?;
        left = Expression::Binary(op, Box::new(left), Box::new(right));
        input = remaining;
    }
}

/// Parse an additive expression (left associative)
fn expr_parser(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0.parse(input)?;
    let (mut input, mut left) = term(input)?;

    loop {
        let (after_space, _) = multispace0.parse(input)?;
        let op = if let Some(rest) = after_space.strip_prefix('+') {
            Some((BinaryOp::Add, rest))
        } else if let Some(rest) = after_space.strip_prefix('-') {
            Some((BinaryOp::Sub, rest))
        } else {
            None
        };

        let Some((op, rest)) = op else {
            return Ok((input, left));
        };
        let (remaining, right) = term(rest)?;
        left = Expression::Binary(op, Box::new(left), Box::new(right));
        input = remaining;
    }
}
