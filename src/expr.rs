//! The expression language commands evaluate against a fixture.
//!
//! The grammar is deliberately tiny: variables, integer and quoted string
//! literals, method calls, `target = expr` assignment, and the
//! `row : collection` form used by row verification. Anything richer lives in
//! fixture methods.

use crate::fixture::{Fixture, FixtureError};
use crate::value::Value;
use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use thiserror::Error;

/// An evaluation or execution exception. Caught by the per-command fault
/// barrier and rendered onto the document; never fatal.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("malformed expression {0:?}")]
    Syntax(String),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error("expression {0:?} did not produce a collection")]
    NotACollection(String),

    #[error("expression {0:?} names no row variable")]
    NoRowVariable(String),

    #[error("table command is not bound to a header column")]
    NoColumn,

    #[error("table row has no cell at column {column}")]
    MissingCell { column: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(String),
    Literal(Value),
    Call { name: String, args: Vec<Expr> },
    Assign { target: String, value: Box<Expr> },
    Loop { var: String, source: Box<Expr> },
}

/// The purely syntactic decomposition consumed by `set` and `verifyRows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decomposed<'a> {
    pub variable_name: Option<&'a str>,
    pub function_name: Option<&'a str>,
}

impl Expr {
    pub fn decompose(&self) -> Decomposed<'_> {
        match self {
            Expr::Var(name) => Decomposed {
                variable_name: Some(name),
                function_name: None,
            },
            Expr::Literal(_) => Decomposed {
                variable_name: None,
                function_name: None,
            },
            Expr::Call { name, .. } => Decomposed {
                variable_name: None,
                function_name: Some(name),
            },
            Expr::Assign { target, value } => Decomposed {
                variable_name: Some(target),
                function_name: value.decompose().function_name,
            },
            Expr::Loop { var, source } => Decomposed {
                variable_name: Some(var),
                function_name: source.decompose().function_name,
            },
        }
    }
}

/// Parse an expression string. Fails with [`EvalError::Syntax`] when the
/// input has trailing garbage or is not part of the grammar.
pub fn parse(expression: &str) -> Result<Expr, EvalError> {
    match all_consuming(expression_tree)(expression) {
        Ok((_, expr)) => Ok(expr),
        Err(_) => Err(EvalError::Syntax(expression.to_owned())),
    }
}

/// Evaluate an expression against a fixture. Variables read through
/// [`Fixture::get`] (absent means [`Value::Null`]), calls dispatch to
/// [`Fixture::call`], and assignment writes through [`Fixture::set`].
pub fn evaluate(fixture: &mut dyn Fixture, expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Var(name) => Ok(fixture.get(name).unwrap_or(Value::Null)),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(fixture, arg)?);
            }
            Ok(fixture.call(name, &values)?)
        }
        Expr::Assign { target, value } => {
            let value = evaluate(fixture, value)?;
            fixture.set(target, value.clone());
            Ok(value)
        }
        Expr::Loop { source, .. } => evaluate(fixture, source),
    }
}

fn expression_tree(input: &str) -> IResult<&str, Expr> {
    delimited(
        multispace0,
        alt((loop_expr, assign_expr, simple_expr)),
        multispace0,
    )(input)
}

// `row : collection`
fn loop_expr(input: &str) -> IResult<&str, Expr> {
    let (input, var) = identifier(input)?;
    let (input, _) = delimited(multispace0, char(':'), multispace0)(input)?;
    let (input, source) = simple_expr(input)?;
    Ok((
        input,
        Expr::Loop {
            var: var.to_owned(),
            source: Box::new(source),
        },
    ))
}

// `target = expr`
fn assign_expr(input: &str) -> IResult<&str, Expr> {
    let (input, target) = identifier(input)?;
    let (input, _) = delimited(multispace0, char('='), multispace0)(input)?;
    let (input, value) = simple_expr(input)?;
    Ok((
        input,
        Expr::Assign {
            target: target.to_owned(),
            value: Box::new(value),
        },
    ))
}

fn simple_expr(input: &str) -> IResult<&str, Expr> {
    alt((call_expr, literal_expr, var_expr))(input)
}

fn call_expr(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = preceded(multispace0, char('('))(input)?;
    let (input, args) = separated_list0(char(','), expression_tree)(input)?;
    let (input, _) = preceded(multispace0, char(')'))(input)?;
    Ok((
        input,
        Expr::Call {
            name: name.to_owned(),
            args,
        },
    ))
}

fn var_expr(input: &str) -> IResult<&str, Expr> {
    map(identifier, |name: &str| Expr::Var(name.to_owned()))(input)
}

fn literal_expr(input: &str) -> IResult<&str, Expr> {
    alt((string_literal, int_literal))(input)
}

fn int_literal(input: &str) -> IResult<&str, Expr> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>().map(|i| Expr::Literal(Value::Int(i)))
    })(input)
}

fn string_literal(input: &str) -> IResult<&str, Expr> {
    let double = delimited(char('"'), take_while(|c| c != '"'), char('"'));
    let single = delimited(char('\''), take_while(|c| c != '\''), char('\''));
    map(alt((double, single)), |s: &str| {
        Expr::Literal(Value::Str(s.to_owned()))
    })(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MapFixture;
    use cool_asserts::assert_matches;

    #[test]
    fn parsing_variables_and_literals() {
        assert_matches!(parse("greeting"), Ok(Expr::Var(name)) => assert_eq!(name, "greeting"));
        assert_matches!(parse(" spaced "), Ok(Expr::Var(_)));
        assert_matches!(parse("42"), Ok(Expr::Literal(Value::Int(42))));
        assert_matches!(parse("-7"), Ok(Expr::Literal(Value::Int(-7))));
        assert_matches!(
            parse("'hi'"),
            Ok(Expr::Literal(Value::Str(s))) => assert_eq!(s, "hi")
        );
    }

    #[test]
    fn parsing_calls_and_assignments() {
        assert_matches!(parse("greet(name)"), Ok(Expr::Call { name, args }) => {
            assert_eq!(name, "greet");
            assert_eq!(args.len(), 1);
        });
        assert_matches!(parse("u = upper(TEXT)"), Ok(Expr::Assign { target, value }) => {
            assert_eq!(target, "u");
            assert_matches!(*value, Expr::Call { .. });
        });
        assert_matches!(parse("user : getUsers()"), Ok(Expr::Loop { var, source }) => {
            assert_eq!(var, "user");
            assert_matches!(*source, Expr::Call { .. });
        });
        assert_matches!(parse("pair('a', 1)"), Ok(Expr::Call { args, .. }) => {
            assert_eq!(args.len(), 2);
        });
    }

    #[test]
    fn rejecting_garbage() {
        assert_matches!(parse("1 +"), Err(EvalError::Syntax(_)));
        assert_matches!(parse("f(unclosed"), Err(EvalError::Syntax(_)));
        assert_matches!(parse(""), Err(EvalError::Syntax(_)));
    }

    #[test]
    fn decomposition() {
        let expr = parse("u = upper(TEXT)").unwrap();
        let d = expr.decompose();
        assert_eq!(d.variable_name, Some("u"));
        assert_eq!(d.function_name, Some("upper"));

        let expr = parse("username").unwrap();
        let d = expr.decompose();
        assert_eq!(d.variable_name, Some("username"));
        assert_eq!(d.function_name, None);

        let expr = parse("user : getUsers()").unwrap();
        let d = expr.decompose();
        assert_eq!(d.variable_name, Some("user"));
        assert_eq!(d.function_name, Some("getUsers"));
    }

    #[test]
    fn evaluating_against_a_fixture() {
        let mut fixture = MapFixture::new()
            .var("name", "alice")
            .method("greet", |args| match args {
                [Value::Str(name)] => Ok(Value::Str(format!("Hi {name}"))),
                _ => Err(FixtureError::new("greet takes one string")),
            });

        let expr = parse("greeting = greet(name)").unwrap();
        let value = evaluate(&mut fixture, &expr).unwrap();
        assert_eq!(value, Value::from("Hi alice"));
        assert_eq!(fixture.get("greeting"), Some(Value::from("Hi alice")));
    }

    #[test]
    fn absent_variables_evaluate_to_null() {
        let mut fixture = MapFixture::new();
        let expr = parse("missing").unwrap();
        assert_eq!(evaluate(&mut fixture, &expr).unwrap(), Value::Null);
    }

    #[test]
    fn fixture_errors_bubble_up() {
        let mut fixture = MapFixture::new();
        let expr = parse("boom()").unwrap();
        assert_matches!(evaluate(&mut fixture, &expr), Err(EvalError::Fixture(_)));
    }
}
