//! Graphite target parser
//!
//! Parses the subset of the target grammar the evaluator needs into the
//! expression tree.
//!
//! # Supported Syntax
//!
//! ```text
//! # Metric patterns (globs, character classes, brace alternation)
//! servers.web*.cpu.{user,system}
//!
//! # Calls with positional and named arguments
//! summarize(servers.*.requests, '1h', 'sum', alignToFrom=true)
//!
//! # Nested calls and literals
//! groupByNode(ewma(servers.*.cpu, 0.5), 1, 'sumSeries')
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0, satisfy},
    combinator::{cut, map, not, peek, recognize, value},
    multi::{many1, separated_list0},
    number::complete::double,
    sequence::{delimited, terminated},
    IResult, Parser,
};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::query::ast::{CallExpr, Expr, MetricExpr};

// ============================================================================
// Entry Point
// ============================================================================

/// Parse a target string into an expression tree
pub fn parse_target(text: &str) -> Result<Expr> {
    let parsed: IResult<&str, Expr> = delimited(multispace0, expr, multispace0).parse(text);
    match parsed {
        Ok((rest, mut tree)) => {
            if !rest.is_empty() {
                return Err(Error::Parse {
                    position: text.len() - rest.len(),
                    message: format!("unexpected trailing input '{}'", rest),
                });
            }
            resolve_positions(&mut tree, text.len());
            Ok(tree)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::Parse {
            position: text.len() - e.input.len(),
            message: format!("unexpected input ({:?})", e.code),
        }),
        Err(nom::Err::Incomplete(_)) => Err(Error::Parse {
            position: text.len(),
            message: "incomplete input".to_string(),
        }),
    }
}

/// Nodes record the remaining input length while parsing; turn that into a
/// byte offset from the start of the source.
fn resolve_positions(expr: &mut Expr, source_len: usize) {
    match expr {
        Expr::Metric(m) => m.position = source_len - m.position,
        Expr::Call(c) => {
            c.position = source_len - c.position;
            for arg in c.args.iter_mut().chain(c.named_args.values_mut()) {
                resolve_positions(arg, source_len);
            }
        },
        _ => {},
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn expr(input: &str) -> IResult<&str, Expr> {
    alt((call, boolean, number, string, metric)).parse(input)
}

/// Characters allowed in a metric pattern outside of brace groups
///
/// Path segments, globs (`*`, `?`, `[...]`) and the punctuation found in
/// real metric names. Comparison and shell operators are not part of a path.
pub(crate) fn is_metric_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(c, '.' | '_' | '-' | '*' | '?' | '[' | ']' | ':' | '~' | '^' | '$' | '#' | '%' | '@')
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize((
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

// ============================================================================
// Calls
// ============================================================================

enum Argument {
    Positional(Expr),
    Named(String, Expr),
}

/// Parse a call like `summarize(a.b, '1h', alignToFrom=true)`
fn call(input: &str) -> IResult<&str, Expr> {
    let remaining_at_start = input.len();
    let (input, name) = identifier(input)?;
    let (args_start, _) = (multispace0, char('(')).parse(input)?;

    // Past the opening parenthesis this can only be a call
    let (input, _) = multispace0(args_start)?;
    let (input, arguments) = cut(separated_list0(
        (multispace0, char(','), multispace0),
        argument,
    ))
    .parse(input)?;
    let (rest, _) = cut((multispace0, char(')'))).parse(input)?;

    let consumed = args_start.len() - rest.len();
    let raw_args = args_start[..consumed - 1].trim().to_string();

    let mut args = Vec::new();
    let mut named_args = BTreeMap::new();
    for argument in arguments {
        match argument {
            Argument::Positional(e) => args.push(e),
            Argument::Named(k, v) => {
                named_args.insert(k, v);
            },
        }
    }

    Ok((
        rest,
        Expr::Call(CallExpr {
            name: name.to_string(),
            args,
            named_args,
            raw_args,
            position: remaining_at_start,
        }),
    ))
}

fn argument(input: &str) -> IResult<&str, Argument> {
    alt((named_argument, map(expr, Argument::Positional))).parse(input)
}

fn named_argument(input: &str) -> IResult<&str, Argument> {
    let (input, name) = identifier(input)?;
    let (input, _) = (multispace0, char('='), multispace0).parse(input)?;
    let (input, value) = expr(input)?;
    Ok((input, Argument::Named(name.to_string(), value)))
}

// ============================================================================
// Literals
// ============================================================================

fn boolean(input: &str) -> IResult<&str, Expr> {
    let (input, b) = terminated(
        alt((
            value(true, tag_no_case("true")),
            value(false, tag_no_case("false")),
        )),
        not(satisfy(is_metric_char)),
    )
    .parse(input)?;
    Ok((input, Expr::Bool(b)))
}

/// Numbers must not run into metric characters, so `1.foo` stays a metric
fn number(input: &str) -> IResult<&str, Expr> {
    let (input, _) = peek(satisfy(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))).parse(input)?;
    let (input, v) = terminated(double, not(satisfy(is_metric_char))).parse(input)?;
    Ok((input, Expr::Const(v)))
}

fn string(input: &str) -> IResult<&str, Expr> {
    let (input, s) = alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))
    .parse(input)?;
    Ok((input, Expr::Str(s.to_string())))
}

// ============================================================================
// Metric Patterns
// ============================================================================

/// Brace alternation `{a,b}`; commas inside do not split arguments
fn brace_group(input: &str) -> IResult<&str, &str> {
    recognize((char('{'), take_while(|c| c != '}' && c != '('), char('}'))).parse(input)
}

fn metric(input: &str) -> IResult<&str, Expr> {
    let remaining_at_start = input.len();
    let (input, name) = recognize(many1(alt((take_while1(is_metric_char), brace_group)))).parse(input)?;
    Ok((
        input,
        Expr::Metric(MetricExpr {
            name: name.to_string(),
            position: remaining_at_start,
        }),
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn as_call(e: Expr) -> CallExpr {
        match e {
            Expr::Call(c) => c,
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_metric() {
        let e = parse_target("servers.web01.cpu").unwrap();
        assert_eq!(e, Expr::metric("servers.web01.cpu"));
    }

    #[test]
    fn test_parse_glob_and_braces() {
        let e = parse_target("servers.web*.cpu.{user,system}").unwrap();
        assert_eq!(e, Expr::metric("servers.web*.cpu.{user,system}"));
    }

    #[test]
    fn test_parse_call_with_literals() {
        let c = as_call(parse_target("summarize(a.b, '1h', \"max\", true)").unwrap());
        assert_eq!(c.name, "summarize");
        assert_eq!(c.args.len(), 4);
        assert_eq!(c.args[1], Expr::Str("1h".to_string()));
        assert_eq!(c.args[2], Expr::Str("max".to_string()));
        assert_eq!(c.args[3], Expr::Bool(true));
        assert_eq!(c.raw_args, "a.b, '1h', \"max\", true");
    }

    #[test]
    fn test_parse_named_argument() {
        let c = as_call(parse_target("summarize(a.b,'5min',alignToFrom=True)").unwrap());
        assert_eq!(c.args.len(), 2);
        assert_eq!(c.named_args.get("alignToFrom"), Some(&Expr::Bool(true)));
    }

    #[test]
    fn test_parse_numbers_vs_metrics() {
        let c = as_call(parse_target("f(1, -2.5, 1e3, 1.foo, 10abc)").unwrap());
        assert_eq!(c.args[0], Expr::Const(1.0));
        assert_eq!(c.args[1], Expr::Const(-2.5));
        assert_eq!(c.args[2], Expr::Const(1000.0));
        assert!(matches!(&c.args[3], Expr::Metric(m) if m.name == "1.foo"));
        assert!(matches!(&c.args[4], Expr::Metric(m) if m.name == "10abc"));
    }

    #[test]
    fn test_parse_boolean_prefix_is_metric() {
        let c = as_call(parse_target("f(true.counts, false)").unwrap());
        assert!(matches!(&c.args[0], Expr::Metric(m) if m.name == "true.counts"));
        assert_eq!(c.args[1], Expr::Bool(false));
    }

    #[test]
    fn test_parse_nested_calls_positions() {
        let c = as_call(parse_target("sumSeries(ewma(a.*, 0.5), b)").unwrap());
        assert_eq!(c.position, 0);
        let inner = as_call(c.args[0].clone());
        assert_eq!(inner.name, "ewma");
        assert_eq!(inner.position, 10);
        assert_eq!(inner.raw_args, "a.*, 0.5");
        assert_eq!(c.args[1].position(), 26);
    }

    #[test]
    fn test_parse_empty_argument_list() {
        let c = as_call(parse_target("f()").unwrap());
        assert!(c.args.is_empty());
        assert_eq!(c.raw_args, "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_target(""), Err(Error::Parse { .. })));
        assert!(matches!(parse_target("sum(a,"), Err(Error::Parse { .. })));
        assert!(matches!(parse_target("sum(a))"), Err(Error::Parse { position: 6, .. })));
        assert!(matches!(parse_target("f('unterminated)"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_operators_are_not_metric_chars() {
        for c in ['<', '>', '&', '!'] {
            assert!(!is_metric_char(c));
        }
        assert!(matches!(parse_target("a<b"), Err(Error::Parse { position: 1, .. })));
        assert!(matches!(parse_target("a.b&c"), Err(Error::Parse { position: 3, .. })));
    }
}
