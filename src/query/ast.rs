//! Expression tree for Graphite targets
//!
//! Nodes are produced by a parser and read-only afterwards. Function
//! implementations coerce their arguments through the typed accessors on
//! [`CallExpr`], which report failures as [`ArgumentError`]s naming the
//! offending argument.

use crate::error::{ArgType, ArgumentError, ArgumentProblem, Error, Result};
use crate::query::parser::interval::parse_interval;
use std::collections::BTreeMap;
use std::fmt;

/// A node of a target expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Metric pattern leaf, resolved from the fetched index
    Metric(MetricExpr),
    /// Function call
    Call(CallExpr),
    /// Numeric literal
    Const(f64),
    /// Quoted string literal
    Str(String),
    /// Boolean literal
    Bool(bool),
}

/// Metric pattern leaf
#[derive(Debug, Clone, PartialEq)]
pub struct MetricExpr {
    /// Pattern text, e.g. `servers.*.cpu`
    pub name: String,
    /// Byte offset in the source text
    pub position: usize,
}

/// Function call node
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// Function name as written
    pub name: String,
    /// Positional arguments in declared order
    pub args: Vec<Expr>,
    /// `name=value` arguments
    pub named_args: BTreeMap<String, Expr>,
    /// Argument text between the parentheses, as written
    pub raw_args: String,
    /// Byte offset in the source text
    pub position: usize,
}

impl Expr {
    /// Build a metric leaf
    pub fn metric(name: impl Into<String>) -> Self {
        Expr::Metric(MetricExpr {
            name: name.into(),
            position: 0,
        })
    }

    /// Byte offset of this node, 0 for literals
    pub fn position(&self) -> usize {
        match self {
            Expr::Metric(m) => m.position,
            Expr::Call(c) => c.position,
            _ => 0,
        }
    }

    /// Whether the node can produce series
    pub fn is_series(&self) -> bool {
        matches!(self, Expr::Metric(_) | Expr::Call(_))
    }

    /// Copy of this tree with every metric leaf named `from` renamed to `to`
    ///
    /// Raw argument text is rewritten as well so canonical renderings of the
    /// new tree mention `to`.
    pub fn substitute_metric(&self, from: &str, to: &str) -> Expr {
        match self {
            Expr::Metric(m) if m.name == from => Expr::Metric(MetricExpr {
                name: to.to_string(),
                position: m.position,
            }),
            Expr::Call(c) => Expr::Call(CallExpr {
                name: c.name.clone(),
                args: c.args.iter().map(|a| a.substitute_metric(from, to)).collect(),
                named_args: c
                    .named_args
                    .iter()
                    .map(|(k, v)| (k.clone(), v.substitute_metric(from, to)))
                    .collect(),
                raw_args: c.raw_args.replace(from, to),
                position: c.position,
            }),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Metric(m) => write!(f, "{}", m.name),
            Expr::Call(c) => write!(f, "{}({})", c.name, c.raw_args),
            Expr::Const(v) => write!(f, "{}", v),
            Expr::Str(s) => write!(f, "'{}'", s),
            Expr::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl CallExpr {
    /// Canonical rendering of this call under `target`, e.g. `averageSeries(a,b)`
    pub fn render_as(&self, target: &str) -> String {
        format!("{}({})", target, self.raw_args)
    }

    fn arg_error(&self, index: usize, name: &str, expected: ArgType, problem: ArgumentProblem) -> Error {
        Error::Argument(ArgumentError {
            function: self.name.clone(),
            index,
            name: name.to_string(),
            expected,
            problem,
        })
    }

    /// Positional argument that must be present
    pub fn arg(&self, index: usize, name: &str, expected: ArgType) -> Result<&Expr> {
        self.args
            .get(index)
            .ok_or_else(|| self.arg_error(index, name, expected, ArgumentProblem::Missing))
    }

    /// Whether `name` was given by name or position `index` exists
    pub fn has_arg(&self, name: &str, index: usize) -> bool {
        self.named_args.contains_key(name) || self.args.len() > index
    }

    fn named_or_pos(&self, name: &str, index: usize) -> Option<&Expr> {
        self.named_args.get(name).or_else(|| self.args.get(index))
    }

    /// Series-producing argument at `index`
    pub fn series_arg(&self, index: usize, name: &str) -> Result<&Expr> {
        let arg = self.arg(index, name, ArgType::SeriesList)?;
        if !arg.is_series() {
            return Err(self.arg_error(index, name, ArgType::SeriesList, ArgumentProblem::TypeMismatch));
        }
        Ok(arg)
    }

    /// Float literal at `index`
    pub fn float_arg(&self, index: usize, name: &str) -> Result<f64> {
        match self.arg(index, name, ArgType::Float)? {
            Expr::Const(v) => Ok(*v),
            _ => Err(self.arg_error(index, name, ArgType::Float, ArgumentProblem::TypeMismatch)),
        }
    }

    fn to_int(&self, expr: &Expr, index: usize, name: &str) -> Result<i64> {
        match expr {
            Expr::Const(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
            Expr::Const(v) => Err(self.arg_error(
                index,
                name,
                ArgType::Int,
                ArgumentProblem::Invalid(format!("{} is not an integer", v)),
            )),
            _ => Err(self.arg_error(index, name, ArgType::Int, ArgumentProblem::TypeMismatch)),
        }
    }

    /// Integer literal at `index`
    pub fn int_arg(&self, index: usize, name: &str) -> Result<i64> {
        let arg = self.arg(index, name, ArgType::Int)?;
        self.to_int(arg, index, name)
    }

    /// One or more integer literals starting at `index` (variadic parameter)
    pub fn int_args_from(&self, index: usize, name: &str) -> Result<Vec<i64>> {
        self.arg(index, name, ArgType::Int)?;
        self.args[index..]
            .iter()
            .enumerate()
            .map(|(offset, arg)| self.to_int(arg, index + offset, name))
            .collect()
    }

    /// String literal at `index`
    pub fn string_arg(&self, index: usize, name: &str) -> Result<String> {
        match self.arg(index, name, ArgType::String)? {
            Expr::Str(s) => Ok(s.clone()),
            _ => Err(self.arg_error(index, name, ArgType::String, ArgumentProblem::TypeMismatch)),
        }
    }

    /// Interval string at `index` converted to seconds
    ///
    /// `default_sign` applies when the string carries no explicit sign.
    pub fn interval_arg(&self, index: usize, name: &str, default_sign: i64) -> Result<i64> {
        let text = match self.arg(index, name, ArgType::Interval)? {
            Expr::Str(s) => s,
            _ => {
                return Err(self.arg_error(index, name, ArgType::Interval, ArgumentProblem::TypeMismatch))
            },
        };
        parse_interval(text, default_sign).map_err(|msg| {
            self.arg_error(index, name, ArgType::Interval, ArgumentProblem::Invalid(msg))
        })
    }

    /// Raw text of the string literal at `index`, as used in canonical names
    pub fn string_value(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(Expr::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String given by name or position, falling back to `default`
    pub fn string_named_or_pos_arg(&self, name: &str, index: usize, default: &str) -> Result<String> {
        match self.named_or_pos(name, index) {
            None => Ok(default.to_string()),
            Some(Expr::Str(s)) => Ok(s.clone()),
            Some(_) => Err(self.arg_error(index, name, ArgType::String, ArgumentProblem::TypeMismatch)),
        }
    }

    /// Boolean given by name or position, falling back to `default`
    pub fn bool_named_or_pos_arg(&self, name: &str, index: usize, default: bool) -> Result<bool> {
        match self.named_or_pos(name, index) {
            None => Ok(default),
            Some(Expr::Bool(b)) => Ok(*b),
            Some(_) => Err(self.arg_error(index, name, ArgType::Bool, ArgumentProblem::TypeMismatch)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_target;

    fn call(text: &str) -> CallExpr {
        match parse_target(text).unwrap() {
            Expr::Call(c) => c,
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let c = call("summarize(a.b, '1h', 'max', true)");
        assert!(c.series_arg(0, "seriesList").is_ok());
        assert_eq!(c.interval_arg(1, "intervalString", 1).unwrap(), 3600);
        assert_eq!(c.string_named_or_pos_arg("func", 2, "sum").unwrap(), "max");
        assert!(c.bool_named_or_pos_arg("alignToFrom", 3, false).unwrap());
    }

    #[test]
    fn test_named_args_take_precedence() {
        let c = call("summarize(a.b, '5min', alignToFrom=true)");
        assert!(c.bool_named_or_pos_arg("alignToFrom", 3, false).unwrap());
        assert_eq!(c.string_named_or_pos_arg("func", 2, "sum").unwrap(), "sum");
        assert!(!c.has_arg("func", 2));
        assert!(c.has_arg("alignToFrom", 3));
    }

    #[test]
    fn test_type_mismatch_names_argument() {
        let c = call("ewma(a.b, 'fast')");
        let err = c.float_arg(1, "alpha").unwrap_err();
        match err {
            Error::Argument(e) => {
                assert_eq!(e.function, "ewma");
                assert_eq!(e.index, 1);
                assert_eq!(e.name, "alpha");
                assert_eq!(e.expected, ArgType::Float);
                assert_eq!(e.problem, ArgumentProblem::TypeMismatch);
            },
            other => panic!("Expected argument error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_argument() {
        let c = call("ewma(a.b)");
        match c.float_arg(1, "alpha").unwrap_err() {
            Error::Argument(e) => assert_eq!(e.problem, ArgumentProblem::Missing),
            other => panic!("Expected argument error, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_is_not_a_series() {
        let c = call("averageSeries(1)");
        assert!(c.series_arg(0, "seriesLists").is_err());
    }

    #[test]
    fn test_int_args_from() {
        let c = call("groupByNodes(a.b.c, 'sum', 0, 2)");
        assert_eq!(c.int_args_from(2, "nodes").unwrap(), vec![0, 2]);
        let bad = call("groupByNodes(a.b.c, 'sum', 0, 1.5)");
        assert!(bad.int_args_from(2, "nodes").is_err());
    }

    #[test]
    fn test_substitute_metric_rewrites_raw_args() {
        let e = parse_target("sumSeries(__group__)").unwrap();
        let s = e.substitute_metric("__group__", "1");
        match s {
            Expr::Call(c) => {
                assert_eq!(c.raw_args, "1");
                assert!(matches!(&c.args[0], Expr::Metric(m) if m.name == "1"));
            },
            other => panic!("Expected call, got {:?}", other),
        }
        // original untouched
        assert_eq!(e.to_string(), "sumSeries(__group__)");
    }
}
