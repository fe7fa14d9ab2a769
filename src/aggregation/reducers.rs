//! Reducers and comparison operators
//!
//! A reducer folds the present values of a point set (one timestamp across
//! many series, one bucket of a single series, or a whole series) to one
//! value. Callers strip absent points before reducing; a NaN result means
//! "no data" and is turned into an absent point by the caller.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// ============================================================================
// Reducer
// ============================================================================

/// Named fold over a set of present values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reducer {
    /// Sum of values
    Sum,
    /// Arithmetic mean
    Average,
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// Last value in input order
    Last,
    /// `max - min`
    Range,
    /// Product of values
    Multiply,
    /// Population standard deviation
    Stddev,
    /// Interpolated 50th percentile
    Median,
    /// First value minus every later value
    Diff,
    /// Number of values
    Count,
}

impl Reducer {
    /// Every reducer, in catalogue order
    pub const ALL: [Reducer; 11] = [
        Reducer::Average,
        Reducer::Count,
        Reducer::Diff,
        Reducer::Last,
        Reducer::Max,
        Reducer::Median,
        Reducer::Min,
        Reducer::Multiply,
        Reducer::Range,
        Reducer::Stddev,
        Reducer::Sum,
    ];

    /// Resolve a reducer name, accepting the usual Graphite aliases
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "sum" | "total" => Ok(Reducer::Sum),
            "avg" | "average" => Ok(Reducer::Average),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            "last" | "current" => Ok(Reducer::Last),
            "range" | "rangeOf" => Ok(Reducer::Range),
            "multiply" => Ok(Reducer::Multiply),
            "stddev" => Ok(Reducer::Stddev),
            "median" => Ok(Reducer::Median),
            "diff" => Ok(Reducer::Diff),
            "count" => Ok(Reducer::Count),
            other => Err(Error::UnsupportedReducer(other.to_string())),
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Average => "average",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Last => "last",
            Reducer::Range => "range",
            Reducer::Multiply => "multiply",
            Reducer::Stddev => "stddev",
            Reducer::Median => "median",
            Reducer::Diff => "diff",
            Reducer::Count => "count",
        }
    }

    /// Fold `values`; NaN when there is nothing to fold
    pub fn reduce(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }

        match self {
            Reducer::Sum => values.iter().sum(),
            Reducer::Average => values.iter().sum::<f64>() / values.len() as f64,
            Reducer::Min => fold_extreme(values, Ordering::Less),
            Reducer::Max => fold_extreme(values, Ordering::Greater),
            Reducer::Last => values[values.len() - 1],
            Reducer::Range => {
                fold_extreme(values, Ordering::Greater) - fold_extreme(values, Ordering::Less)
            },
            Reducer::Multiply => values.iter().product(),
            Reducer::Stddev => {
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                variance.sqrt()
            },
            Reducer::Median => percentile(values, 50.0),
            Reducer::Diff => values[0] - values[1..].iter().sum::<f64>(),
            Reducer::Count => values.len() as f64,
        }
    }
}

impl FromStr for Reducer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Reducer::from_name(s)
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strict fold keeping the value that orders `wanted` against the current
/// best; NaN never wins, so NaN-only input yields NaN
fn fold_extreme(values: &[f64], wanted: Ordering) -> f64 {
    values.iter().copied().fold(f64::NAN, |best, v| {
        if v.is_nan() {
            best
        } else if best.is_nan() || v.partial_cmp(&best) == Some(wanted) {
            v
        } else {
            best
        }
    })
}

/// Linearly interpolated percentile of `values` (NaNs ignored)
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

// ============================================================================
// Comparison
// ============================================================================

/// Threshold comparison used by series filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
}

impl Comparison {
    /// Every operator symbol accepted by [`Comparison::from_symbol`]
    pub const SYMBOLS: [&'static str; 6] = ["<", ">", "<=", ">=", "=", "!="];

    /// Resolve an operator symbol
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        match symbol {
            "<" => Ok(Comparison::Less),
            ">" => Ok(Comparison::Greater),
            "<=" => Ok(Comparison::LessOrEqual),
            ">=" => Ok(Comparison::GreaterOrEqual),
            "=" => Ok(Comparison::Equal),
            "!=" => Ok(Comparison::NotEqual),
            other => Err(Error::UnsupportedOperator(other.to_string())),
        }
    }

    /// Whether `value <op> threshold` holds; false whenever NaN is involved
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        if value.is_nan() || threshold.is_nan() {
            return false;
        }
        match self {
            Comparison::Less => value < threshold,
            Comparison::Greater => value > threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::Equal => value == threshold,
            Comparison::NotEqual => value != threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_nan() {
        for reducer in Reducer::ALL {
            assert!(reducer.reduce(&[]).is_nan(), "{} on empty input", reducer);
        }
    }

    #[test]
    fn test_basic_reducers() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(Reducer::Sum.reduce(&values), 10.0);
        assert_eq!(Reducer::Average.reduce(&values), 2.5);
        assert_eq!(Reducer::Min.reduce(&values), 1.0);
        assert_eq!(Reducer::Max.reduce(&values), 4.0);
        assert_eq!(Reducer::Last.reduce(&values), 2.0);
        assert_eq!(Reducer::Range.reduce(&values), 3.0);
        assert_eq!(Reducer::Multiply.reduce(&values), 24.0);
        assert_eq!(Reducer::Median.reduce(&values), 2.5);
        assert_eq!(Reducer::Diff.reduce(&values), -2.0);
        assert_eq!(Reducer::Count.reduce(&values), 4.0);
    }

    #[test]
    fn test_stddev_is_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((Reducer::Stddev.reduce(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_ignore_nan() {
        let values = [f64::NAN, 3.0, f64::NAN, -1.0];
        assert_eq!(Reducer::Min.reduce(&values), -1.0);
        assert_eq!(Reducer::Max.reduce(&values), 3.0);
        assert!(Reducer::Max.reduce(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Reducer::from_name("avg").unwrap(), Reducer::Average);
        assert_eq!(Reducer::from_name("total").unwrap(), Reducer::Sum);
        assert_eq!(Reducer::from_name("current").unwrap(), Reducer::Last);
        assert_eq!("rangeOf".parse::<Reducer>().unwrap(), Reducer::Range);
        assert_eq!(
            Reducer::from_name("mode"),
            Err(Error::UnsupportedReducer("mode".to_string()))
        );
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 50.0), 2.0);
        assert_eq!(percentile(&[10.0, 20.0], 50.0), 15.0);
        assert_eq!(percentile(&[3.0, 1.0, 2.0, 4.0], 100.0), 4.0);
    }

    #[test]
    fn test_comparison_nan_is_false() {
        for symbol in Comparison::SYMBOLS {
            let op = Comparison::from_symbol(symbol).unwrap();
            assert!(!op.holds(f64::NAN, 1.0), "{} with NaN value", symbol);
            assert!(!op.holds(1.0, f64::NAN), "{} with NaN threshold", symbol);
        }
    }

    #[test]
    fn test_comparison_operators() {
        assert!(Comparison::from_symbol(">").unwrap().holds(2.0, 1.0));
        assert!(Comparison::from_symbol("<=").unwrap().holds(1.0, 1.0));
        assert!(Comparison::from_symbol("!=").unwrap().holds(1.0, 2.0));
        assert!(!Comparison::from_symbol("=").unwrap().holds(1.0, 2.0));
        assert!(matches!(
            Comparison::from_symbol("=~"),
            Err(Error::UnsupportedOperator(_))
        ));
    }
}
