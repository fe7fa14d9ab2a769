//! `ewma(seriesList, alpha)`, alias `exponentialWeightedMovingAverage`

use std::sync::Arc;

use crate::error::{ArgType, ArgumentError, ArgumentProblem, Error, Result};
use crate::query::ast::CallExpr;
use crate::query::evaluator::EvalContext;
use crate::query::metadata::{FunctionDescriptor, FunctionParam, ParamType};
use crate::query::registry::{Function, FunctionRegistry};
use crate::types::{SeriesRef, TimeSeries};

/// Exponentially weighted moving average accumulator
///
/// Seeded with the first value pushed; afterwards each value moves the mean
/// by `alpha` of the difference.
#[derive(Debug, Clone, Copy)]
pub struct ExpWeight {
    alpha: f64,
    mean: Option<f64>,
}

impl ExpWeight {
    /// Create an empty accumulator
    pub fn new(alpha: f64) -> Self {
        Self { alpha, mean: None }
    }

    /// Fold in one value and return the updated mean
    pub fn push(&mut self, value: f64) -> f64 {
        let mean = match self.mean {
            None => value,
            Some(m) => self.alpha * value + (1.0 - self.alpha) * m,
        };
        self.mean = Some(mean);
        mean
    }

    /// Current mean, `None` before the first push
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }
}

/// Smooth `series`; absent points stay absent and leave the accumulator alone
pub fn ewma_series(series: &TimeSeries, name: &str, alpha: f64) -> TimeSeries {
    let mut acc = ExpWeight::new(alpha);
    let mut result = TimeSeries::absent(name, series.start, series.stop, series.step, series.len());
    for (i, point) in series.points().enumerate() {
        if let Some(v) = point {
            result.set(i, Some(acc.push(v)));
        }
    }
    result
}

/// EWMA transform
pub struct Ewma;

impl Function for Ewma {
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let series = ctx.series_arg(call, 0, "seriesList")?;
        let alpha = call.float_arg(1, "alpha")?;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::Argument(ArgumentError {
                function: call.name.clone(),
                index: 1,
                name: "alpha".to_string(),
                expected: ArgType::Float,
                problem: ArgumentProblem::Invalid(format!("{} is outside (0, 1]", alpha)),
            }));
        }

        Ok(series
            .iter()
            .map(|s| Arc::new(ewma_series(s, &format!("ewma({},{})", s.name, alpha), alpha)))
            .collect())
    }

    fn describe(&self) -> Vec<FunctionDescriptor> {
        ["ewma", "exponentialWeightedMovingAverage"]
            .iter()
            .map(|name| {
                FunctionDescriptor::new(
                    name,
                    &format!("{}(seriesList, alpha)", name),
                    "Calculate",
                    "Takes a series of values and an alpha and produces an exponential moving \
                     average. Absent points are skipped without decaying the average.",
                    vec![
                        FunctionParam::required("seriesList", ParamType::SeriesList),
                        FunctionParam::required("alpha", ParamType::Float),
                    ],
                )
            })
            .collect()
    }
}

/// Register `ewma` and its alias
pub fn register(registry: &mut FunctionRegistry) -> Result<()> {
    registry.register_all(&["ewma", "exponentialWeightedMovingAverage"], Arc::new(Ewma))
}
