//! Series combinators (`averageSeries`, `minSeries`, `maxSeries` and peers)
//!
//! Every combinator folds its inputs point by point with a [`Reducer`]. One
//! implementation serves all names; the reducer is picked from the name the
//! call was made under.

use std::sync::Arc;

use crate::aggregation::{aggregate_series, Reducer};
use crate::error::{Error, Result};
use crate::query::ast::CallExpr;
use crate::query::evaluator::EvalContext;
use crate::query::metadata::{FunctionDescriptor, FunctionParam, ParamType};
use crate::query::registry::{Function, FunctionRegistry};
use crate::types::SeriesRef;

/// Registered name, reducer, and the name it aliases (if any)
///
/// Aliases render their output under the name they were called with, except
/// `avg`, whose output is named `averageSeries(...)`.
const COMBINERS: &[(&str, Reducer, Option<&str>)] = &[
    ("averageSeries", Reducer::Average, None),
    ("avg", Reducer::Average, Some("averageSeries")),
    ("minSeries", Reducer::Min, None),
    ("min", Reducer::Min, Some("minSeries")),
    ("maxSeries", Reducer::Max, None),
    ("max", Reducer::Max, Some("maxSeries")),
    ("sumSeries", Reducer::Sum, None),
    ("sum", Reducer::Sum, Some("sumSeries")),
    ("multiplySeries", Reducer::Multiply, None),
    ("diffSeries", Reducer::Diff, None),
    ("rangeSeries", Reducer::Range, None),
    ("stddevSeries", Reducer::Stddev, None),
    ("medianSeries", Reducer::Median, None),
    ("countSeries", Reducer::Count, None),
];

/// Reducer names accepted by `aggregate` and grouping callbacks
pub const AGG_FUNCS: &[&str] = &[
    "average", "count", "diff", "last", "max", "median", "min", "multiply", "range", "stddev", "sum",
];

/// `xxxSeries(*seriesLists)` combinators
pub struct CombineSeries;

impl CombineSeries {
    fn reducer_for(name: &str) -> Result<Reducer> {
        COMBINERS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, r, _)| *r)
            .ok_or_else(|| Error::Internal(format!("'{}' is not a series combinator", name)))
    }

    fn output_name(name: &str) -> &str {
        match name {
            "avg" => "averageSeries",
            other => other,
        }
    }
}

impl Function for CombineSeries {
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let reducer = Self::reducer_for(&call.name)?;
        let series = ctx.existing_series_args(call, "seriesLists")?;
        let name = call.render_as(Self::output_name(&call.name));
        aggregate_series(&name, &series, |values| reducer.reduce(values))
    }

    fn describe(&self) -> Vec<FunctionDescriptor> {
        COMBINERS
            .iter()
            .map(|(name, reducer, alias_of)| {
                let description = if let Some(canonical) = alias_of {
                    format!("Short alias of {}.", canonical)
                } else {
                    format!(
                        "Takes one or more series lists and combines them point by point with '{}'. \
                         Absent points are ignored; an index where every input is absent stays absent.",
                        reducer.name()
                    )
                };
                FunctionDescriptor::new(
                    name,
                    &format!("{}(*seriesLists)", name),
                    "Combine",
                    &description,
                    vec![FunctionParam::required("seriesLists", ParamType::SeriesLists).multiple()],
                )
            })
            .collect()
    }
}

/// `aggregate(seriesList, func)`
pub struct Aggregate;

impl Function for Aggregate {
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let series = ctx.series_arg(call, 0, "seriesList")?;
        let func = call.string_arg(1, "func")?;
        let reducer = Reducer::from_name(&func)?;

        if series.is_empty() {
            return Err(Error::NoData(call.render_as(&call.name)));
        }

        let name = format!("{}Series({})", reducer.name(), call.args[0]);
        aggregate_series(&name, &series, |values| reducer.reduce(values))
    }

    fn describe(&self) -> Vec<FunctionDescriptor> {
        vec![FunctionDescriptor::new(
            "aggregate",
            "aggregate(seriesList, func)",
            "Combine",
            "Aggregate series using the specified function.",
            vec![
                FunctionParam::required("seriesList", ParamType::SeriesList),
                FunctionParam::required("func", ParamType::AggFunc).with_options(AGG_FUNCS),
            ],
        )]
    }
}

/// Register the combinators and `aggregate`
pub fn register(registry: &mut FunctionRegistry) -> Result<()> {
    let names: Vec<&str> = COMBINERS.iter().map(|(n, _, _)| *n).collect();
    registry.register_all(&names, Arc::new(CombineSeries))?;
    registry.register("aggregate", Arc::new(Aggregate))
}
