//! `filterSeries(seriesList, func, operator, threshold)`
//!
//! Keeps the series whose consolidated value passes the threshold test.

use std::sync::Arc;

use crate::aggregation::{Comparison, Reducer};
use crate::error::{Error, Result};
use crate::query::ast::CallExpr;
use crate::query::evaluator::EvalContext;
use crate::query::metadata::{FunctionDescriptor, FunctionParam, ParamType};
use crate::query::registry::{Function, FunctionRegistry};
use crate::types::SeriesRef;

/// Consolidation functions a series can be filtered by
const CONSOLIDATIONS: &[Reducer] = &[Reducer::Max, Reducer::Min, Reducer::Sum, Reducer::Average];

/// Threshold filter
pub struct FilterSeries;

impl FilterSeries {
    fn consolidation(name: &str) -> Result<Reducer> {
        let reducer = Reducer::from_name(name)?;
        if CONSOLIDATIONS.contains(&reducer) {
            Ok(reducer)
        } else {
            Err(Error::UnsupportedReducer(name.to_string()))
        }
    }
}

impl Function for FilterSeries {
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let series = ctx.series_arg(call, 0, "seriesList")?;
        let func = call.string_arg(1, "func")?;
        let operator = call.string_arg(2, "operator")?;
        let threshold = call.float_arg(3, "threshold")?;

        let reducer = Self::consolidation(&func)?;
        let comparison = Comparison::from_symbol(&operator)?;

        Ok(series
            .into_iter()
            .filter(|s| {
                let present: Vec<f64> = s.present_values().collect();
                comparison.holds(reducer.reduce(&present), threshold)
            })
            .collect())
    }

    fn describe(&self) -> Vec<FunctionDescriptor> {
        vec![FunctionDescriptor::new(
            "filterSeries",
            "filterSeries(seriesList, func, operator, threshold)",
            "Filter Series",
            "Takes one metric or a wildcard seriesList followed by a consolidation function, \
             an operator and a threshold. Draws only the metrics which match the filter \
             expression. Series without a comparable value are dropped.",
            vec![
                FunctionParam::required("seriesList", ParamType::SeriesList),
                FunctionParam::required("func", ParamType::AggFunc).with_options(&["average", "max", "min", "sum"]),
                FunctionParam::required("operator", ParamType::String).with_options(&Comparison::SYMBOLS),
                FunctionParam::required("threshold", ParamType::Float),
            ],
        )]
    }
}

/// Register `filterSeries`
pub fn register(registry: &mut FunctionRegistry) -> Result<()> {
    registry.register("filterSeries", Arc::new(FilterSeries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::evaluator::Evaluator;
    use crate::types::{FetchedSeriesIndex, TimeSeries, TimeWindow};

    fn fixture() -> (Evaluator, FetchedSeriesIndex, TimeWindow) {
        let window = TimeWindow::new(0, 3);
        let mut index = FetchedSeriesIndex::new();
        index
            .insert(
                "eth*",
                window,
                vec![
                    TimeSeries::new("eth0", 0, 1, vec![10.0, 200.0, 30.0]),
                    TimeSeries::from_points("eth1", 0, 1, &[None, None, None]),
                    TimeSeries::new("eth2", 0, 1, vec![50.0, 60.0, 70.0]),
                    TimeSeries::new("eth3", 0, 1, vec![101.0, 1.0, 1.0]),
                ],
            )
            .unwrap();
        let evaluator = Evaluator::new(Arc::new(FunctionRegistry::with_builtins().unwrap()));
        (evaluator, index, window)
    }

    fn names(result: &[SeriesRef]) -> Vec<&str> {
        result.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_max_above_threshold() {
        let (evaluator, index, window) = fixture();
        let result = evaluator
            .evaluate_target("filterSeries(eth*, 'max', '>', 100)", window, &index)
            .unwrap();
        assert_eq!(names(&result), vec!["eth0", "eth3"]);
        assert!(Arc::ptr_eq(&result[0], &index.get("eth*", window)[0]));
    }

    #[test]
    fn test_all_absent_series_never_passes() {
        let (evaluator, index, window) = fixture();
        let result = evaluator
            .evaluate_target("filterSeries(eth*, 'min', '!=', -1)", window, &index)
            .unwrap();
        assert_eq!(names(&result), vec!["eth0", "eth2", "eth3"]);
    }

    #[test]
    fn test_sum_and_average() {
        let (evaluator, index, window) = fixture();
        let result = evaluator
            .evaluate_target("filterSeries(eth*, 'sum', '>=', 180)", window, &index)
            .unwrap();
        assert_eq!(names(&result), vec!["eth0", "eth2"]);

        let result = evaluator
            .evaluate_target("filterSeries(eth*, 'avg', '<', 50)", window, &index)
            .unwrap();
        assert_eq!(names(&result), vec!["eth3"]);
    }

    #[test]
    fn test_unsupported_names() {
        let (evaluator, index, window) = fixture();
        let err = evaluator
            .evaluate_target("filterSeries(eth*, 'median', '>', 1)", window, &index)
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedReducer("median".to_string()));

        let err = evaluator
            .evaluate_target("filterSeries(eth*, 'max', '=~', 1)", window, &index)
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedOperator("=~".to_string()));
    }
}
