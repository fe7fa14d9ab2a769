//! `summarize(seriesList, intervalString, func='sum', alignToFrom=false)`

use std::sync::Arc;

use crate::aggregation::{summarize_series, Reducer};
use crate::error::{ArgType, ArgumentError, ArgumentProblem, Error, Result};
use crate::functions::aggregate::AGG_FUNCS;
use crate::query::ast::CallExpr;
use crate::query::evaluator::EvalContext;
use crate::query::metadata::{FunctionDescriptor, FunctionParam, ParamType};
use crate::query::registry::{Function, FunctionRegistry};
use crate::types::SeriesRef;

/// Bucket summarizer
pub struct Summarize;

impl Function for Summarize {
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let series = ctx.series_arg(call, 0, "seriesList")?;

        let bucket_size = call.interval_arg(1, "intervalString", 1)?;
        if bucket_size <= 0 {
            return Err(Error::Argument(ArgumentError {
                function: call.name.clone(),
                index: 1,
                name: "intervalString".to_string(),
                expected: ArgType::Interval,
                problem: ArgumentProblem::Invalid(format!("bucket size {}s is not positive", bucket_size)),
            }));
        }

        let func = call.string_named_or_pos_arg("func", 2, "sum")?;
        let func_supplied = call.has_arg("func", 2);
        let align_to_from = call.bool_named_or_pos_arg("alignToFrom", 3, false)?;
        let align_supplied = call.has_arg("alignToFrom", 3);

        let reducer = Reducer::from_name(&func)?;
        let interval = call.string_value(1).unwrap_or_default();

        series
            .iter()
            .map(|s| {
                let mut name = format!("summarize({},'{}'", s.name, interval);
                // func is rendered whenever alignToFrom is, so a boolean never
                // takes the function name's place
                if func_supplied || align_supplied {
                    name.push_str(&format!(",'{}'", func));
                }
                if align_supplied {
                    name.push_str(&format!(",{}", align_to_from));
                }
                name.push(')');

                summarize_series(s, &name, bucket_size, reducer, align_to_from)
                    .map(Arc::new)
                    .ok_or_else(|| {
                        Error::Argument(ArgumentError {
                            function: call.name.clone(),
                            index: 1,
                            name: "intervalString".to_string(),
                            expected: ArgType::Interval,
                            problem: ArgumentProblem::Invalid(format!(
                                "{}s buckets overflow the time range of '{}'",
                                bucket_size, s.name
                            )),
                        })
                    })
            })
            .collect()
    }

    fn describe(&self) -> Vec<FunctionDescriptor> {
        vec![FunctionDescriptor::new(
            "summarize",
            "summarize(seriesList, intervalString, func='sum', alignToFrom=False)",
            "Transform",
            "Summarize the data into interval buckets of a certain size. By default buckets \
             are aligned to multiples of the interval; alignToFrom=true starts them at the \
             series' own start. Each bucket is reduced with func (sum by default).",
            vec![
                FunctionParam::required("seriesList", ParamType::SeriesList),
                FunctionParam::required("intervalString", ParamType::Interval),
                FunctionParam::optional("func", ParamType::AggFunc, "sum").with_options(AGG_FUNCS),
                FunctionParam::optional("alignToFrom", ParamType::Boolean, "false"),
            ],
        )]
    }
}

/// Register `summarize`
pub fn register(registry: &mut FunctionRegistry) -> Result<()> {
    registry.register("summarize", Arc::new(Summarize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::evaluator::Evaluator;
    use crate::types::{FetchedSeriesIndex, TimeSeries, TimeWindow};

    fn run(target: &str, series: TimeSeries) -> Result<Vec<SeriesRef>> {
        let window = TimeWindow::new(series.start, series.stop);
        let mut index = FetchedSeriesIndex::new();
        index.insert("m", window, vec![series]).unwrap();
        Evaluator::new(Arc::new(FunctionRegistry::with_builtins().unwrap()))
            .evaluate_target(target, window, &index)
    }

    #[test]
    fn test_sum_aligned_to_from() {
        let result = run(
            "summarize(m, '2s', 'sum', true)",
            TimeSeries::new("m", 0, 1, vec![10.0, 10.0, 10.0, 10.0]),
        )
        .unwrap();
        assert_eq!(result[0].values, vec![20.0, 20.0]);
        assert_eq!(result[0].step, 2);
        assert_eq!(result[0].name, "summarize(m,'2s','sum',true)");
    }

    #[test]
    fn test_name_omits_defaults() {
        let result = run("summarize(m, '2s')", TimeSeries::new("m", 0, 1, vec![1.0; 4])).unwrap();
        assert_eq!(result[0].name, "summarize(m,'2s')");

        let result = run("summarize(m, '2s', 'avg')", TimeSeries::new("m", 0, 1, vec![1.0; 4])).unwrap();
        assert_eq!(result[0].name, "summarize(m,'2s','avg')");
    }

    #[test]
    fn test_name_with_named_align_includes_default_func() {
        let result = run(
            "summarize(m, '2s', alignToFrom=true)",
            TimeSeries::new("m", 0, 1, vec![1.0; 4]),
        )
        .unwrap();
        assert_eq!(result[0].name, "summarize(m,'2s','sum',true)");
    }

    #[test]
    fn test_unknown_reducer() {
        let err = run("summarize(m, '2s', 'mode')", TimeSeries::new("m", 0, 1, vec![1.0; 4])).unwrap_err();
        assert_eq!(err, Error::UnsupportedReducer("mode".to_string()));
    }

    #[test]
    fn test_bad_interval_is_argument_error() {
        let err = run("summarize(m, 'soon')", TimeSeries::new("m", 0, 1, vec![1.0; 4])).unwrap_err();
        assert!(matches!(err, Error::Argument(ArgumentError { index: 1, .. })));

        let err = run("summarize(m, '-1h')", TimeSeries::new("m", 0, 1, vec![1.0; 4])).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_very_long_interval_over_short_series() {
        let result = run("summarize(m, '290000000000y')", TimeSeries::new("m", 0, 1, vec![1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(result[0].values, vec![10.0]);
        assert_eq!(result[0].start, 0);

        let result = run("summarize(m, '100000y')", TimeSeries::new("m", 0, 1, vec![1.0; 4])).unwrap();
        assert_eq!(result[0].values, vec![4.0]);
    }

    #[test]
    fn test_grid_overflow_is_argument_error() {
        let err = run("summarize(m, '1h')", TimeSeries::new("m", i64::MAX - 100, 1, vec![1.0; 4])).unwrap_err();
        assert!(matches!(
            err,
            Error::Argument(ArgumentError { index: 1, ref name, .. }) if name == "intervalString"
        ));
    }

    #[test]
    fn test_hourly_buckets_round_outward() {
        // 22:32 lands in the 22:00-23:00 bucket no matter where the window starts
        let start = 22 * 3600 + 32 * 60;
        let result = run("summarize(m, '1h', 'count')", TimeSeries::new("m", start, 60, vec![1.0; 60])).unwrap();
        assert_eq!(result[0].start, 22 * 3600);
        assert_eq!(result[0].values, vec![28.0, 32.0]);
    }
}
