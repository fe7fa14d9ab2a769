//! Expression evaluator
//!
//! Walks an expression tree depth-first. Metric leaves resolve straight from
//! the caller's [`FetchedSeriesIndex`]; calls are dispatched through the
//! [`FunctionRegistry`]. Implementations receive an [`EvalContext`] and use it
//! both to evaluate their series arguments and to re-enter the evaluator with
//! synthesized sub-expressions.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kuba_graphite::query::{Evaluator, FunctionRegistry};
//! use kuba_graphite::types::{FetchedSeriesIndex, TimeSeries, TimeWindow};
//!
//! let window = TimeWindow::new(0, 3);
//! let mut index = FetchedSeriesIndex::new();
//! index.insert("a.*", window, vec![
//!     TimeSeries::new("a.x", 0, 1, vec![1.0, 2.0, 3.0]),
//!     TimeSeries::new("a.y", 0, 1, vec![3.0, 4.0, 5.0]),
//! ]).unwrap();
//!
//! let evaluator = Evaluator::new(Arc::new(FunctionRegistry::with_builtins().unwrap()));
//! let result = evaluator.evaluate_target("averageSeries(a.*)", window, &index).unwrap();
//! assert_eq!(result[0].values, vec![2.0, 3.0, 4.0]);
//! ```

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::EvaluatorConfig;
use crate::error::{ArgType, ArgumentError, ArgumentProblem, Error, Result};
use crate::metrics;
use crate::query::ast::{CallExpr, Expr};
use crate::query::parser::{ExprParser, TargetParser};
use crate::query::registry::FunctionRegistry;
use crate::types::{FetchedSeriesIndex, SeriesRef, TimeWindow};

/// Evaluates expression trees against pre-fetched series
///
/// Holds no per-evaluation state, so one instance can serve concurrent
/// top-level evaluations as long as each brings its own index.
pub struct Evaluator {
    registry: Arc<FunctionRegistry>,
    parser: Arc<dyn ExprParser>,
    config: EvaluatorConfig,
}

impl Evaluator {
    /// Create an evaluator with the built-in target parser and default config
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            parser: Arc::new(TargetParser),
            config: EvaluatorConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the parser used for synthesized sub-expressions
    pub fn with_parser(mut self, parser: Arc<dyn ExprParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Registry calls are dispatched through
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Parse target text with the configured parser
    pub fn parse(&self, text: &str) -> Result<Expr> {
        self.parser.parse(text)
    }

    /// Evaluate `expr` over `window`
    pub fn evaluate(
        &self,
        expr: &Expr,
        window: TimeWindow,
        index: &FetchedSeriesIndex,
    ) -> Result<Vec<SeriesRef>> {
        EvalContext {
            evaluator: self,
            window,
            index,
            depth: 0,
        }
        .eval_node(expr)
    }

    /// Parse and evaluate target text
    pub fn evaluate_target(
        &self,
        target: &str,
        window: TimeWindow,
        index: &FetchedSeriesIndex,
    ) -> Result<Vec<SeriesRef>> {
        let expr = self.parse(target)?;
        self.evaluate(&expr, window, index)
    }
}

/// Per-node view handed to function implementations
pub struct EvalContext<'a> {
    evaluator: &'a Evaluator,
    window: TimeWindow,
    index: &'a FetchedSeriesIndex,
    depth: usize,
}

impl<'a> EvalContext<'a> {
    /// Query window
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Nesting depth of the node being evaluated (0 = root)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Registry of the owning evaluator
    pub fn registry(&self) -> &'a FunctionRegistry {
        &self.evaluator.registry
    }

    /// Configuration of the owning evaluator
    pub fn config(&self) -> &'a EvaluatorConfig {
        &self.evaluator.config
    }

    /// Parse text with the evaluator's parser
    pub fn parse(&self, text: &str) -> Result<Expr> {
        self.evaluator.parse(text)
    }

    /// Evaluate a sub-expression against this context's index
    pub fn evaluate(&self, expr: &Expr) -> Result<Vec<SeriesRef>> {
        self.evaluate_with_index(expr, self.index)
    }

    /// Evaluate a sub-expression against a different index
    ///
    /// Used for synthesized expressions whose leaves must resolve to an
    /// already-fetched subset of series.
    pub fn evaluate_with_index(
        &self,
        expr: &Expr,
        index: &FetchedSeriesIndex,
    ) -> Result<Vec<SeriesRef>> {
        EvalContext {
            evaluator: self.evaluator,
            window: self.window,
            index,
            depth: self.depth + 1,
        }
        .eval_node(expr)
    }

    /// Evaluate the series-list argument at `index`
    pub fn series_arg(&self, call: &CallExpr, index: usize, name: &str) -> Result<Vec<SeriesRef>> {
        let arg = call.series_arg(index, name)?;
        self.evaluate(arg)
    }

    /// Evaluate every positional argument as a series list and flatten them,
    /// dropping patterns that matched nothing
    ///
    /// Fails with `NoData` when nothing is left.
    pub fn existing_series_args(&self, call: &CallExpr, name: &str) -> Result<Vec<SeriesRef>> {
        call.series_arg(0, name)?;
        for position in 1..call.args.len() {
            call.series_arg(position, name)?;
        }

        let lists: Vec<Vec<SeriesRef>> = if self.config().parallel_arguments && call.args.len() > 1 {
            let results: Vec<Result<Vec<SeriesRef>>> =
                call.args.par_iter().map(|arg| self.evaluate(arg)).collect();
            results.into_iter().collect::<Result<_>>()?
        } else {
            call.args
                .iter()
                .map(|arg| self.evaluate(arg))
                .collect::<Result<_>>()?
        };

        let series: Vec<SeriesRef> = lists.into_iter().flatten().collect();
        if series.is_empty() {
            return Err(Error::NoData(call.render_as(&call.name)));
        }
        Ok(series)
    }

    fn eval_node(&self, expr: &Expr) -> Result<Vec<SeriesRef>> {
        let limit = self.config().max_recursion_depth;
        if self.depth > limit {
            return Err(Error::RecursionLimit {
                depth: self.depth,
                limit,
            });
        }

        match expr {
            Expr::Metric(m) => {
                let found = self.index.get(&m.name, self.window);
                trace!(metric = %m.name, window = %self.window, matched = found.len(), "Resolved metric");
                Ok(found.to_vec())
            },
            Expr::Call(call) => self.eval_call(call),
            literal => Err(Error::Argument(ArgumentError {
                function: "target".to_string(),
                index: 0,
                name: literal.to_string(),
                expected: ArgType::SeriesList,
                problem: ArgumentProblem::TypeMismatch,
            })),
        }
    }

    fn eval_call(&self, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let function = self.registry().resolve(&call.name, call.position)?;
        debug!(function = %call.name, depth = self.depth, "Evaluating call");

        let started = Instant::now();
        let result = function.call(self, call);
        if self.config().metrics_enabled {
            metrics::record_evaluation(&call.name, result.is_ok(), started.elapsed());
        }
        result
    }
}
