//! Graphite target evaluation
//!
//! ```text
//! target text ──► parser ──► Expr ──► Evaluator ──► [SeriesRef]
//!                                        │   ▲
//!                         FunctionRegistry   │ EvalContext (re-entry)
//!                                        ▼   │
//!                                   Function impls
//! ```
//!
//! The fetch layer resolves every metric pattern beforehand and hands the
//! results over as a [`FetchedSeriesIndex`](crate::types::FetchedSeriesIndex);
//! evaluation itself does no I/O.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kuba_graphite::query::{Evaluator, FunctionRegistry};
//! use kuba_graphite::types::{FetchedSeriesIndex, TimeSeries, TimeWindow};
//!
//! let window = TimeWindow::new(0, 4);
//! let mut index = FetchedSeriesIndex::new();
//! index.insert("hits", window, vec![TimeSeries::new("hits", 0, 1, vec![1.0, 1.0, 2.0, 2.0])]).unwrap();
//!
//! let evaluator = Evaluator::new(Arc::new(FunctionRegistry::with_builtins().unwrap()));
//! let result = evaluator.evaluate_target("summarize(hits, '2s')", window, &index).unwrap();
//! assert_eq!(result[0].name, "summarize(hits,'2s')");
//! assert_eq!(result[0].values, vec![2.0, 4.0]);
//! ```

pub mod ast;
pub mod evaluator;
pub mod metadata;
pub mod parser;
pub mod registry;

// Re-export main types
pub use ast::{CallExpr, Expr, MetricExpr};
pub use evaluator::{EvalContext, Evaluator};
pub use metadata::{FunctionDescriptor, FunctionParam, ParamType};
pub use parser::{parse_target, ExprParser, TargetParser};
pub use registry::{Function, FunctionRegistry};
