//! Kuba Graphite - expression evaluator for Graphite-style targets
//!
//! Computes derived time-series from pre-fetched raw series by evaluating a
//! target expression tree:
//! - Pointwise combinators (`averageSeries`, `minSeries`, `maxSeries`, ...)
//! - Bucketed re-sampling (`summarize`)
//! - Threshold filtering (`filterSeries`)
//! - Re-entrant grouping (`groupByNode`, `groupByNodes`)
//! - Smoothing (`ewma`)
//!
//! Absent points are carried explicitly next to the values and never take
//! part in a fold.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Prometheus metrics for evaluation
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Reducers, pointwise alignment, and time buckets
pub mod aggregation;

/// Expression tree, parser, registry, and evaluator
pub mod query;

/// Built-in series functions
pub mod functions;

// Re-export main types
pub use error::{Error, Result};
pub use query::{Evaluator, FunctionRegistry};
pub use types::{FetchedSeriesIndex, SeriesRef, TimeSeries, TimeWindow};
