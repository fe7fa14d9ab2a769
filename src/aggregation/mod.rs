//! Numeric building blocks shared by the series functions
//!
//! - [`reducers`]: named folds (`sum`, `average`, `median`, ...) and the
//!   threshold comparisons used by filters
//! - [`alignment`]: point-by-point combination of aligned series
//! - [`buckets`]: fixed-width bucketing onto a coarser step
//!
//! Everything here works on present values only. Absent points never take
//! part in a fold, and a fold over nothing yields NaN, which callers turn
//! back into an absent point.

pub mod alignment;
pub mod buckets;
pub mod reducers;

pub use alignment::aggregate_series;
pub use buckets::{align_to_bucket_size, bucket_count, summarize_series};
pub use reducers::{percentile, Comparison, Reducer};
