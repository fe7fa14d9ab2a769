//! Point-by-point combination of aligned series

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{SeriesRef, TimeSeries};

/// Combine `series` index by index into one series named `name`
///
/// All inputs must share step and length. At each index the present values
/// are collected and handed to `combine`; an empty collection or a NaN result
/// produces an absent point. Timing is taken from the first input.
pub fn aggregate_series<F>(name: &str, series: &[SeriesRef], combine: F) -> Result<Vec<SeriesRef>>
where
    F: Fn(&[f64]) -> f64,
{
    let first = series
        .first()
        .ok_or_else(|| Error::NoData(name.to_string()))?;

    for other in &series[1..] {
        if other.step != first.step || other.len() != first.len() {
            return Err(Error::ShapeMismatch(format!(
                "{}: '{}' (step {}, {} points) does not align with '{}' (step {}, {} points)",
                name,
                other.name,
                other.step,
                other.len(),
                first.name,
                first.step,
                first.len()
            )));
        }
    }

    let mut result = TimeSeries::absent(name, first.start, first.stop, first.step, first.len());
    let mut present = Vec::with_capacity(series.len());
    for i in 0..first.len() {
        present.clear();
        present.extend(series.iter().filter_map(|s| s.get(i)));
        if present.is_empty() {
            continue;
        }
        let value = combine(&present);
        if !value.is_nan() {
            result.set(i, Some(value));
        }
    }

    Ok(vec![Arc::new(result)])
}
