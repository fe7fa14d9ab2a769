//! Fixed-width time buckets
//!
//! Bucketing re-samples a series onto a coarser step, folding every input
//! point that falls into a bucket with a [`Reducer`].

use crate::aggregation::reducers::Reducer;
use crate::types::TimeSeries;

/// Round `start` down and `stop` up to multiples of `bucket_size`
///
/// `stop` only moves when it sits inside a bucket, so an already aligned
/// window is returned unchanged. Returns `None` when a bound does not fit
/// in an `i64`.
pub fn align_to_bucket_size(start: i64, stop: i64, bucket_size: i64) -> Option<(i64, i64)> {
    let aligned_start = start.checked_sub(start.checked_rem_euclid(bucket_size)?)?;
    let mut aligned_stop = stop.checked_sub(stop.checked_rem_euclid(bucket_size)?)?;
    if aligned_stop != stop {
        aligned_stop = aligned_stop.checked_add(bucket_size)?;
    }
    Some((aligned_start, aligned_stop))
}

/// Number of buckets needed to cover `[start, stop)`
///
/// Returns `None` on overflow.
pub fn bucket_count(start: i64, stop: i64, bucket_size: i64) -> Option<usize> {
    if stop <= start {
        return Some(0);
    }
    let span = stop.checked_sub(start)?;
    let count = span / bucket_size + i64::from(span % bucket_size != 0);
    usize::try_from(count).ok()
}

/// Re-sample `series` into buckets of `bucket_size` seconds
///
/// Without `align_to_from` the bucket grid is aligned to multiples of the
/// bucket size; otherwise buckets start at the series' own start. A series
/// already coarser than the bucket is returned unchanged apart from its name.
///
/// Returns `None` when the bucket grid cannot be represented in `i64`
/// seconds.
pub fn summarize_series(
    series: &TimeSeries,
    name: &str,
    bucket_size: i64,
    reducer: Reducer,
    align_to_from: bool,
) -> Option<TimeSeries> {
    if series.step > bucket_size {
        return Some(series.renamed(name));
    }

    let (start, stop) = if align_to_from {
        (series.start, series.stop)
    } else {
        align_to_bucket_size(series.start, series.stop, bucket_size)?
    };

    let buckets = bucket_count(start, stop, bucket_size)?;
    let mut result = TimeSeries::absent(name, start, stop, bucket_size, buckets);

    let mut t = series.start;
    let mut bucket_end = start.saturating_add(bucket_size);
    let mut bucket = 0usize;
    let mut items = 0usize;
    // Never more points per bucket than the series holds
    let per_bucket = usize::try_from(bucket_size / series.step.max(1)).unwrap_or(usize::MAX);
    let mut present = Vec::with_capacity(per_bucket.clamp(1, series.len().max(1)));

    for point in series.points() {
        items += 1;
        if let Some(v) = point {
            present.push(v);
        }

        t = t.saturating_add(series.step);
        // The final point always closes through the trailing bucket below.
        if t >= stop {
            break;
        }

        if t >= bucket_end {
            if bucket < buckets {
                result.set(bucket, reduced(reducer, &present));
            }
            bucket += 1;
            bucket_end = bucket_end.saturating_add(bucket_size);
            items = 0;
            present.clear();
        }
    }

    if items > 0 && bucket < buckets {
        result.set(bucket, reduced(reducer, &present));
    }

    Some(result)
}

fn reduced(reducer: Reducer, values: &[f64]) -> Option<f64> {
    let value = reducer.reduce(values);
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
