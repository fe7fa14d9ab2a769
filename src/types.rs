//! Core data types used throughout the evaluator
//!
//! # Key Types
//!
//! - **`TimeSeries`**: named, fixed-step numeric sequence with a parallel absence mask
//! - **`SeriesRef`**: shared, immutable handle to a series
//! - **`TimeWindow`**: query window (from, until) in unix seconds
//! - **`MetricRequest`**: fetch key (pattern + window)
//! - **`FetchedSeriesIndex`**: pre-fetched series keyed by `MetricRequest`
//!
//! # Example
//!
//! ```rust
//! use kuba_graphite::types::{FetchedSeriesIndex, TimeSeries, TimeWindow};
//!
//! let window = TimeWindow::new(0, 30);
//! let series = TimeSeries::from_points("a.b", 0, 10, &[Some(1.0), None, Some(3.0)]);
//! assert_eq!(series.get(1), None);
//!
//! let mut index = FetchedSeriesIndex::new();
//! index.insert("a.*", window, vec![series]).unwrap();
//! assert_eq!(index.get("a.*", window).len(), 1);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an immutable series
///
/// Series fetched once may be an argument to several sibling sub-expressions,
/// so they are never edited in place; renames and transforms build new series.
pub type SeriesRef = Arc<TimeSeries>;

/// A named time-series with a fixed sampling step
///
/// `values` and `is_absent` always have the same length. The value stored at an
/// absent index is a placeholder and carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Display name (canonical rendering of the expression that produced it)
    pub name: String,
    /// Sample values
    pub values: Vec<f64>,
    /// Absence mask, parallel to `values`
    pub is_absent: Vec<bool>,
    /// Window start (unix seconds)
    pub start: i64,
    /// Window stop (unix seconds)
    pub stop: i64,
    /// Sampling interval in seconds
    pub step: i64,
}

impl TimeSeries {
    /// Create a series with every point present
    pub fn new(name: impl Into<String>, start: i64, step: i64, values: Vec<f64>) -> Self {
        let len = values.len();
        Self {
            name: name.into(),
            is_absent: vec![false; len],
            values,
            start,
            stop: start + len as i64 * step,
            step,
        }
    }

    /// Create a series from optional points, `None` marking absence
    pub fn from_points(name: impl Into<String>, start: i64, step: i64, points: &[Option<f64>]) -> Self {
        let values = points.iter().map(|p| p.unwrap_or(0.0)).collect();
        let is_absent = points.iter().map(|p| p.is_none()).collect();
        Self {
            name: name.into(),
            values,
            is_absent,
            start,
            stop: start + points.len() as i64 * step,
            step,
        }
    }

    /// Create a series of `len` absent points covering `[start, stop)`
    pub fn absent(name: impl Into<String>, start: i64, stop: i64, step: i64, len: usize) -> Self {
        Self {
            name: name.into(),
            values: vec![0.0; len],
            is_absent: vec![true; len],
            start,
            stop,
            step,
        }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no points
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, `None` when absent or out of range
    pub fn get(&self, index: usize) -> Option<f64> {
        match self.is_absent.get(index) {
            Some(false) => self.values.get(index).copied(),
            _ => None,
        }
    }

    /// Write a point; `None` marks it absent
    pub fn set(&mut self, index: usize, value: Option<f64>) {
        match value {
            Some(v) => {
                self.values[index] = v;
                self.is_absent[index] = false;
            },
            None => {
                self.values[index] = 0.0;
                self.is_absent[index] = true;
            },
        }
    }

    /// Iterate points as `Option<f64>`
    pub fn points(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values
            .iter()
            .zip(self.is_absent.iter())
            .map(|(v, absent)| if *absent { None } else { Some(*v) })
    }

    /// Iterate present values only
    pub fn present_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points().flatten()
    }

    /// Copy of this series under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Check the structural invariants
    pub fn check_shape(&self) -> Result<()> {
        if self.values.len() != self.is_absent.len() {
            return Err(Error::ShapeMismatch(format!(
                "series '{}' has {} values but {} absence flags",
                self.name,
                self.values.len(),
                self.is_absent.len()
            )));
        }
        if self.step <= 0 {
            return Err(Error::ShapeMismatch(format!(
                "series '{}' has non-positive step {}",
                self.name, self.step
            )));
        }
        Ok(())
    }
}

/// Query time window in unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start
    pub from: i64,
    /// Exclusive end
    pub until: i64,
}

impl TimeWindow {
    /// Create a new window
    pub fn new(from: i64, until: i64) -> Self {
        Self { from, until }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.until)
    }
}

/// Key of a pre-fetched result: metric pattern plus window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRequest {
    /// Metric pattern exactly as written in the target
    pub metric: String,
    /// Window start
    pub from: i64,
    /// Window end
    pub until: i64,
}

impl MetricRequest {
    /// Create a new request key
    pub fn new(metric: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            metric: metric.into(),
            from: window.from,
            until: window.until,
        }
    }
}

/// Read-only mapping from fetch keys to the series they matched
///
/// Supplied whole by the fetch layer before evaluation starts.
#[derive(Debug, Clone, Default)]
pub struct FetchedSeriesIndex {
    entries: HashMap<MetricRequest, Vec<SeriesRef>>,
}

impl FetchedSeriesIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index holding exactly one entry of already-shared series
    pub fn single(metric: impl Into<String>, window: TimeWindow, series: Vec<SeriesRef>) -> Self {
        let mut entries = HashMap::with_capacity(1);
        entries.insert(MetricRequest::new(metric, window), series);
        Self { entries }
    }

    /// Add fetched series for a pattern, validating their shape
    pub fn insert(
        &mut self,
        metric: impl Into<String>,
        window: TimeWindow,
        series: Vec<TimeSeries>,
    ) -> Result<()> {
        for s in &series {
            s.check_shape()?;
        }
        self.entries
            .entry(MetricRequest::new(metric, window))
            .or_default()
            .extend(series.into_iter().map(Arc::new));
        Ok(())
    }

    /// Series fetched for `(metric, window)`; empty when nothing matched
    pub fn get(&self, metric: &str, window: TimeWindow) -> &[SeriesRef] {
        self.entries
            .get(&MetricRequest::new(metric, window))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of fetch keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_marks_absence() {
        let s = TimeSeries::from_points("x", 100, 10, &[Some(1.0), None, Some(3.0)]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.stop, 130);
        assert_eq!(s.get(0), Some(1.0));
        assert_eq!(s.get(1), None);
        assert_eq!(s.present_values().collect::<Vec<_>>(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_renamed_leaves_original_untouched() {
        let s = TimeSeries::new("orig", 0, 1, vec![1.0, 2.0]);
        let r = s.renamed("copy");
        assert_eq!(s.name, "orig");
        assert_eq!(r.name, "copy");
        assert_eq!(r.values, s.values);
    }

    #[test]
    fn test_index_missing_key_is_empty() {
        let index = FetchedSeriesIndex::new();
        assert!(index.get("nothing", TimeWindow::new(0, 10)).is_empty());
    }

    #[test]
    fn test_index_rejects_bad_shape() {
        let mut bad = TimeSeries::new("x", 0, 1, vec![1.0, 2.0]);
        bad.is_absent.pop();
        let mut index = FetchedSeriesIndex::new();
        let err = index.insert("x", TimeWindow::new(0, 2), vec![bad]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));

        let zero_step = TimeSeries::new("y", 0, 0, vec![1.0]);
        assert!(index.insert("y", TimeWindow::new(0, 2), vec![zero_step]).is_err());
    }

    #[test]
    fn test_index_window_is_part_of_key() {
        let mut index = FetchedSeriesIndex::new();
        index
            .insert("a", TimeWindow::new(0, 10), vec![TimeSeries::new("a", 0, 1, vec![1.0])])
            .unwrap();
        assert_eq!(index.get("a", TimeWindow::new(0, 10)).len(), 1);
        assert!(index.get("a", TimeWindow::new(0, 20)).is_empty());
    }
}
