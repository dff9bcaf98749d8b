use chrono::Duration;
use serde::Serialize;

use super::duration::{as_millis_f64, from_millis_f64, serialize_seconds};
use crate::error::{RunLensError, Result};

/// Durations of one statistic collected across a batch of runs, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationSample {
    sorted: Vec<Duration>,
}

impl DurationSample {
    pub fn new(mut values: Vec<Duration>) -> Self {
        values.sort();
        Self { sorted: values }
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Arithmetic mean, accumulated in fractional milliseconds.
    pub fn mean(&self) -> Result<Duration> {
        if self.is_empty() {
            return Err(RunLensError::EmptySample);
        }
        Ok(from_millis_f64(self.mean_millis()))
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean_millis(&self) -> f64 {
        self.sorted.iter().copied().map(as_millis_f64).sum::<f64>() / self.sorted.len() as f64
    }

    /// Element at the nearest-rank index `n * numerator / denominator`, floored.
    fn rank(&self, numerator: usize, denominator: usize) -> Duration {
        let n = self.sorted.len();
        self.sorted[(n * numerator / denominator).min(n - 1)]
    }

    /// Summarizes the sample.
    ///
    /// Percentiles use nearest-rank indices `n/4`, `n/2`, `3n/4` and `n-1`
    /// without interpolation, so the median of an even-sized sample is its
    /// upper-middle element. The standard deviation is the population one.
    ///
    /// # Errors
    ///
    /// Returns `EmptySample` if the sample has no elements.
    #[allow(clippy::cast_precision_loss)]
    pub fn summarize(&self) -> Result<DurationStats> {
        if self.is_empty() {
            return Err(RunLensError::EmptySample);
        }

        let n = self.sorted.len();
        let mean = self.mean_millis();
        let variance = self
            .sorted
            .iter()
            .map(|&value| {
                let deviation = as_millis_f64(value) - mean;
                deviation * deviation
            })
            .sum::<f64>()
            / n as f64;

        Ok(DurationStats {
            count: n,
            mean: from_millis_f64(mean),
            median: self.rank(1, 2),
            p25: self.rank(1, 4),
            p50: self.rank(1, 2),
            p75: self.rank(3, 4),
            p100: self.sorted[n - 1],
            std_dev: from_millis_f64(variance.sqrt()),
        })
    }
}

impl FromIterator<Duration> for DurationSample {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Descriptive statistics of a [`DurationSample`]. Serialized in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationStats {
    pub count: usize,
    #[serde(serialize_with = "serialize_seconds")]
    pub mean: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub median: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub p25: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub p50: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub p75: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub p100: Duration,
    #[serde(serialize_with = "serialize_seconds")]
    pub std_dev: Duration,
}
